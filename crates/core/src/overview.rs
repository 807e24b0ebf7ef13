//! Per-company occupancy report.
//!
//! Buckets every driver into free / will-be-soon / occupied / not-working
//! from the joined dispatch×driver rows. Point-in-time and read-only; the
//! caller supplies one `now` snapshot for the whole report.

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::status::DispatchStatus;

/// How far out an ETA still counts as "soon".
const SOON_WINDOW: Duration = Duration::hours(1);

/// One joined dispatch×driver row, as fetched by the storage layer.
#[derive(Debug, Clone)]
pub struct OverviewRow {
    pub company_id: Uuid,
    pub status: DispatchStatus,
    pub estimated_at: Option<OffsetDateTime>,
}

/// The occupancy bucket a driver falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyBucket {
    Free,
    WillBeSoon,
    Occupied,
    NotWorking,
}

/// Per-company bucket counts. `name` is joined in by the caller from the
/// company lookup; classification itself never needs it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompanyOccupancy {
    pub company_id: Uuid,
    pub name: String,
    pub free: u64,
    pub will_be_soon: u64,
    pub occupied: u64,
    pub not_working: u64,
}

/// Classify one driver.
///
/// ETA-family drivers split on whether the estimate is due inside
/// [`SOON_WINDOW`]; a missing estimate counts as occupied (the driver is
/// definitely on a load, we just cannot promise "soon"). `TRUCK ISSUES`
/// is uncounted — a broken-down truck is neither bookable nor reliably
/// "occupied until X".
pub fn classify_occupancy(
    status: DispatchStatus,
    estimated_at: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> Option<OccupancyBucket> {
    match status {
        DispatchStatus::Ready | DispatchStatus::ReadyAtHome => Some(OccupancyBucket::Free),
        DispatchStatus::WillBeReady | DispatchStatus::AtDel => Some(OccupancyBucket::WillBeSoon),
        DispatchStatus::Eta | DispatchStatus::EtaWillBeLate => match estimated_at {
            Some(due) if due <= now + SOON_WINDOW => Some(OccupancyBucket::WillBeSoon),
            _ => Some(OccupancyBucket::Occupied),
        },
        DispatchStatus::Covered | DispatchStatus::AtPu => Some(OccupancyBucket::Occupied),
        DispatchStatus::LetUsKnow | DispatchStatus::AtHome => Some(OccupancyBucket::NotWorking),
        DispatchStatus::TruckIssues => None,
    }
}

/// Aggregate rows into per-company counts, companies in first-seen order.
pub fn aggregate_overview(rows: &[OverviewRow], now: OffsetDateTime) -> Vec<CompanyOccupancy> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut by_company: std::collections::HashMap<Uuid, CompanyOccupancy> =
        std::collections::HashMap::new();

    for row in rows {
        let entry = by_company.entry(row.company_id).or_insert_with(|| {
            order.push(row.company_id);
            CompanyOccupancy {
                company_id: row.company_id,
                ..CompanyOccupancy::default()
            }
        });
        match classify_occupancy(row.status, row.estimated_at, now) {
            Some(OccupancyBucket::Free) => entry.free += 1,
            Some(OccupancyBucket::WillBeSoon) => entry.will_be_soon += 1,
            Some(OccupancyBucket::Occupied) => entry.occupied += 1,
            Some(OccupancyBucket::NotWorking) => entry.not_working += 1,
            None => {}
        }
    }

    order
        .into_iter()
        .filter_map(|id| by_company.remove(&id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2025-06-01 12:00 UTC);

    fn row(company: Uuid, status: DispatchStatus, due_in: Option<Duration>) -> OverviewRow {
        OverviewRow {
            company_id: company,
            status,
            estimated_at: due_in.map(|d| NOW + d),
        }
    }

    #[test]
    fn eta_splits_on_the_one_hour_window() {
        assert_eq!(
            classify_occupancy(DispatchStatus::Eta, Some(NOW + Duration::minutes(30)), NOW),
            Some(OccupancyBucket::WillBeSoon)
        );
        assert_eq!(
            classify_occupancy(DispatchStatus::Eta, Some(NOW + Duration::minutes(90)), NOW),
            Some(OccupancyBucket::Occupied)
        );
        // Already overdue is still "soon" — the driver frees up any minute.
        assert_eq!(
            classify_occupancy(
                DispatchStatus::EtaWillBeLate,
                Some(NOW - Duration::minutes(10)),
                NOW
            ),
            Some(OccupancyBucket::WillBeSoon)
        );
    }

    #[test]
    fn eta_without_estimate_is_occupied() {
        assert_eq!(
            classify_occupancy(DispatchStatus::Eta, None, NOW),
            Some(OccupancyBucket::Occupied)
        );
    }

    #[test]
    fn truck_issues_is_uncounted() {
        assert_eq!(classify_occupancy(DispatchStatus::TruckIssues, None, NOW), None);
    }

    #[test]
    fn aggregates_per_company_in_first_seen_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let rows = vec![
            row(a, DispatchStatus::Ready, None),
            row(b, DispatchStatus::AtHome, None),
            row(a, DispatchStatus::ReadyAtHome, None),
            row(a, DispatchStatus::Covered, Some(Duration::hours(4))),
            row(a, DispatchStatus::AtDel, None),
            row(b, DispatchStatus::Eta, Some(Duration::minutes(20))),
            row(a, DispatchStatus::TruckIssues, None),
        ];

        let report = aggregate_overview(&rows, NOW);
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].company_id, a);
        assert_eq!(report[0].free, 2);
        assert_eq!(report[0].occupied, 1);
        assert_eq!(report[0].will_be_soon, 1);
        assert_eq!(report[0].not_working, 0);
        assert_eq!(report[1].company_id, b);
        assert_eq!(report[1].not_working, 1);
        assert_eq!(report[1].will_be_soon, 1);
    }
}
