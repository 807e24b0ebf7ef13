use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use fleetline_core::{CargoSnapshot, DispatchStatus, LogisticSnapshot};

/// A driver's live dispatch record. One per driver (1:1, enforced by the
/// backend), mutated exclusively through the transition engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRecord {
    pub id: Uuid,
    pub driver_id: Uuid,
    /// Publicly advertised on the load boards.
    pub post: bool,
    pub status: DispatchStatus,
    /// Instant the current status became effective.
    #[serde(with = "time::serde::rfc3339")]
    pub effective_since: OffsetDateTime,
    /// Estimate anchor: pickup time while COVERED, delivery time for the
    /// ETA pair, absent otherwise.
    #[serde(with = "time::serde::rfc3339::option")]
    pub estimated_at: Option<OffsetDateTime>,
    /// Scheduled start anchor; defaulted to "now" when a trip closes
    /// without one.
    #[serde(with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    pub state: String,
    pub location: String,
    /// Cosmetic, repainted by the background refresher.
    pub emoji: String,
    pub note: String,
    pub cargo_id: Option<Uuid>,
    /// Optimistic concurrency stamp, incremented by every committed update.
    pub version: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&LogisticRecord> for LogisticSnapshot {
    fn from(rec: &LogisticRecord) -> Self {
        LogisticSnapshot {
            post: rec.post,
            status: rec.status,
            effective_since: rec.effective_since,
            estimated_at: rec.estimated_at,
            scheduled_at: rec.scheduled_at,
            state: rec.state.clone(),
            location: rec.location.clone(),
            note: rec.note.clone(),
        }
    }
}

/// A load's commercial and route details. Owned by at most one dispatch
/// record at a time; orphaned (never deleted) once the trip closes, so the
/// transaction ledger keeps something to point at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CargoRecord {
    pub id: Uuid,
    /// The broker's load number.
    pub external_id: String,
    pub provider: String,
    pub loaded_miles: i64,
    pub free_miles: i64,
    pub origin: String,
    pub destination: String,
    pub cost: i64,
    pub rate: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub pickup_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub delivery_at: OffsetDateTime,
    /// The employee who booked the load.
    pub booked_by: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&CargoRecord> for CargoSnapshot {
    fn from(rec: &CargoRecord) -> Self {
        CargoSnapshot {
            id: rec.id,
            external_id: rec.external_id.clone(),
            provider: rec.provider.clone(),
            loaded_miles: rec.loaded_miles,
            free_miles: rec.free_miles,
            origin: rec.origin.clone(),
            destination: rec.destination.clone(),
            cost: rec.cost,
            rate: rec.rate,
            pickup_at: rec.pickup_at,
            delivery_at: rec.delivery_at,
            booked_by: rec.booked_by,
        }
    }
}

/// Append-only audit row: one per transition, never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub driver_name: String,
    pub logistic_id: Uuid,
    pub from_logistic: LogisticSnapshot,
    pub to_logistic: LogisticSnapshot,
    pub from_cargo: Option<CargoSnapshot>,
    pub to_cargo: Option<CargoSnapshot>,
    /// The employee who performed the change.
    pub employee_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

/// Append-only completed-trip ledger entry, written when an assignment is
/// terminated or cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pickup_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub delivery_at: OffsetDateTime,
    pub loaded_miles: i64,
    pub total_miles: i64,
    pub provider: String,
    pub cost: i64,
    pub rate: Decimal,
    pub driver_id: Uuid,
    /// The employee who booked the load.
    pub employee_id: Uuid,
    pub external_id: String,
    pub success: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

/// Which party a dispute is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultParty {
    Driver,
    Dispatcher,
    Company,
}

/// Outcome recorded on a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeStatus {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "canceled")]
    Canceled,
}

/// Append-only fault/dispute row, written on cancellation or lateness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub id: Uuid,
    pub reason: String,
    pub fault: FaultParty,
    pub status: DisputeStatus,
    pub section: String,
    pub employee_id: Uuid,
    pub company_id: Uuid,
    /// The offending load's broker number.
    pub load_external_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

/// The narrow driver surface the dispatch core needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverRecord {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub driver_type: String,
    pub position: String,
    pub company_id: Uuid,
}

impl DriverRecord {
    /// Display name used on history rows.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

/// The narrow company surface the dispatch core needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: Uuid,
    pub name: String,
    pub scac: String,
}

/// A dispatch record eager-loaded with its driver and cargo, as returned by
/// the single-round-trip get.
#[derive(Debug, Clone)]
pub struct LogisticJoined {
    pub logistic: LogisticRecord,
    pub driver: DriverRecord,
    pub cargo: Option<CargoRecord>,
}

/// One joined row of the board listing.
#[derive(Debug, Clone)]
pub struct LogisticListing {
    pub logistic: LogisticRecord,
    pub driver_name: String,
    pub driver_surname: String,
    pub driver_type: String,
    pub driver_position: String,
    pub company_id: Uuid,
}

/// Listing filter. Empty fields match everything; `page` is 1-based.
#[derive(Debug, Clone)]
pub struct LogisticFilter {
    pub status: Option<DispatchStatus>,
    pub location: Option<String>,
    pub state: Option<String>,
    pub post: Option<bool>,
    pub driver_name: Option<String>,
    pub driver_type: Option<String>,
    pub position: Option<String>,
    pub company_ids: Vec<Uuid>,
    pub page: u64,
    pub limit: u64,
}

impl Default for LogisticFilter {
    fn default() -> Self {
        LogisticFilter {
            status: None,
            location: None,
            state: None,
            post: None,
            driver_name: None,
            driver_type: None,
            position: None,
            company_ids: Vec::new(),
            page: 1,
            limit: 50,
        }
    }
}
