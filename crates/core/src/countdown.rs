//! Countdown projection for the dispatch board.
//!
//! The countdown is display-only and never persisted: it is recomputed on
//! every read from the record's timestamps and a single `now` snapshot
//! shared across the whole listing (so rows never skew against each other).

use serde::Serializer;
use time::{Duration, OffsetDateTime};

use crate::status::DispatchStatus;

/// A derived timer shown next to a dispatch row.
///
/// - `Elapsed` — how long the driver has been sitting in an idle state.
/// - `Remaining` — time until the tracked estimate (pickup for `COVERED`,
///   delivery for the ETA pair). Negative once overdue; the board renders
///   that as "late".
/// - `Blank` — no timer is meaningful (mid-leg states, or no estimate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Elapsed(Duration),
    Remaining(Duration),
    Blank,
}

impl Countdown {
    /// The underlying duration, if any.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Countdown::Elapsed(d) | Countdown::Remaining(d) => Some(*d),
            Countdown::Blank => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Countdown::Blank)
    }
}

impl std::fmt::Display for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let d = match self {
            Countdown::Blank => return Ok(()),
            Countdown::Elapsed(d) | Countdown::Remaining(d) => *d,
        };
        let total_minutes = d.whole_minutes();
        let sign = if total_minutes < 0 { "-" } else { "" };
        let abs = total_minutes.abs();
        write!(f, "{}{}h {:02}m", sign, abs / 60, abs % 60)
    }
}

impl serde::Serialize for Countdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Project the countdown for one row.
///
/// Idle states count up from the instant the status became effective;
/// estimate-tracking states count down toward `estimated_at`; everything
/// else is blank. An estimate-tracking row with no recorded estimate is
/// blank rather than a guess.
pub fn project_countdown(
    status: DispatchStatus,
    effective_since: OffsetDateTime,
    estimated_at: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> Countdown {
    match status {
        DispatchStatus::Ready
        | DispatchStatus::ReadyAtHome
        | DispatchStatus::AtHome
        | DispatchStatus::LetUsKnow => Countdown::Elapsed(now - effective_since),
        DispatchStatus::Covered | DispatchStatus::Eta | DispatchStatus::EtaWillBeLate => {
            match estimated_at {
                Some(at) => Countdown::Remaining(at - now),
                None => Countdown::Blank,
            }
        }
        DispatchStatus::WillBeReady
        | DispatchStatus::AtPu
        | DispatchStatus::AtDel
        | DispatchStatus::TruckIssues => Countdown::Blank,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2025-06-01 12:00 UTC);

    #[test]
    fn idle_counts_up_from_effective_instant() {
        let cd = project_countdown(
            DispatchStatus::Ready,
            NOW - Duration::hours(2),
            None,
            NOW,
        );
        assert_eq!(cd, Countdown::Elapsed(Duration::hours(2)));
        assert_eq!(cd.to_string(), "2h 00m");
    }

    #[test]
    fn covered_counts_down_to_pickup() {
        let cd = project_countdown(
            DispatchStatus::Covered,
            NOW - Duration::minutes(10),
            Some(NOW + Duration::hours(3)),
            NOW,
        );
        assert_eq!(cd, Countdown::Remaining(Duration::hours(3)));
        assert_eq!(cd.to_string(), "3h 00m");
    }

    #[test]
    fn overdue_eta_goes_negative() {
        let cd = project_countdown(
            DispatchStatus::EtaWillBeLate,
            NOW - Duration::hours(5),
            Some(NOW - Duration::minutes(75)),
            NOW,
        );
        assert_eq!(cd, Countdown::Remaining(-Duration::minutes(75)));
        assert_eq!(cd.to_string(), "-1h 15m");
    }

    #[test]
    fn mid_leg_states_are_blank() {
        for status in [
            DispatchStatus::AtPu,
            DispatchStatus::AtDel,
            DispatchStatus::TruckIssues,
            DispatchStatus::WillBeReady,
        ] {
            let cd = project_countdown(
                status,
                NOW - Duration::hours(1),
                Some(NOW + Duration::hours(1)),
                NOW,
            );
            assert!(cd.is_blank(), "{status} should have no countdown");
            assert_eq!(cd.to_string(), "");
        }
    }

    #[test]
    fn tracking_state_without_estimate_is_blank() {
        let cd = project_countdown(DispatchStatus::Eta, NOW, None, NOW);
        assert!(cd.is_blank());
    }

    #[test]
    fn serializes_as_display_string() {
        let json =
            serde_json::to_string(&Countdown::Remaining(Duration::minutes(90))).unwrap();
        assert_eq!(json, "\"1h 30m\"");
        assert_eq!(serde_json::to_string(&Countdown::Blank).unwrap(), "\"\"");
    }
}
