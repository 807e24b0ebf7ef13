//! Audit snapshot types.
//!
//! Every transition appends a history row pairing a before/after
//! [`LogisticSnapshot`] (and, when the load changed, a before/after
//! [`CargoSnapshot`]). Snapshots are frozen JSON documents: once written
//! they are never touched again, so they deliberately carry values, not
//! references to live rows.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// The audited subset of a dispatch record.
///
/// The cosmetic `emoji` column is excluded: it is repainted by a background
/// job and would only add noise to the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticSnapshot {
    pub post: bool,
    pub status: crate::DispatchStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub effective_since: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub estimated_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    pub state: String,
    pub location: String,
    pub note: String,
}

/// A load's commercial and route details, frozen at transition time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoSnapshot {
    pub id: Uuid,
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
    pub booked_by: Uuid,
}
