//! Operation input shapes.
//!
//! Plain data, not wire format: the HTTP collaborator deserializes its own
//! request bodies into these and maps the results back onto status codes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use fleetline_core::DispatchStatus;
use fleetline_storage::{DisputeStatus, FaultParty};

/// Fields for a brand-new dispatch record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLogistic {
    pub driver_id: Uuid,
    pub status: DispatchStatus,
    pub post: bool,
    pub location: String,
    pub state: String,
    pub note: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    pub cargo_id: Option<Uuid>,
}

impl NewLogistic {
    /// An idle record for the given driver, the shape minted automatically
    /// during driver registration.
    pub fn idle(driver_id: Uuid) -> Self {
        NewLogistic {
            driver_id,
            status: DispatchStatus::Ready,
            post: false,
            location: String::new(),
            state: String::new(),
            note: String::new(),
            scheduled_at: None,
            cargo_id: None,
        }
    }
}

/// A new driver plus the idle dispatch record created alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDriver {
    pub name: String,
    pub surname: String,
    pub driver_type: String,
    pub position: String,
    pub company_id: Uuid,
}

/// Target fields for a status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticUpdate {
    pub status: DispatchStatus,
    pub post: bool,
    pub location: String,
    pub state: String,
    pub note: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    /// Carried through unchanged, or cleared to detach.
    pub cargo_id: Option<Uuid>,
}

/// A load's commercial and route details as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CargoPayload {
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
    /// The employee booking the load.
    pub booked_by: Uuid,
}

/// Cargo side of an update-with-cargo call.
///
/// `create` distinguishes "attach a new load" from "amend the existing
/// one"; `cargo_id` absent with a non-COVERED status means detach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CargoChange {
    pub cargo_id: Option<Uuid>,
    pub create: bool,
    pub cargo: CargoPayload,
}

/// Cancellation / fault-attribution payload.
///
/// With `cancel` set the assignment is torn down (unsuccessful ledger
/// entry, idle reset, audit row); without it the call is pure fault
/// logging and the assignment continues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputePayload {
    pub cancel: bool,
    pub reason: String,
    pub fault: FaultParty,
    pub status: DisputeStatus,
    pub section: String,
}
