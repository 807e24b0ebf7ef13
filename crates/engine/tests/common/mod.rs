//! Shared fixtures for the engine integration tests.

use std::sync::Arc;

use rust_decimal::Decimal;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use fleetline_core::DispatchStatus;
use fleetline_engine::{CargoChange, CargoPayload, LogisticUpdate, NewDriver, TransitionEngine};
use fleetline_storage::{DispatchStorage, HistoryRecord, MemoryStorage};

/// Engine over a fresh in-memory backend, with one registered driver and
/// its idle dispatch record.
pub async fn engine_with_assignment() -> (TransitionEngine<MemoryStorage>, Uuid, Uuid) {
    let engine = TransitionEngine::new(Arc::new(MemoryStorage::new()));
    let (driver_id, logistic_id) = engine
        .register_driver(NewDriver {
            name: "Alan".to_string(),
            surname: "Turner".to_string(),
            driver_type: "SOLO".to_string(),
            position: "OW".to_string(),
            company_id: Uuid::new_v4(),
        })
        .await
        .expect("register driver");
    (engine, logistic_id, driver_id)
}

/// A well-formed load: pickup tomorrow, delivery the day after.
pub fn cargo_payload() -> CargoPayload {
    let now = OffsetDateTime::now_utc();
    CargoPayload {
        external_id: "LD-1001".to_string(),
        provider: "TQL".to_string(),
        loaded_miles: 500,
        free_miles: 40,
        origin: "Chicago, IL".to_string(),
        destination: "Dallas, TX".to_string(),
        cost: 1800,
        rate: Decimal::new(360, 2),
        pickup_at: now + Duration::days(1),
        delivery_at: now + Duration::days(2),
        booked_by: Uuid::new_v4(),
    }
}

/// Attach a brand-new load as COVERED.
pub fn attach_new(cargo: CargoPayload) -> CargoChange {
    CargoChange {
        cargo_id: None,
        create: true,
        cargo,
    }
}

/// Target fields for a transition to `status`, cargo pointer as given.
pub fn update_to(status: DispatchStatus, cargo_id: Option<Uuid>) -> LogisticUpdate {
    LogisticUpdate {
        status,
        post: false,
        location: "Chicago, IL".to_string(),
        state: "IL".to_string(),
        note: String::new(),
        scheduled_at: None,
        cargo_id,
    }
}

pub async fn histories(
    engine: &TransitionEngine<MemoryStorage>,
    logistic_id: Uuid,
) -> Vec<HistoryRecord> {
    engine
        .storage()
        .list_histories(Some(logistic_id), 0)
        .await
        .expect("list histories")
}
