//! Transition-engine behavior: plain updates, cargo attach/amend/detach,
//! termination, and the audit trail each of them leaves behind.

mod common;

use uuid::Uuid;

use common::{attach_new, cargo_payload, engine_with_assignment, histories, update_to};
use fleetline_core::{DispatchStatus, LogisticSnapshot};
use fleetline_engine::{CargoChange, ErrorKind, NewLogistic};
use fleetline_storage::DispatchStorage;

#[tokio::test]
async fn update_appends_one_history_row_with_before_after_snapshots() {
    let (engine, logistic_id, _) = engine_with_assignment().await;
    let employee = Uuid::new_v4();

    engine
        .update(logistic_id, update_to(DispatchStatus::AtHome, None), employee)
        .await
        .unwrap();

    let joined = engine.get(logistic_id).await.unwrap();
    assert_eq!(joined.logistic.status, DispatchStatus::AtHome);

    let rows = histories(&engine, logistic_id).await;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.from_logistic.status, DispatchStatus::Ready);
    assert_eq!(row.to_logistic.status, DispatchStatus::AtHome);
    assert_eq!(row.to_logistic, LogisticSnapshot::from(&joined.logistic));
    assert!(row.from_cargo.is_none());
    assert!(row.to_cargo.is_none());
    assert_eq!(row.employee_id, employee);
    assert_eq!(row.driver_name, "Alan Turner");
}

#[tokio::test]
async fn create_rejects_mismatched_status_and_cargo() {
    let (engine, _, _) = engine_with_assignment().await;

    let covered_without_cargo = NewLogistic {
        status: DispatchStatus::Covered,
        ..NewLogistic::idle(Uuid::new_v4())
    };
    let err = engine.create_logistic(covered_without_cargo).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let idle_with_cargo = NewLogistic {
        cargo_id: Some(Uuid::new_v4()),
        ..NewLogistic::idle(Uuid::new_v4())
    };
    let err = engine.create_logistic(idle_with_cargo).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn second_record_for_same_driver_is_rejected() {
    let (engine, _, driver_id) = engine_with_assignment().await;
    let err = engine
        .create_logistic(NewLogistic::idle(driver_id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
}

#[tokio::test]
async fn attaching_a_new_load_mints_a_fresh_cargo() {
    let (engine, logistic_id, _) = engine_with_assignment().await;
    let payload = cargo_payload();
    let pickup = payload.pickup_at;

    let cargo_id = engine
        .update_with_cargo(
            logistic_id,
            update_to(DispatchStatus::Covered, None),
            attach_new(payload),
            Uuid::new_v4(),
        )
        .await
        .unwrap()
        .expect("cargo id");

    let joined = engine.get(logistic_id).await.unwrap();
    assert_eq!(joined.logistic.status, DispatchStatus::Covered);
    assert_eq!(joined.logistic.cargo_id, Some(cargo_id));
    // COVERED tracks the pickup estimate.
    assert_eq!(joined.logistic.estimated_at, Some(pickup));
    let cargo = joined.cargo.expect("joined cargo");
    assert_eq!(cargo.id, cargo_id);
    assert_eq!(cargo.external_id, "LD-1001");

    let rows = histories(&engine, logistic_id).await;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].from_cargo.is_none());
    let to_cargo = rows[0].to_cargo.as_ref().expect("to_cargo snapshot");
    assert_eq!(to_cargo.id, cargo_id);
}

#[tokio::test]
async fn amending_keeps_the_cargo_id_and_snapshots_both_sides() {
    let (engine, logistic_id, _) = engine_with_assignment().await;
    let employee = Uuid::new_v4();
    let cargo_id = engine
        .update_with_cargo(
            logistic_id,
            update_to(DispatchStatus::Covered, None),
            attach_new(cargo_payload()),
            employee,
        )
        .await
        .unwrap()
        .unwrap();

    let mut amended = cargo_payload();
    amended.provider = "Landstar".to_string();
    let delivery = amended.delivery_at;

    let returned = engine
        .update_with_cargo(
            logistic_id,
            update_to(DispatchStatus::Eta, Some(cargo_id)),
            CargoChange {
                cargo_id: Some(cargo_id),
                create: false,
                cargo: amended,
            },
            employee,
        )
        .await
        .unwrap();
    assert_eq!(returned, Some(cargo_id));

    let joined = engine.get(logistic_id).await.unwrap();
    assert_eq!(joined.logistic.status, DispatchStatus::Eta);
    assert_eq!(joined.logistic.cargo_id, Some(cargo_id));
    // The ETA pair tracks the delivery estimate.
    assert_eq!(joined.logistic.estimated_at, Some(delivery));
    assert_eq!(joined.cargo.unwrap().provider, "Landstar");

    let rows = histories(&engine, logistic_id).await;
    assert_eq!(rows.len(), 2);
    let amend_row = &rows[1];
    let from = amend_row.from_cargo.as_ref().expect("from_cargo");
    let to = amend_row.to_cargo.as_ref().expect("to_cargo");
    assert_eq!(from.id, cargo_id);
    assert_eq!(to.id, cargo_id);
    assert_eq!(from.provider, "TQL");
    assert_eq!(to.provider, "Landstar");
}

#[tokio::test]
async fn amend_without_cargo_id_is_rejected() {
    let (engine, logistic_id, _) = engine_with_assignment().await;
    let err = engine
        .update_with_cargo(
            logistic_id,
            update_to(DispatchStatus::Covered, None),
            CargoChange {
                cargo_id: None,
                create: false,
                cargo: cargo_payload(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn pickup_after_delivery_fails_before_any_write() {
    let (engine, logistic_id, _) = engine_with_assignment().await;
    let mut payload = cargo_payload();
    std::mem::swap(&mut payload.pickup_at, &mut payload.delivery_at);

    let err = engine
        .update_with_cargo(
            logistic_id,
            update_to(DispatchStatus::Covered, None),
            attach_new(payload),
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let joined = engine.get(logistic_id).await.unwrap();
    assert_eq!(joined.logistic.status, DispatchStatus::Ready);
    assert!(joined.logistic.cargo_id.is_none());
    assert!(histories(&engine, logistic_id).await.is_empty());
}

#[tokio::test]
async fn detach_clears_the_pointer_and_snapshots_no_cargo() {
    let (engine, logistic_id, _) = engine_with_assignment().await;
    engine
        .update_with_cargo(
            logistic_id,
            update_to(DispatchStatus::Covered, None),
            attach_new(cargo_payload()),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    let returned = engine
        .update_with_cargo(
            logistic_id,
            update_to(DispatchStatus::Ready, None),
            CargoChange {
                cargo_id: None,
                create: false,
                cargo: cargo_payload(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    assert_eq!(returned, None);

    let joined = engine.get(logistic_id).await.unwrap();
    assert_eq!(joined.logistic.status, DispatchStatus::Ready);
    assert!(joined.logistic.cargo_id.is_none());
    assert!(joined.logistic.estimated_at.is_none());

    let rows = histories(&engine, logistic_id).await;
    assert_eq!(rows.len(), 2);
    assert!(rows[1].from_cargo.is_none());
    assert!(rows[1].to_cargo.is_none());
}

#[tokio::test]
async fn load_invariant_holds_after_every_transition() {
    let (engine, logistic_id, _) = engine_with_assignment().await;

    // Idle status keeping a cargo pointer is rejected.
    let cargo_id = engine
        .update_with_cargo(
            logistic_id,
            update_to(DispatchStatus::Covered, None),
            attach_new(cargo_payload()),
            Uuid::new_v4(),
        )
        .await
        .unwrap()
        .unwrap();
    let err = engine
        .update(
            logistic_id,
            update_to(DispatchStatus::Ready, Some(cargo_id)),
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // Assigned status without a cargo pointer is rejected.
    let err = engine
        .update(
            logistic_id,
            update_to(DispatchStatus::AtPu, None),
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // Carrying the pointer through an assigned-status change is fine.
    engine
        .update(
            logistic_id,
            update_to(DispatchStatus::AtPu, Some(cargo_id)),
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    let joined = engine.get(logistic_id).await.unwrap();
    assert_eq!(joined.logistic.status, DispatchStatus::AtPu);
    assert_eq!(joined.logistic.cargo_id, Some(cargo_id));
}

#[tokio::test]
async fn update_on_missing_logistic_is_not_found() {
    let (engine, _, _) = engine_with_assignment().await;
    let err = engine
        .update(
            Uuid::new_v4(),
            update_to(DispatchStatus::Ready, None),
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn terminate_resets_to_idle_and_writes_the_ledger() {
    let (engine, logistic_id, driver_id) = engine_with_assignment().await;
    let payload = cargo_payload();
    engine
        .update_with_cargo(
            logistic_id,
            update_to(DispatchStatus::Covered, None),
            attach_new(payload.clone()),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    engine
        .terminate(logistic_id, true, Uuid::new_v4())
        .await
        .unwrap();

    let joined = engine.get(logistic_id).await.unwrap();
    assert_eq!(joined.logistic.status, DispatchStatus::Ready);
    assert!(!joined.logistic.post);
    assert!(joined.logistic.cargo_id.is_none());
    assert!(joined.logistic.estimated_at.is_none());
    assert_eq!(joined.logistic.emoji, "");
    assert_eq!(joined.logistic.note, "");
    // The scheduled anchor was never set, so it was defaulted and the
    // status clock restarted from it.
    let scheduled = joined.logistic.scheduled_at.expect("defaulted anchor");
    assert_eq!(joined.logistic.effective_since, scheduled);

    let ledger = engine.storage().list_transactions(0).await.unwrap();
    assert_eq!(ledger.len(), 1);
    let entry = &ledger[0];
    assert!(entry.success);
    assert_eq!(entry.origin, payload.origin);
    assert_eq!(entry.destination, payload.destination);
    assert_eq!(entry.loaded_miles, payload.loaded_miles);
    assert_eq!(entry.total_miles, payload.loaded_miles + payload.free_miles);
    assert_eq!(entry.driver_id, driver_id);
    assert_eq!(entry.external_id, payload.external_id);

    let rows = histories(&engine, logistic_id).await;
    assert_eq!(rows.len(), 2);
    let close_row = &rows[1];
    assert!(close_row.from_cargo.is_some());
    assert!(close_row.to_cargo.is_none());
    assert_eq!(close_row.to_logistic.status, DispatchStatus::Ready);
}

#[tokio::test]
async fn terminate_keeps_an_explicit_scheduled_anchor() {
    let (engine, logistic_id, _) = engine_with_assignment().await;
    let payload = cargo_payload();
    let anchor = payload.pickup_at;

    let mut update = update_to(DispatchStatus::Covered, None);
    update.scheduled_at = Some(anchor);
    engine
        .update_with_cargo(logistic_id, update, attach_new(payload), Uuid::new_v4())
        .await
        .unwrap();

    engine
        .terminate(logistic_id, false, Uuid::new_v4())
        .await
        .unwrap();

    let joined = engine.get(logistic_id).await.unwrap();
    assert_eq!(joined.logistic.scheduled_at, Some(anchor));
    assert_eq!(joined.logistic.effective_since, anchor);
    assert!(!engine.storage().list_transactions(0).await.unwrap()[0].success);
}

#[tokio::test]
async fn terminate_without_cargo_writes_nothing() {
    let (engine, logistic_id, _) = engine_with_assignment().await;
    let err = engine
        .terminate(logistic_id, true, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(engine.storage().list_transactions(0).await.unwrap().is_empty());
    assert!(histories(&engine, logistic_id).await.is_empty());
}

#[tokio::test]
async fn the_ledger_is_not_deduplicated_across_trips() {
    let (engine, logistic_id, _) = engine_with_assignment().await;
    for _ in 0..2 {
        engine
            .update_with_cargo(
                logistic_id,
                update_to(DispatchStatus::Covered, None),
                attach_new(cargo_payload()),
                Uuid::new_v4(),
            )
            .await
            .unwrap();
        engine
            .terminate(logistic_id, true, Uuid::new_v4())
            .await
            .unwrap();
    }
    let ledger = engine.storage().list_transactions(0).await.unwrap();
    assert_eq!(ledger.len(), 2);
}

#[tokio::test]
async fn orphaned_cargo_survives_terminate() {
    let (engine, logistic_id, _) = engine_with_assignment().await;
    let cargo_id = engine
        .update_with_cargo(
            logistic_id,
            update_to(DispatchStatus::Covered, None),
            attach_new(cargo_payload()),
            Uuid::new_v4(),
        )
        .await
        .unwrap()
        .unwrap();
    engine
        .terminate(logistic_id, true, Uuid::new_v4())
        .await
        .unwrap();

    // The row is detached but still readable — the ledger references it.
    let mut tx = engine.storage().begin().await.unwrap();
    let orphan = engine.storage().get_cargo(&mut tx, cargo_id).await.unwrap();
    engine.storage().rollback(tx).await.unwrap();
    assert_eq!(orphan.id, cargo_id);
}

/// The end-to-end scenario: create → cover with a new load → terminate.
#[tokio::test]
async fn full_trip_scenario() {
    let (engine, logistic_id, _) = engine_with_assignment().await;
    let employee = Uuid::new_v4();

    let payload = cargo_payload();
    let cargo_id = engine
        .update_with_cargo(
            logistic_id,
            update_to(DispatchStatus::Covered, None),
            attach_new(payload.clone()),
            employee,
        )
        .await
        .unwrap()
        .unwrap();

    let covered = engine.get(logistic_id).await.unwrap();
    assert_eq!(covered.logistic.status, DispatchStatus::Covered);
    assert_eq!(covered.logistic.cargo_id, Some(cargo_id));
    let rows = histories(&engine, logistic_id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].to_cargo.as_ref().unwrap().id, cargo_id);

    engine.terminate(logistic_id, true, employee).await.unwrap();

    let closed = engine.get(logistic_id).await.unwrap();
    assert_eq!(closed.logistic.status, DispatchStatus::Ready);
    assert!(closed.logistic.cargo_id.is_none());

    let ledger = engine.storage().list_transactions(0).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert!(ledger[0].success);
    assert_eq!(ledger[0].origin, payload.origin);

    let rows = histories(&engine, logistic_id).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].from_cargo.as_ref().unwrap().id, cargo_id);
    assert!(rows[1].to_cargo.is_none());
}
