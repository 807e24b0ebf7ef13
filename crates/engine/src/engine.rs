//! The transition engine proper.
//!
//! Every operation is exactly one storage transaction: read the current
//! record (with driver and cargo eager-loaded), compute the new state,
//! write the dispatch row plus whatever ledger rows the transition implies,
//! and always one history row. Any error at any step rolls the whole unit
//! back.

use std::collections::HashMap;
use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use fleetline_core::{
    aggregate_overview, transition_allowed, CompanyOccupancy, DispatchStatus,
};
use fleetline_storage::{
    CargoRecord, DispatchStorage, DriverRecord, HistoryRecord, LogisticJoined, LogisticRecord,
    PerformanceRecord, StorageError, TransactionRecord,
};

use crate::error::EngineError;
use crate::request::{CargoChange, CargoPayload, DisputePayload, LogisticUpdate, NewDriver, NewLogistic};

/// Orchestrates dispatch transitions against a [`DispatchStorage`] backend.
///
/// Cheap to clone; share one per process. Concurrency control is the
/// backend's OCC check — there is no in-process state beyond the storage
/// handle.
pub struct TransitionEngine<S> {
    storage: Arc<S>,
}

impl<S> Clone for TransitionEngine<S> {
    fn clone(&self) -> Self {
        TransitionEngine {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: DispatchStorage> TransitionEngine<S> {
    pub fn new(storage: Arc<S>) -> Self {
        TransitionEngine { storage }
    }

    /// The underlying storage handle (shared with the emoji refresher).
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    // ── Creation ─────────────────────────────────────────────────────────

    /// Insert a new dispatch record. Fails with `InvalidState` before any
    /// write if the requested status and cargo pointer disagree.
    pub async fn create_logistic(&self, req: NewLogistic) -> Result<Uuid, EngineError> {
        check_load_invariant(req.status, req.cargo_id)?;
        let now = OffsetDateTime::now_utc();
        let rec = LogisticRecord {
            id: Uuid::new_v4(),
            driver_id: req.driver_id,
            post: req.post,
            status: req.status,
            effective_since: now,
            estimated_at: None,
            scheduled_at: req.scheduled_at,
            state: req.state,
            location: req.location,
            emoji: String::new(),
            note: req.note,
            cargo_id: req.cargo_id,
            version: 0,
            updated_at: now,
        };
        let id = rec.id;

        let mut tx = self.storage.begin().await?;
        let result = self.storage.insert_logistic(&mut tx, rec).await;
        match result {
            Ok(()) => {
                self.storage.commit(tx).await?;
                tracing::info!(logistic = %id, "dispatch record created");
                Ok(id)
            }
            Err(e) => {
                let _ = self.storage.rollback(tx).await;
                Err(e.into())
            }
        }
    }

    /// Insert a driver together with its idle dispatch record, atomically.
    pub async fn register_driver(&self, req: NewDriver) -> Result<(Uuid, Uuid), EngineError> {
        let now = OffsetDateTime::now_utc();
        let driver = DriverRecord {
            id: Uuid::new_v4(),
            name: req.name,
            surname: req.surname,
            driver_type: req.driver_type,
            position: req.position,
            company_id: req.company_id,
        };
        let rec = LogisticRecord {
            id: Uuid::new_v4(),
            driver_id: driver.id,
            post: false,
            status: DispatchStatus::Ready,
            effective_since: now,
            estimated_at: None,
            scheduled_at: None,
            state: String::new(),
            location: String::new(),
            emoji: String::new(),
            note: String::new(),
            cargo_id: None,
            version: 0,
            updated_at: now,
        };
        let ids = (driver.id, rec.id);

        let mut tx = self.storage.begin().await?;
        let result = async {
            self.storage.insert_driver(&mut tx, driver).await?;
            self.storage.insert_logistic(&mut tx, rec).await?;
            Ok::<(), StorageError>(())
        }
        .await;
        match result {
            Ok(()) => {
                self.storage.commit(tx).await?;
                tracing::info!(driver = %ids.0, logistic = %ids.1, "driver registered");
                Ok(ids)
            }
            Err(e) => {
                let _ = self.storage.rollback(tx).await;
                Err(e.into())
            }
        }
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// Plain status transition, no cargo change.
    ///
    /// Writes the dispatch row and one history row (cargo snapshots absent)
    /// in one transaction. `effective_since` becomes "now"; the estimate
    /// anchor is carried through for estimate-tracking statuses and cleared
    /// otherwise.
    pub async fn update(
        &self,
        id: Uuid,
        update: LogisticUpdate,
        by: Uuid,
    ) -> Result<(), EngineError> {
        let mut tx = self.storage.begin().await?;
        let result = self.update_in_tx(&mut tx, id, &update, by).await;
        match result {
            Ok(()) => {
                self.storage.commit(tx).await.map_err(conflict_on(id))?;
                tracing::info!(logistic = %id, status = %update.status, "dispatch updated");
                Ok(())
            }
            Err(e) => {
                let _ = self.storage.rollback(tx).await;
                Err(e)
            }
        }
    }

    async fn update_in_tx(
        &self,
        tx: &mut S::Tx,
        id: Uuid,
        update: &LogisticUpdate,
        by: Uuid,
    ) -> Result<(), EngineError> {
        let joined = self.fetch_for_update(tx, id).await?;
        check_transition(joined.logistic.status, update.status)?;
        check_load_invariant(update.status, update.cargo_id)?;

        let now = OffsetDateTime::now_utc();
        let next = apply_update(&joined.logistic, update, update.cargo_id, None, now);

        self.storage
            .update_logistic(tx, &next, joined.logistic.version)
            .await
            .map_err(conflict_on(id))?;
        self.storage
            .insert_history(
                tx,
                history_row(&joined.driver, &joined.logistic, &next, None, None, by, now),
            )
            .await?;
        Ok(())
    }

    /// Transition with load attach, detach, or amend.
    ///
    /// Returns the cargo id the record now points at, or `None` on detach.
    /// Pickup must not be after delivery; the check is unconditional.
    pub async fn update_with_cargo(
        &self,
        id: Uuid,
        update: LogisticUpdate,
        change: CargoChange,
        by: Uuid,
    ) -> Result<Option<Uuid>, EngineError> {
        let mut tx = self.storage.begin().await?;
        let result = self
            .update_with_cargo_in_tx(&mut tx, id, &update, &change, by)
            .await;
        match result {
            Ok(cargo_id) => {
                self.storage.commit(tx).await.map_err(conflict_on(id))?;
                tracing::info!(
                    logistic = %id,
                    status = %update.status,
                    cargo = ?cargo_id,
                    "dispatch updated with cargo"
                );
                Ok(cargo_id)
            }
            Err(e) => {
                let _ = self.storage.rollback(tx).await;
                Err(e)
            }
        }
    }

    async fn update_with_cargo_in_tx(
        &self,
        tx: &mut S::Tx,
        id: Uuid,
        update: &LogisticUpdate,
        change: &CargoChange,
        by: Uuid,
    ) -> Result<Option<Uuid>, EngineError> {
        // Detach: no load referenced and the target status is not a fresh
        // booking. Identical to a plain update with the pointer cleared.
        if update.status != DispatchStatus::Covered && change.cargo_id.is_none() {
            check_load_invariant(update.status, None)?;
            let joined = self.fetch_for_update(tx, id).await?;
            check_transition(joined.logistic.status, update.status)?;

            let now = OffsetDateTime::now_utc();
            let next = apply_update(&joined.logistic, update, None, None, now);
            self.storage
                .update_logistic(tx, &next, joined.logistic.version)
                .await
                .map_err(conflict_on(id))?;
            self.storage
                .insert_history(
                    tx,
                    history_row(&joined.driver, &joined.logistic, &next, None, None, by, now),
                )
                .await?;
            return Ok(None);
        }

        let payload = &change.cargo;
        if payload.pickup_at > payload.delivery_at {
            return Err(EngineError::PickupAfterDelivery {
                pickup: payload.pickup_at,
                delivery: payload.delivery_at,
            });
        }
        if update.status.is_idle() {
            return Err(EngineError::CargoForbidden {
                status: update.status,
            });
        }

        let joined = self.fetch_for_update(tx, id).await?;
        check_transition(joined.logistic.status, update.status)?;
        let now = OffsetDateTime::now_utc();

        let estimated_at = match update.status {
            DispatchStatus::Covered => Some(payload.pickup_at),
            DispatchStatus::Eta | DispatchStatus::EtaWillBeLate => Some(payload.delivery_at),
            _ => None,
        };

        let (cargo_id, from_cargo, to_cargo) = if change.create && change.cargo_id.is_none() {
            let cargo = cargo_record(payload, Uuid::new_v4(), now, now);
            let snapshot: fleetline_core::CargoSnapshot = (&cargo).into();
            let cargo_id = cargo.id;
            self.storage.insert_cargo(tx, cargo).await?;
            (cargo_id, None, Some(snapshot))
        } else {
            let cargo_id = change.cargo_id.ok_or(EngineError::CargoIdRequired)?;
            let prior = self
                .storage
                .get_cargo(tx, cargo_id)
                .await
                .map_err(|e| match e {
                    StorageError::CargoNotFound { id } => EngineError::CargoNotFound { id },
                    other => other.into(),
                })?;
            let next_cargo = cargo_record(payload, cargo_id, prior.created_at, now);
            let from_snapshot: fleetline_core::CargoSnapshot = (&prior).into();
            let to_snapshot: fleetline_core::CargoSnapshot = (&next_cargo).into();
            self.storage.update_cargo(tx, &next_cargo).await?;
            (cargo_id, Some(from_snapshot), Some(to_snapshot))
        };

        let next = apply_update(&joined.logistic, update, Some(cargo_id), estimated_at, now);
        self.storage
            .insert_history(
                tx,
                history_row(
                    &joined.driver,
                    &joined.logistic,
                    &next,
                    from_cargo,
                    to_cargo,
                    by,
                    now,
                ),
            )
            .await?;
        self.storage
            .update_logistic(tx, &next, joined.logistic.version)
            .await
            .map_err(conflict_on(id))?;

        Ok(Some(cargo_id))
    }

    /// Close out a trip: ledger entry, idle reset, audit row.
    ///
    /// The departing cargo row is left orphaned on purpose — the ledger
    /// entry still references its external load id.
    pub async fn terminate(&self, id: Uuid, success: bool, by: Uuid) -> Result<(), EngineError> {
        let mut tx = self.storage.begin().await?;
        let result = self.terminate_in_tx(&mut tx, id, success, by).await;
        match result {
            Ok(()) => {
                self.storage.commit(tx).await.map_err(conflict_on(id))?;
                tracing::info!(logistic = %id, success, "dispatch terminated");
                Ok(())
            }
            Err(e) => {
                let _ = self.storage.rollback(tx).await;
                Err(e)
            }
        }
    }

    async fn terminate_in_tx(
        &self,
        tx: &mut S::Tx,
        id: Uuid,
        success: bool,
        by: Uuid,
    ) -> Result<(), EngineError> {
        let joined = self.fetch_for_update(tx, id).await?;
        let cargo = joined
            .cargo
            .as_ref()
            .ok_or(EngineError::NoCargoAttached { id })?;

        let now = OffsetDateTime::now_utc();
        self.storage
            .insert_transaction(
                tx,
                trip_ledger_entry(cargo, joined.logistic.driver_id, success, now),
            )
            .await?;

        let next = idle_reset(&joined.logistic, now);
        self.storage
            .update_logistic(tx, &next, joined.logistic.version)
            .await
            .map_err(conflict_on(id))?;
        self.storage
            .insert_history(
                tx,
                history_row(
                    &joined.driver,
                    &joined.logistic,
                    &next,
                    Some(cargo.into()),
                    None,
                    by,
                    now,
                ),
            )
            .await?;
        Ok(())
    }

    /// Record a dispute; with `cancel` set, also tear the assignment down.
    ///
    /// Fails with `InvalidState` — and writes nothing — when the record
    /// has no attached cargo: there is no load to dispute.
    pub async fn cancel_late(
        &self,
        id: Uuid,
        dispute: DisputePayload,
        by: Uuid,
        company_id: Uuid,
    ) -> Result<(), EngineError> {
        let mut tx = self.storage.begin().await?;
        let result = self
            .cancel_late_in_tx(&mut tx, id, &dispute, by, company_id)
            .await;
        match result {
            Ok(()) => {
                self.storage.commit(tx).await.map_err(conflict_on(id))?;
                tracing::info!(logistic = %id, cancel = dispute.cancel, "dispute recorded");
                Ok(())
            }
            Err(e) => {
                let _ = self.storage.rollback(tx).await;
                Err(e)
            }
        }
    }

    async fn cancel_late_in_tx(
        &self,
        tx: &mut S::Tx,
        id: Uuid,
        dispute: &DisputePayload,
        by: Uuid,
        company_id: Uuid,
    ) -> Result<(), EngineError> {
        let joined = self.fetch_for_update(tx, id).await?;
        let cargo = joined
            .cargo
            .as_ref()
            .ok_or(EngineError::NoCargoAttached { id })?;

        let now = OffsetDateTime::now_utc();
        self.storage
            .insert_performance(
                tx,
                PerformanceRecord {
                    id: Uuid::new_v4(),
                    reason: dispute.reason.clone(),
                    fault: dispute.fault,
                    status: dispute.status,
                    section: dispute.section.clone(),
                    employee_id: by,
                    company_id,
                    load_external_id: cargo.external_id.clone(),
                    recorded_at: now,
                },
            )
            .await?;

        if dispute.cancel {
            self.storage
                .insert_transaction(
                    tx,
                    trip_ledger_entry(cargo, joined.logistic.driver_id, false, now),
                )
                .await?;

            let next = idle_reset(&joined.logistic, now);
            self.storage
                .update_logistic(tx, &next, joined.logistic.version)
                .await
                .map_err(conflict_on(id))?;
            self.storage
                .insert_history(
                    tx,
                    history_row(
                        &joined.driver,
                        &joined.logistic,
                        &next,
                        Some(cargo.into()),
                        None,
                        by,
                        now,
                    ),
                )
                .await?;
        }
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Fetch one record with its driver and cargo.
    pub async fn get(&self, id: Uuid) -> Result<LogisticJoined, EngineError> {
        self.storage.get_logistic(id).await.map_err(|e| match e {
            StorageError::LogisticNotFound { id } => EngineError::NotFound { id },
            other => other.into(),
        })
    }

    /// Hard-delete a dispatch record.
    pub async fn delete_logistic(&self, id: Uuid) -> Result<(), EngineError> {
        self.storage.delete_logistic(id).await.map_err(|e| match e {
            StorageError::LogisticNotFound { id } => EngineError::NotFound { id },
            other => other.into(),
        })
    }

    /// Audit trail rows, optionally scoped to one dispatch record.
    pub async fn history(
        &self,
        logistic_id: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, EngineError> {
        Ok(self.storage.list_histories(logistic_id, limit).await?)
    }

    /// Completed-trip ledger entries.
    pub async fn transactions(&self, limit: usize) -> Result<Vec<TransactionRecord>, EngineError> {
        Ok(self.storage.list_transactions(limit).await?)
    }

    /// Dispute rows.
    pub async fn performances(
        &self,
        limit: usize,
    ) -> Result<Vec<PerformanceRecord>, EngineError> {
        Ok(self.storage.list_performances(limit).await?)
    }

    /// Per-company occupancy counts, one `now` snapshot for the whole
    /// report. Mutates nothing.
    pub async fn overview(&self) -> Result<Vec<CompanyOccupancy>, EngineError> {
        let rows = self.storage.overview_rows().await?;
        let now = OffsetDateTime::now_utc();
        let mut report = aggregate_overview(&rows, now);

        let names: HashMap<Uuid, String> = self
            .storage
            .list_companies()
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        for entry in &mut report {
            if let Some(name) = names.get(&entry.company_id) {
                entry.name = name.clone();
            }
        }
        Ok(report)
    }

    async fn fetch_for_update(
        &self,
        tx: &mut S::Tx,
        id: Uuid,
    ) -> Result<LogisticJoined, EngineError> {
        self.storage
            .get_logistic_for_update(tx, id)
            .await
            .map_err(|e| match e {
                StorageError::LogisticNotFound { id } => EngineError::NotFound { id },
                other => other.into(),
            })
    }
}

// ── Pure helpers ─────────────────────────────────────────────────────────

fn check_load_invariant(
    status: DispatchStatus,
    cargo_id: Option<Uuid>,
) -> Result<(), EngineError> {
    match (status.has_active_load(), cargo_id) {
        (true, None) => Err(EngineError::CargoRequired { status }),
        (false, Some(_)) => Err(EngineError::CargoForbidden { status }),
        _ => Ok(()),
    }
}

fn check_transition(from: DispatchStatus, to: DispatchStatus) -> Result<(), EngineError> {
    if transition_allowed(from, to) {
        Ok(())
    } else {
        Err(EngineError::TransitionNotAllowed { from, to })
    }
}

fn conflict_on(id: Uuid) -> impl Fn(StorageError) -> EngineError {
    move |e| match e {
        StorageError::ConcurrentConflict { .. } => EngineError::Conflict { id },
        other => other.into(),
    }
}

/// The successor record for an update call.
///
/// `estimate` overrides the anchor when the caller (update-with-cargo)
/// derived one from the load's times; a plain update carries the existing
/// anchor through while the status still tracks an estimate, and clears it
/// otherwise. The emoji column is untouched — it belongs to the refresher.
fn apply_update(
    current: &LogisticRecord,
    update: &LogisticUpdate,
    cargo_id: Option<Uuid>,
    estimate: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> LogisticRecord {
    let estimated_at = match estimate {
        Some(at) => Some(at),
        None if update.status.tracks_estimate() => current.estimated_at,
        None => None,
    };
    LogisticRecord {
        id: current.id,
        driver_id: current.driver_id,
        post: update.post,
        status: update.status,
        effective_since: now,
        estimated_at,
        scheduled_at: update.scheduled_at,
        state: update.state.clone(),
        location: update.location.clone(),
        emoji: current.emoji.clone(),
        note: update.note.clone(),
        cargo_id,
        version: current.version,
        updated_at: now,
    }
}

/// Reset a record to idle after terminate/cancel. The trip clock restarts
/// at the scheduled anchor, defaulted to "now" when it was never set.
fn idle_reset(current: &LogisticRecord, now: OffsetDateTime) -> LogisticRecord {
    let scheduled = current.scheduled_at.unwrap_or(now);
    LogisticRecord {
        id: current.id,
        driver_id: current.driver_id,
        post: false,
        status: DispatchStatus::Ready,
        effective_since: scheduled,
        estimated_at: None,
        scheduled_at: Some(scheduled),
        state: current.state.clone(),
        location: current.location.clone(),
        emoji: String::new(),
        note: String::new(),
        cargo_id: None,
        version: current.version,
        updated_at: now,
    }
}

fn cargo_record(
    payload: &CargoPayload,
    id: Uuid,
    created_at: OffsetDateTime,
    now: OffsetDateTime,
) -> CargoRecord {
    CargoRecord {
        id,
        external_id: payload.external_id.clone(),
        provider: payload.provider.clone(),
        loaded_miles: payload.loaded_miles,
        free_miles: payload.free_miles,
        origin: payload.origin.clone(),
        destination: payload.destination.clone(),
        cost: payload.cost,
        rate: payload.rate,
        pickup_at: payload.pickup_at,
        delivery_at: payload.delivery_at,
        booked_by: payload.booked_by,
        created_at,
        updated_at: now,
    }
}

fn trip_ledger_entry(
    cargo: &CargoRecord,
    driver_id: Uuid,
    success: bool,
    now: OffsetDateTime,
) -> TransactionRecord {
    TransactionRecord {
        id: Uuid::new_v4(),
        origin: cargo.origin.clone(),
        destination: cargo.destination.clone(),
        pickup_at: cargo.pickup_at,
        delivery_at: cargo.delivery_at,
        loaded_miles: cargo.loaded_miles,
        total_miles: cargo.loaded_miles + cargo.free_miles,
        provider: cargo.provider.clone(),
        cost: cargo.cost,
        rate: cargo.rate,
        driver_id,
        employee_id: cargo.booked_by,
        external_id: cargo.external_id.clone(),
        success,
        recorded_at: now,
    }
}

fn history_row(
    driver: &DriverRecord,
    from: &LogisticRecord,
    to: &LogisticRecord,
    from_cargo: Option<fleetline_core::CargoSnapshot>,
    to_cargo: Option<fleetline_core::CargoSnapshot>,
    by: Uuid,
    now: OffsetDateTime,
) -> HistoryRecord {
    HistoryRecord {
        id: Uuid::new_v4(),
        driver_name: driver.display_name(),
        logistic_id: from.id,
        from_logistic: from.into(),
        to_logistic: to.into(),
        from_cargo,
        to_cargo,
        employee_id: by,
        recorded_at: now,
    }
}
