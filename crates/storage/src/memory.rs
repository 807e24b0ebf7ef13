//! Reference in-memory backend.
//!
//! Writes are staged on the transaction object and applied under a single
//! lock at commit, so uncommitted writes are invisible to readers and a
//! dropped transaction leaves committed state untouched. OCC versions are
//! validated both when an update is staged and again at commit, so a
//! transaction that raced a concurrent commit fails with
//! `ConcurrentConflict` instead of silently losing the other write.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use fleetline_core::{DispatchStatus, OverviewRow};

use crate::error::StorageError;
use crate::record::{
    CargoRecord, CompanyRecord, DriverRecord, HistoryRecord, LogisticFilter, LogisticJoined,
    LogisticListing, LogisticRecord, PerformanceRecord, TransactionRecord,
};
use crate::traits::DispatchStorage;

#[derive(Debug, Default, Clone)]
struct Tables {
    logistics: HashMap<Uuid, LogisticRecord>,
    cargos: HashMap<Uuid, CargoRecord>,
    drivers: HashMap<Uuid, DriverRecord>,
    companies: Vec<CompanyRecord>,
    histories: Vec<HistoryRecord>,
    transactions: Vec<TransactionRecord>,
    performances: Vec<PerformanceRecord>,
}

#[derive(Debug, Clone)]
enum Write {
    InsertLogistic(LogisticRecord),
    UpdateLogistic {
        rec: LogisticRecord,
        expected_version: i64,
    },
    InsertCargo(CargoRecord),
    UpdateCargo(CargoRecord),
    InsertHistory(HistoryRecord),
    InsertTransaction(TransactionRecord),
    InsertPerformance(PerformanceRecord),
    InsertDriver(DriverRecord),
}

/// Staged writes for one in-progress transaction. Dropping it without a
/// commit discards everything.
pub struct MemoryTx {
    staged: Vec<Write>,
}

/// In-memory `DispatchStorage` used by the engine tests and as the model
/// implementation for the conformance suite.
#[derive(Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed state with this transaction's staged writes applied on top.
    fn view(&self, tx: &MemoryTx) -> Result<Tables, StorageError> {
        let mut tables = self.tables.lock().expect("storage lock").clone();
        for write in &tx.staged {
            apply(&mut tables, write.clone())?;
        }
        Ok(tables)
    }

    fn committed(&self) -> Tables {
        self.tables.lock().expect("storage lock").clone()
    }
}

/// Apply one staged write, validating constraints against the state built
/// up so far. Used identically for overlay reads and for the final commit.
fn apply(tables: &mut Tables, write: Write) -> Result<(), StorageError> {
    match write {
        Write::InsertLogistic(rec) => {
            if tables
                .logistics
                .values()
                .any(|l| l.driver_id == rec.driver_id)
            {
                return Err(StorageError::DriverAlreadyAssigned {
                    driver_id: rec.driver_id,
                });
            }
            tables.logistics.insert(rec.id, rec);
        }
        Write::UpdateLogistic {
            mut rec,
            expected_version,
        } => {
            let current = tables
                .logistics
                .get(&rec.id)
                .ok_or(StorageError::LogisticNotFound { id: rec.id })?;
            if current.version != expected_version {
                return Err(StorageError::ConcurrentConflict {
                    id: rec.id,
                    expected_version,
                });
            }
            rec.version = expected_version + 1;
            rec.updated_at = OffsetDateTime::now_utc();
            tables.logistics.insert(rec.id, rec);
        }
        Write::InsertCargo(rec) => {
            tables.cargos.insert(rec.id, rec);
        }
        Write::UpdateCargo(rec) => {
            if !tables.cargos.contains_key(&rec.id) {
                return Err(StorageError::CargoNotFound { id: rec.id });
            }
            tables.cargos.insert(rec.id, rec);
        }
        Write::InsertHistory(rec) => tables.histories.push(rec),
        Write::InsertTransaction(rec) => tables.transactions.push(rec),
        Write::InsertPerformance(rec) => tables.performances.push(rec),
        Write::InsertDriver(rec) => {
            tables.drivers.insert(rec.id, rec);
        }
    }
    Ok(())
}

fn join_logistic(tables: &Tables, id: Uuid) -> Result<LogisticJoined, StorageError> {
    let logistic = tables
        .logistics
        .get(&id)
        .cloned()
        .ok_or(StorageError::LogisticNotFound { id })?;
    let driver = tables
        .drivers
        .get(&logistic.driver_id)
        .cloned()
        .ok_or(StorageError::DriverNotFound {
            id: logistic.driver_id,
        })?;
    let cargo = match logistic.cargo_id {
        Some(cargo_id) => Some(
            tables
                .cargos
                .get(&cargo_id)
                .cloned()
                .ok_or(StorageError::CargoNotFound { id: cargo_id })?,
        ),
        None => None,
    };
    Ok(LogisticJoined {
        logistic,
        driver,
        cargo,
    })
}

fn matches_filter(filter: &LogisticFilter, logistic: &LogisticRecord, driver: &DriverRecord) -> bool {
    if let Some(status) = filter.status {
        if logistic.status != status {
            return false;
        }
    }
    if let Some(location) = &filter.location {
        if &logistic.location != location {
            return false;
        }
    }
    if let Some(state) = &filter.state {
        if &logistic.state != state {
            return false;
        }
    }
    if let Some(post) = filter.post {
        if logistic.post != post {
            return false;
        }
    }
    if let Some(name) = &filter.driver_name {
        if &driver.name != name {
            return false;
        }
    }
    if let Some(driver_type) = &filter.driver_type {
        if &driver.driver_type != driver_type {
            return false;
        }
    }
    if let Some(position) = &filter.position {
        if &driver.position != position {
            return false;
        }
    }
    if !filter.company_ids.is_empty() && !filter.company_ids.contains(&driver.company_id) {
        return false;
    }
    true
}

#[async_trait]
impl DispatchStorage for MemoryStorage {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<Self::Tx, StorageError> {
        Ok(MemoryTx { staged: Vec::new() })
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StorageError> {
        let mut tables = self.tables.lock().expect("storage lock");
        // Replay against a scratch copy so a failed validation leaves the
        // committed state untouched.
        let mut next = tables.clone();
        for write in tx.staged {
            apply(&mut next, write)?;
        }
        *tables = next;
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StorageError> {
        drop(tx);
        Ok(())
    }

    async fn insert_logistic(
        &self,
        tx: &mut Self::Tx,
        rec: LogisticRecord,
    ) -> Result<(), StorageError> {
        let mut view = self.view(tx)?;
        apply(&mut view, Write::InsertLogistic(rec.clone()))?;
        tx.staged.push(Write::InsertLogistic(rec));
        Ok(())
    }

    async fn get_logistic_for_update(
        &self,
        tx: &mut Self::Tx,
        id: Uuid,
    ) -> Result<LogisticJoined, StorageError> {
        let view = self.view(tx)?;
        join_logistic(&view, id)
    }

    async fn update_logistic(
        &self,
        tx: &mut Self::Tx,
        rec: &LogisticRecord,
        expected_version: i64,
    ) -> Result<i64, StorageError> {
        let mut view = self.view(tx)?;
        apply(
            &mut view,
            Write::UpdateLogistic {
                rec: rec.clone(),
                expected_version,
            },
        )?;
        tx.staged.push(Write::UpdateLogistic {
            rec: rec.clone(),
            expected_version,
        });
        Ok(expected_version + 1)
    }

    async fn insert_cargo(&self, tx: &mut Self::Tx, rec: CargoRecord) -> Result<(), StorageError> {
        tx.staged.push(Write::InsertCargo(rec));
        Ok(())
    }

    async fn update_cargo(&self, tx: &mut Self::Tx, rec: &CargoRecord) -> Result<(), StorageError> {
        let mut view = self.view(tx)?;
        apply(&mut view, Write::UpdateCargo(rec.clone()))?;
        tx.staged.push(Write::UpdateCargo(rec.clone()));
        Ok(())
    }

    async fn get_cargo(&self, tx: &mut Self::Tx, id: Uuid) -> Result<CargoRecord, StorageError> {
        let view = self.view(tx)?;
        view.cargos
            .get(&id)
            .cloned()
            .ok_or(StorageError::CargoNotFound { id })
    }

    async fn insert_history(
        &self,
        tx: &mut Self::Tx,
        rec: HistoryRecord,
    ) -> Result<(), StorageError> {
        tx.staged.push(Write::InsertHistory(rec));
        Ok(())
    }

    async fn insert_transaction(
        &self,
        tx: &mut Self::Tx,
        rec: TransactionRecord,
    ) -> Result<(), StorageError> {
        tx.staged.push(Write::InsertTransaction(rec));
        Ok(())
    }

    async fn insert_performance(
        &self,
        tx: &mut Self::Tx,
        rec: PerformanceRecord,
    ) -> Result<(), StorageError> {
        tx.staged.push(Write::InsertPerformance(rec));
        Ok(())
    }

    async fn insert_driver(
        &self,
        tx: &mut Self::Tx,
        rec: DriverRecord,
    ) -> Result<(), StorageError> {
        tx.staged.push(Write::InsertDriver(rec));
        Ok(())
    }

    async fn get_driver(&self, id: Uuid) -> Result<DriverRecord, StorageError> {
        self.committed()
            .drivers
            .get(&id)
            .cloned()
            .ok_or(StorageError::DriverNotFound { id })
    }

    async fn insert_company(&self, rec: CompanyRecord) -> Result<(), StorageError> {
        self.tables.lock().expect("storage lock").companies.push(rec);
        Ok(())
    }

    async fn list_companies(&self) -> Result<Vec<CompanyRecord>, StorageError> {
        Ok(self.committed().companies)
    }

    async fn get_logistic(&self, id: Uuid) -> Result<LogisticJoined, StorageError> {
        join_logistic(&self.committed(), id)
    }

    async fn delete_logistic(&self, id: Uuid) -> Result<(), StorageError> {
        let mut tables = self.tables.lock().expect("storage lock");
        tables
            .logistics
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::LogisticNotFound { id })
    }

    async fn list_logistics(
        &self,
        filter: &LogisticFilter,
    ) -> Result<(Vec<LogisticListing>, u64), StorageError> {
        let tables = self.committed();

        let mut rows: Vec<LogisticListing> = tables
            .logistics
            .values()
            .filter_map(|logistic| {
                let driver = tables.drivers.get(&logistic.driver_id)?;
                matches_filter(filter, logistic, driver).then(|| LogisticListing {
                    logistic: logistic.clone(),
                    driver_name: driver.name.clone(),
                    driver_surname: driver.surname.clone(),
                    driver_type: driver.driver_type.clone(),
                    driver_position: driver.position.clone(),
                    company_id: driver.company_id,
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            (a.company_id, a.logistic.status.sort_rank(), &a.driver_surname).cmp(&(
                b.company_id,
                b.logistic.status.sort_rank(),
                &b.driver_surname,
            ))
        });

        let total = rows.len() as u64;
        let offset = filter.page.saturating_sub(1).saturating_mul(filter.limit) as usize;
        let page: Vec<LogisticListing> = rows
            .into_iter()
            .skip(offset)
            .take(filter.limit as usize)
            .collect();

        Ok((page, total))
    }

    async fn list_histories(
        &self,
        logistic_id: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, StorageError> {
        let tables = self.committed();
        let rows: Vec<HistoryRecord> = tables
            .histories
            .into_iter()
            .filter(|h| logistic_id.map_or(true, |id| h.logistic_id == id))
            .take(if limit == 0 { usize::MAX } else { limit })
            .collect();
        Ok(rows)
    }

    async fn list_transactions(
        &self,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, StorageError> {
        let tables = self.committed();
        Ok(tables
            .transactions
            .into_iter()
            .take(if limit == 0 { usize::MAX } else { limit })
            .collect())
    }

    async fn list_performances(
        &self,
        limit: usize,
    ) -> Result<Vec<PerformanceRecord>, StorageError> {
        let tables = self.committed();
        Ok(tables
            .performances
            .into_iter()
            .take(if limit == 0 { usize::MAX } else { limit })
            .collect())
    }

    async fn overview_rows(&self) -> Result<Vec<OverviewRow>, StorageError> {
        let tables = self.committed();
        Ok(tables
            .logistics
            .values()
            .filter_map(|logistic| {
                let driver = tables.drivers.get(&logistic.driver_id)?;
                Some(OverviewRow {
                    company_id: driver.company_id,
                    status: logistic.status,
                    estimated_at: logistic.estimated_at,
                })
            })
            .collect())
    }

    async fn refresh_emojis(
        &self,
        pick: fn(DispatchStatus) -> &'static str,
    ) -> Result<u64, StorageError> {
        let mut tables = self.tables.lock().expect("storage lock");
        let mut touched = 0;
        for logistic in tables.logistics.values_mut() {
            logistic.emoji = pick(logistic.status).to_string();
            touched += 1;
        }
        Ok(touched)
    }
}
