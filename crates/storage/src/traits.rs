use async_trait::async_trait;
use uuid::Uuid;

use fleetline_core::{DispatchStatus, OverviewRow};

use crate::error::StorageError;
use crate::record::{
    CargoRecord, CompanyRecord, DriverRecord, HistoryRecord, LogisticFilter, LogisticJoined,
    LogisticListing, LogisticRecord, PerformanceRecord, TransactionRecord,
};

/// The persistence gateway for the dispatch core.
///
/// A `DispatchStorage` implementation provides durable, transactional
/// storage for dispatch records, cargo, and the three append-only ledgers
/// (history, transactions, performances).
///
/// ## Transaction semantics
///
/// All mutating operations take `&mut Self::Tx`, a type representing an
/// in-progress transaction. The lifecycle is:
///
/// 1. `begin()` — start a transaction, returns a `Tx`
/// 2. Call mutating methods with `&mut tx`
/// 3. `commit(tx)` — commit and consume the transaction
///    OR `rollback(tx)` — roll back and consume the transaction
///
/// If a `Tx` is dropped without committing, the underlying transaction
/// MUST be rolled back. Every engine operation is exactly one transaction;
/// a failure at any step aborts the whole unit.
///
/// ## OCC conflict detection
///
/// `update_logistic` is conditional on `version = expected_version` and
/// returns `Err(StorageError::ConcurrentConflict { .. })` when another
/// transaction got there first.
///
/// ## Thread safety
///
/// Implementations must be `Send + Sync + 'static` so a single handle can
/// be shared across request workers and the background refresher.
#[async_trait]
pub trait DispatchStorage: Send + Sync + 'static {
    /// The transaction type used by this backend. Must be `Send` to cross
    /// async task boundaries.
    type Tx: Send;

    // ── Transaction lifecycle ────────────────────────────────────────────

    /// Begin a new transaction.
    async fn begin(&self) -> Result<Self::Tx, StorageError>;

    /// Commit a transaction, making all staged writes durable atomically.
    async fn commit(&self, tx: Self::Tx) -> Result<(), StorageError>;

    /// Roll back a transaction, discarding all staged writes.
    async fn rollback(&self, tx: Self::Tx) -> Result<(), StorageError>;

    // ── Dispatch records (within transaction) ────────────────────────────

    /// Insert a new dispatch record.
    ///
    /// Returns `Err(StorageError::DriverAlreadyAssigned)` if the driver
    /// already owns a live record (1:1 constraint).
    async fn insert_logistic(
        &self,
        tx: &mut Self::Tx,
        rec: LogisticRecord,
    ) -> Result<(), StorageError>;

    /// Read a dispatch record with its driver and cargo eager-loaded in one
    /// round trip, locking the row for update until the transaction ends.
    async fn get_logistic_for_update(
        &self,
        tx: &mut Self::Tx,
        id: Uuid,
    ) -> Result<LogisticJoined, StorageError>;

    /// Apply a version-validated update to a dispatch record (OCC).
    ///
    /// Conditional on `version = expected_version`; returns the new version
    /// on success, `Err(StorageError::ConcurrentConflict)` otherwise. The
    /// `version` and `updated_at` fields on `rec` are backend-managed and
    /// ignored as inputs.
    async fn update_logistic(
        &self,
        tx: &mut Self::Tx,
        rec: &LogisticRecord,
        expected_version: i64,
    ) -> Result<i64, StorageError>;

    // ── Cargo (within transaction) ───────────────────────────────────────

    /// Insert a new cargo row.
    async fn insert_cargo(&self, tx: &mut Self::Tx, rec: CargoRecord) -> Result<(), StorageError>;

    /// Update an existing cargo row in place.
    async fn update_cargo(&self, tx: &mut Self::Tx, rec: &CargoRecord) -> Result<(), StorageError>;

    /// Read a cargo row inside the transaction (sees staged writes).
    async fn get_cargo(&self, tx: &mut Self::Tx, id: Uuid) -> Result<CargoRecord, StorageError>;

    // ── Append-only ledgers (within transaction) ─────────────────────────

    /// Append a history row. History is never updated or deleted.
    ///
    /// Must be inserted in the SAME transaction as the dispatch-record
    /// update it documents: no transition without an audit row.
    async fn insert_history(
        &self,
        tx: &mut Self::Tx,
        rec: HistoryRecord,
    ) -> Result<(), StorageError>;

    /// Append a completed-trip ledger entry.
    async fn insert_transaction(
        &self,
        tx: &mut Self::Tx,
        rec: TransactionRecord,
    ) -> Result<(), StorageError>;

    /// Append a dispute row.
    async fn insert_performance(
        &self,
        tx: &mut Self::Tx,
        rec: PerformanceRecord,
    ) -> Result<(), StorageError>;

    // ── Collaborator entities ────────────────────────────────────────────

    /// Insert a driver row (used by driver registration, which creates the
    /// driver and its idle dispatch record in one transaction).
    async fn insert_driver(
        &self,
        tx: &mut Self::Tx,
        rec: DriverRecord,
    ) -> Result<(), StorageError>;

    /// Read a driver row outside any transaction.
    async fn get_driver(&self, id: Uuid) -> Result<DriverRecord, StorageError>;

    /// Insert a company row.
    async fn insert_company(&self, rec: CompanyRecord) -> Result<(), StorageError>;

    /// List all companies.
    async fn list_companies(&self) -> Result<Vec<CompanyRecord>, StorageError>;

    // ── Query operations (outside transaction, against the pool) ─────────

    /// Read a dispatch record with driver and cargo, without locking.
    async fn get_logistic(&self, id: Uuid) -> Result<LogisticJoined, StorageError>;

    /// Hard-delete a dispatch record.
    async fn delete_logistic(&self, id: Uuid) -> Result<(), StorageError>;

    /// List joined dispatch×driver rows matching the filter, ordered by
    /// company then status rank, paginated. Returns the page and the total
    /// match count.
    async fn list_logistics(
        &self,
        filter: &LogisticFilter,
    ) -> Result<(Vec<LogisticListing>, u64), StorageError>;

    /// List history rows, newest last, optionally for one dispatch record.
    async fn list_histories(
        &self,
        logistic_id: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, StorageError>;

    /// List trip ledger entries, newest last.
    async fn list_transactions(&self, limit: usize)
        -> Result<Vec<TransactionRecord>, StorageError>;

    /// List dispute rows, newest last.
    async fn list_performances(
        &self,
        limit: usize,
    ) -> Result<Vec<PerformanceRecord>, StorageError>;

    /// Joined dispatch×driver rows for the occupancy report.
    async fn overview_rows(&self) -> Result<Vec<OverviewRow>, StorageError>;

    // ── Cosmetic refresher ───────────────────────────────────────────────

    /// Rewrite the emoji column on every dispatch record from the given
    /// per-status table. A narrow single-column write, deliberately outside
    /// the transition transaction boundary. Returns the row count touched.
    async fn refresh_emojis(
        &self,
        pick: fn(DispatchStatus) -> &'static str,
    ) -> Result<u64, StorageError>;
}
