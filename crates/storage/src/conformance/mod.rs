//! Conformance test suite for `DispatchStorage` implementations.
//!
//! A backend-agnostic suite that any `DispatchStorage` implementation can
//! run to verify correctness. The suite covers:
//!
//! - **Initialization**: record creation, driver 1:1 constraint
//! - **Transaction isolation**: uncommitted writes invisible, rollback and
//!   drop discard everything
//! - **Atomic commit**: all-or-nothing semantics for multi-record
//!   transactions, history coupled to the update it documents
//! - **Version validation / OCC**: stale-version conflict detection
//! - **Error handling**: correct error variants for invalid operations
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function
//! that creates a fresh, empty storage instance for each test:
//!
//! ```ignore
//! use fleetline_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn postgres_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_postgres_storage().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod commit;
mod errors;
mod init;
mod isolation;
mod version;

use std::fmt;
use std::future::Future;

use rust_decimal::Decimal;
use time::macros::datetime;
use uuid::Uuid;

use fleetline_core::DispatchStatus;

use crate::record::{
    CargoRecord, DisputeStatus, DriverRecord, FaultParty, HistoryRecord, LogisticRecord,
    PerformanceRecord, TransactionRecord,
};
use crate::DispatchStorage;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "init", "isolation", "commit").
    pub category: String,
    /// Test name (e.g. "uncommitted_writes_invisible").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self {
                category: category.to_string(),
                name: name.to_string(),
                passed: true,
                message: None,
            },
            Err(msg) => Self {
                category: category.to_string(),
                name: name.to_string(),
                passed: false,
                message: Some(msg),
            },
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// storage instance, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(init::run_init_tests(&factory).await);
    results.extend(isolation::run_isolation_tests(&factory).await);
    results.extend(commit::run_commit_tests(&factory).await);
    results.extend(version::run_version_tests(&factory).await);
    results.extend(errors::run_error_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

pub(super) const T0: time::OffsetDateTime = datetime!(2025-01-01 00:00 UTC);

fn make_driver(company_id: Uuid) -> DriverRecord {
    DriverRecord {
        id: Uuid::new_v4(),
        name: "Alan".to_string(),
        surname: "Turner".to_string(),
        driver_type: "SOLO".to_string(),
        position: "OW".to_string(),
        company_id,
    }
}

fn make_logistic(driver_id: Uuid) -> LogisticRecord {
    LogisticRecord {
        id: Uuid::new_v4(),
        driver_id,
        post: false,
        status: DispatchStatus::Ready,
        effective_since: T0,
        estimated_at: None,
        scheduled_at: None,
        state: "IL".to_string(),
        location: "Chicago, IL".to_string(),
        emoji: String::new(),
        note: String::new(),
        cargo_id: None,
        version: 0,
        updated_at: T0,
    }
}

fn make_cargo(booked_by: Uuid) -> CargoRecord {
    CargoRecord {
        id: Uuid::new_v4(),
        external_id: "LD-1001".to_string(),
        provider: "TQL".to_string(),
        loaded_miles: 500,
        free_miles: 40,
        origin: "Chicago, IL".to_string(),
        destination: "Dallas, TX".to_string(),
        cost: 1800,
        rate: Decimal::new(360, 2),
        pickup_at: datetime!(2025-01-02 08:00 UTC),
        delivery_at: datetime!(2025-01-03 16:00 UTC),
        booked_by,
        created_at: T0,
        updated_at: T0,
    }
}

fn make_history(from: &LogisticRecord, to: &LogisticRecord, employee_id: Uuid) -> HistoryRecord {
    HistoryRecord {
        id: Uuid::new_v4(),
        driver_name: "Alan Turner".to_string(),
        logistic_id: from.id,
        from_logistic: from.into(),
        to_logistic: to.into(),
        from_cargo: None,
        to_cargo: None,
        employee_id,
        recorded_at: T0,
    }
}

fn make_transaction(driver_id: Uuid, success: bool) -> TransactionRecord {
    TransactionRecord {
        id: Uuid::new_v4(),
        origin: "Chicago, IL".to_string(),
        destination: "Dallas, TX".to_string(),
        pickup_at: datetime!(2025-01-02 08:00 UTC),
        delivery_at: datetime!(2025-01-03 16:00 UTC),
        loaded_miles: 500,
        total_miles: 540,
        provider: "TQL".to_string(),
        cost: 1800,
        rate: Decimal::new(360, 2),
        driver_id,
        employee_id: Uuid::new_v4(),
        external_id: "LD-1001".to_string(),
        success,
        recorded_at: T0,
    }
}

fn make_performance(company_id: Uuid) -> PerformanceRecord {
    PerformanceRecord {
        id: Uuid::new_v4(),
        reason: "late pickup".to_string(),
        fault: FaultParty::Driver,
        status: DisputeStatus::Canceled,
        section: "dispatch".to_string(),
        employee_id: Uuid::new_v4(),
        company_id,
        load_external_id: "LD-1001".to_string(),
        recorded_at: T0,
    }
}

/// Insert a driver and its idle dispatch record in one committed
/// transaction; returns the records as committed.
async fn seed_assignment<S: DispatchStorage>(
    storage: &S,
) -> Result<(DriverRecord, LogisticRecord), String> {
    let driver = make_driver(Uuid::new_v4());
    let logistic = make_logistic(driver.id);

    let mut tx = storage.begin().await.map_err(|e| e.to_string())?;
    storage
        .insert_driver(&mut tx, driver.clone())
        .await
        .map_err(|e| e.to_string())?;
    storage
        .insert_logistic(&mut tx, logistic.clone())
        .await
        .map_err(|e| e.to_string())?;
    storage.commit(tx).await.map_err(|e| e.to_string())?;

    Ok((driver, logistic))
}
