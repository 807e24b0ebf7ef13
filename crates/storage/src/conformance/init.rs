use std::future::Future;

use super::{make_driver, make_logistic, seed_assignment, TestResult};
use crate::{DispatchStorage, StorageError};

pub(super) async fn run_init_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "init",
            "insert_visible_after_commit",
            insert_visible_after_commit(factory).await,
        ),
        TestResult::from_result(
            "init",
            "inserted_fields_preserved",
            inserted_fields_preserved(factory).await,
        ),
        TestResult::from_result(
            "init",
            "get_eager_loads_driver",
            get_eager_loads_driver(factory).await,
        ),
        TestResult::from_result(
            "init",
            "second_record_for_same_driver_rejected",
            second_record_for_same_driver_rejected(factory).await,
        ),
    ]
}

/// After insert+commit, the dispatch record is retrievable.
async fn insert_visible_after_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (_, logistic) = seed_assignment(&s).await?;

    let joined = s.get_logistic(logistic.id).await.map_err(|e| e.to_string())?;
    if joined.logistic.id != logistic.id {
        return Err(format!(
            "expected logistic {}, got {}",
            logistic.id, joined.logistic.id
        ));
    }
    Ok(())
}

/// Every field of a committed record matches what was inserted.
async fn inserted_fields_preserved<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (_, logistic) = seed_assignment(&s).await?;

    let got = s
        .get_logistic(logistic.id)
        .await
        .map_err(|e| e.to_string())?
        .logistic;

    if got.driver_id != logistic.driver_id {
        return Err(format!("driver_id mismatch: got {}", got.driver_id));
    }
    if got.status != logistic.status {
        return Err(format!("status mismatch: got {}", got.status));
    }
    if got.state != logistic.state || got.location != logistic.location {
        return Err(format!(
            "geography mismatch: got {}/{}",
            got.state, got.location
        ));
    }
    if got.cargo_id.is_some() {
        return Err(format!("expected no cargo, got {:?}", got.cargo_id));
    }
    if got.version != 0 {
        return Err(format!("expected version 0, got {}", got.version));
    }
    Ok(())
}

/// The joined get returns the owning driver in the same round trip.
async fn get_eager_loads_driver<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (driver, logistic) = seed_assignment(&s).await?;

    let joined = s.get_logistic(logistic.id).await.map_err(|e| e.to_string())?;
    if joined.driver.id != driver.id {
        return Err(format!(
            "expected driver {}, got {}",
            driver.id, joined.driver.id
        ));
    }
    if joined.driver.surname != driver.surname {
        return Err(format!("surname mismatch: got {}", joined.driver.surname));
    }
    if joined.cargo.is_some() {
        return Err("idle record should join no cargo".to_string());
    }
    Ok(())
}

/// The 1:1 driver constraint: a second record for the same driver fails
/// with `DriverAlreadyAssigned` (at insert or at commit) and is not stored.
async fn second_record_for_same_driver_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let driver = make_driver(uuid::Uuid::new_v4());

    let mut tx = s.begin().await.map_err(|e| e.to_string())?;
    s.insert_driver(&mut tx, driver.clone())
        .await
        .map_err(|e| e.to_string())?;
    s.insert_logistic(&mut tx, make_logistic(driver.id))
        .await
        .map_err(|e| e.to_string())?;
    s.commit(tx).await.map_err(|e| e.to_string())?;

    let mut tx2 = s.begin().await.map_err(|e| e.to_string())?;
    let dup = make_logistic(driver.id);
    let staged = s.insert_logistic(&mut tx2, dup).await;
    let outcome = match staged {
        Err(e) => Err(e),
        Ok(()) => s.commit(tx2).await,
    };
    match outcome {
        Err(StorageError::DriverAlreadyAssigned { driver_id }) if driver_id == driver.id => Ok(()),
        Err(other) => Err(format!("expected DriverAlreadyAssigned, got {other}")),
        Ok(()) => Err("duplicate dispatch record was accepted".to_string()),
    }
}
