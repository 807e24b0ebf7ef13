use std::future::Future;

use super::{make_driver, make_logistic, seed_assignment, TestResult};
use crate::{DispatchStorage, StorageError};

pub(super) async fn run_isolation_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "isolation",
            "uncommitted_insert_invisible",
            uncommitted_insert_invisible(factory).await,
        ),
        TestResult::from_result(
            "isolation",
            "uncommitted_update_invisible",
            uncommitted_update_invisible(factory).await,
        ),
        TestResult::from_result(
            "isolation",
            "rollback_discards_writes",
            rollback_discards_writes(factory).await,
        ),
        TestResult::from_result(
            "isolation",
            "dropped_tx_discards_writes",
            dropped_tx_discards_writes(factory).await,
        ),
        TestResult::from_result(
            "isolation",
            "tx_reads_its_own_writes",
            tx_reads_its_own_writes(factory).await,
        ),
    ]
}

/// An inserted-but-uncommitted record is invisible to pool reads.
async fn uncommitted_insert_invisible<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let driver = make_driver(uuid::Uuid::new_v4());
    let logistic = make_logistic(driver.id);

    let mut tx = s.begin().await.map_err(|e| e.to_string())?;
    s.insert_driver(&mut tx, driver)
        .await
        .map_err(|e| e.to_string())?;
    s.insert_logistic(&mut tx, logistic.clone())
        .await
        .map_err(|e| e.to_string())?;

    match s.get_logistic(logistic.id).await {
        Err(StorageError::LogisticNotFound { .. }) => {}
        Ok(_) => return Err("uncommitted insert visible to pool read".to_string()),
        Err(other) => return Err(format!("expected LogisticNotFound, got {other}")),
    }

    s.rollback(tx).await.map_err(|e| e.to_string())?;
    Ok(())
}

/// A staged update is invisible until commit.
async fn uncommitted_update_invisible<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (_, logistic) = seed_assignment(&s).await?;

    let mut tx = s.begin().await.map_err(|e| e.to_string())?;
    let mut updated = logistic.clone();
    updated.note = "staged".to_string();
    s.update_logistic(&mut tx, &updated, 0)
        .await
        .map_err(|e| e.to_string())?;

    let read = s
        .get_logistic(logistic.id)
        .await
        .map_err(|e| e.to_string())?;
    if read.logistic.note != logistic.note {
        return Err("staged update visible to pool read".to_string());
    }

    s.rollback(tx).await.map_err(|e| e.to_string())?;
    Ok(())
}

/// Rollback discards every staged write.
async fn rollback_discards_writes<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (_, logistic) = seed_assignment(&s).await?;

    let mut tx = s.begin().await.map_err(|e| e.to_string())?;
    let mut updated = logistic.clone();
    updated.note = "rolled back".to_string();
    s.update_logistic(&mut tx, &updated, 0)
        .await
        .map_err(|e| e.to_string())?;
    s.rollback(tx).await.map_err(|e| e.to_string())?;

    let read = s
        .get_logistic(logistic.id)
        .await
        .map_err(|e| e.to_string())?;
    if read.logistic.note != logistic.note {
        return Err("rolled-back update still applied".to_string());
    }
    if read.logistic.version != 0 {
        return Err(format!(
            "rolled-back update bumped version to {}",
            read.logistic.version
        ));
    }
    Ok(())
}

/// Dropping a transaction without commit must roll it back.
async fn dropped_tx_discards_writes<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (_, logistic) = seed_assignment(&s).await?;

    {
        let mut tx = s.begin().await.map_err(|e| e.to_string())?;
        let mut updated = logistic.clone();
        updated.note = "dropped".to_string();
        s.update_logistic(&mut tx, &updated, 0)
            .await
            .map_err(|e| e.to_string())?;
        drop(tx);
    }

    let read = s
        .get_logistic(logistic.id)
        .await
        .map_err(|e| e.to_string())?;
    if read.logistic.note != logistic.note {
        return Err("dropped transaction's update still applied".to_string());
    }
    Ok(())
}

/// Within a transaction, reads see that transaction's staged writes.
async fn tx_reads_its_own_writes<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (_, logistic) = seed_assignment(&s).await?;

    let mut tx = s.begin().await.map_err(|e| e.to_string())?;
    let mut updated = logistic.clone();
    updated.note = "own write".to_string();
    s.update_logistic(&mut tx, &updated, 0)
        .await
        .map_err(|e| e.to_string())?;

    let read = s
        .get_logistic_for_update(&mut tx, logistic.id)
        .await
        .map_err(|e| e.to_string())?;
    if read.logistic.note != "own write" {
        return Err(format!(
            "expected staged note, got {:?}",
            read.logistic.note
        ));
    }

    s.rollback(tx).await.map_err(|e| e.to_string())?;
    Ok(())
}
