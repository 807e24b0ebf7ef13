use std::future::Future;

use super::{seed_assignment, TestResult};
use crate::{DispatchStorage, StorageError};

pub(super) async fn run_version_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "version",
            "update_returns_incremented_version",
            update_returns_incremented_version(factory).await,
        ),
        TestResult::from_result(
            "version",
            "sequential_updates_increment_version",
            sequential_updates_increment_version(factory).await,
        ),
        TestResult::from_result(
            "version",
            "stale_version_conflicts",
            stale_version_conflicts(factory).await,
        ),
        TestResult::from_result(
            "version",
            "racing_transactions_second_loses",
            racing_transactions_second_loses(factory).await,
        ),
    ]
}

/// update_logistic returns expected_version + 1.
async fn update_returns_incremented_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (_, logistic) = seed_assignment(&s).await?;

    let mut tx = s.begin().await.map_err(|e| e.to_string())?;
    let new_version = s
        .update_logistic(&mut tx, &logistic, 0)
        .await
        .map_err(|e| e.to_string())?;
    s.commit(tx).await.map_err(|e| e.to_string())?;

    if new_version != 1 {
        return Err(format!("expected version 1, got {new_version}"));
    }
    Ok(())
}

/// Three committed updates walk the version 0 -> 1 -> 2 -> 3.
async fn sequential_updates_increment_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (_, logistic) = seed_assignment(&s).await?;

    for expected in 0..3 {
        let current = s
            .get_logistic(logistic.id)
            .await
            .map_err(|e| e.to_string())?
            .logistic;
        let mut tx = s.begin().await.map_err(|e| e.to_string())?;
        let new_version = s
            .update_logistic(&mut tx, &current, expected)
            .await
            .map_err(|e| e.to_string())?;
        s.commit(tx).await.map_err(|e| e.to_string())?;
        if new_version != expected + 1 {
            return Err(format!(
                "update {expected}: expected version {}, got {new_version}",
                expected + 1
            ));
        }
    }

    let final_version = s
        .get_logistic(logistic.id)
        .await
        .map_err(|e| e.to_string())?
        .logistic
        .version;
    if final_version != 3 {
        return Err(format!("expected final version 3, got {final_version}"));
    }
    Ok(())
}

/// An update carrying a stale expected version fails with
/// `ConcurrentConflict` and does not commit.
async fn stale_version_conflicts<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (_, logistic) = seed_assignment(&s).await?;

    // Move the record to version 1.
    let mut tx = s.begin().await.map_err(|e| e.to_string())?;
    s.update_logistic(&mut tx, &logistic, 0)
        .await
        .map_err(|e| e.to_string())?;
    s.commit(tx).await.map_err(|e| e.to_string())?;

    // Try again with the stale expectation.
    let mut tx2 = s.begin().await.map_err(|e| e.to_string())?;
    let mut stale = logistic.clone();
    stale.note = "stale".to_string();
    match s.update_logistic(&mut tx2, &stale, 0).await {
        Err(StorageError::ConcurrentConflict {
            expected_version, ..
        }) if expected_version == 0 => {}
        Err(other) => return Err(format!("expected ConcurrentConflict, got {other}")),
        Ok(v) => return Err(format!("stale update accepted, returned version {v}")),
    }
    s.rollback(tx2).await.map_err(|e| e.to_string())?;

    let read = s
        .get_logistic(logistic.id)
        .await
        .map_err(|e| e.to_string())?;
    if read.logistic.note == "stale" {
        return Err("stale update leaked into committed state".to_string());
    }
    Ok(())
}

/// Two transactions read the same version; the one committing second gets a
/// conflict instead of silently overwriting the first.
async fn racing_transactions_second_loses<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (_, logistic) = seed_assignment(&s).await?;

    let mut tx_a = s.begin().await.map_err(|e| e.to_string())?;
    let mut tx_b = s.begin().await.map_err(|e| e.to_string())?;

    let mut from_a = logistic.clone();
    from_a.note = "from a".to_string();
    let mut from_b = logistic.clone();
    from_b.note = "from b".to_string();

    s.update_logistic(&mut tx_a, &from_a, 0)
        .await
        .map_err(|e| e.to_string())?;
    s.update_logistic(&mut tx_b, &from_b, 0)
        .await
        .map_err(|e| e.to_string())?;

    s.commit(tx_a).await.map_err(|e| e.to_string())?;
    match s.commit(tx_b).await {
        Err(StorageError::ConcurrentConflict { .. }) => {}
        Err(other) => return Err(format!("expected ConcurrentConflict, got {other}")),
        Ok(()) => return Err("second writer silently won".to_string()),
    }

    let read = s
        .get_logistic(logistic.id)
        .await
        .map_err(|e| e.to_string())?;
    if read.logistic.note != "from a" {
        return Err(format!(
            "expected first writer's note, got {:?}",
            read.logistic.note
        ));
    }
    Ok(())
}
