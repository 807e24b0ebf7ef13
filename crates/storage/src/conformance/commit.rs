use std::future::Future;

use fleetline_core::DispatchStatus;

use super::{
    make_cargo, make_history, make_performance, make_transaction, seed_assignment, TestResult,
};
use crate::DispatchStorage;

pub(super) async fn run_commit_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "commit",
            "multi_record_writes_all_visible_after_commit",
            multi_record_writes_all_visible_after_commit(factory).await,
        ),
        TestResult::from_result(
            "commit",
            "multi_record_writes_none_visible_after_rollback",
            multi_record_writes_none_visible_after_rollback(factory).await,
        ),
        TestResult::from_result(
            "commit",
            "history_rows_accumulate",
            history_rows_accumulate(factory).await,
        ),
        TestResult::from_result(
            "commit",
            "cargo_insert_and_update_in_one_tx",
            cargo_insert_and_update_in_one_tx(factory).await,
        ),
        TestResult::from_result(
            "commit",
            "empty_transaction_commits",
            empty_transaction_commits(factory).await,
        ),
    ]
}

/// The full transition shape — cargo insert + dispatch update + history +
/// transaction + performance in one transaction — is entirely visible after
/// commit.
async fn multi_record_writes_all_visible_after_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (driver, logistic) = seed_assignment(&s).await?;

    let cargo = make_cargo(uuid::Uuid::new_v4());
    let mut updated = logistic.clone();
    updated.status = DispatchStatus::Covered;
    updated.cargo_id = Some(cargo.id);

    let mut tx = s.begin().await.map_err(|e| e.to_string())?;
    s.insert_cargo(&mut tx, cargo.clone())
        .await
        .map_err(|e| e.to_string())?;
    s.update_logistic(&mut tx, &updated, 0)
        .await
        .map_err(|e| e.to_string())?;
    s.insert_history(&mut tx, make_history(&logistic, &updated, uuid::Uuid::new_v4()))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_transaction(&mut tx, make_transaction(driver.id, true))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_performance(&mut tx, make_performance(driver.company_id))
        .await
        .map_err(|e| e.to_string())?;
    s.commit(tx).await.map_err(|e| e.to_string())?;

    let joined = s
        .get_logistic(logistic.id)
        .await
        .map_err(|e| e.to_string())?;
    if joined.logistic.status != DispatchStatus::Covered {
        return Err(format!("expected COVERED, got {}", joined.logistic.status));
    }
    match &joined.cargo {
        Some(got) if got.id == cargo.id => {}
        other => return Err(format!("expected joined cargo, got {other:?}")),
    }

    let histories = s
        .list_histories(Some(logistic.id), 0)
        .await
        .map_err(|e| e.to_string())?;
    if histories.len() != 1 {
        return Err(format!("expected 1 history row, got {}", histories.len()));
    }
    let transactions = s.list_transactions(0).await.map_err(|e| e.to_string())?;
    if transactions.len() != 1 {
        return Err(format!(
            "expected 1 transaction row, got {}",
            transactions.len()
        ));
    }
    let performances = s.list_performances(0).await.map_err(|e| e.to_string())?;
    if performances.len() != 1 {
        return Err(format!(
            "expected 1 performance row, got {}",
            performances.len()
        ));
    }
    Ok(())
}

/// The same multi-record transaction rolled back leaves nothing behind.
async fn multi_record_writes_none_visible_after_rollback<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (driver, logistic) = seed_assignment(&s).await?;

    let cargo = make_cargo(uuid::Uuid::new_v4());
    let mut updated = logistic.clone();
    updated.status = DispatchStatus::Covered;
    updated.cargo_id = Some(cargo.id);

    let mut tx = s.begin().await.map_err(|e| e.to_string())?;
    s.insert_cargo(&mut tx, cargo)
        .await
        .map_err(|e| e.to_string())?;
    s.update_logistic(&mut tx, &updated, 0)
        .await
        .map_err(|e| e.to_string())?;
    s.insert_history(&mut tx, make_history(&logistic, &updated, uuid::Uuid::new_v4()))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_transaction(&mut tx, make_transaction(driver.id, false))
        .await
        .map_err(|e| e.to_string())?;
    s.rollback(tx).await.map_err(|e| e.to_string())?;

    let joined = s
        .get_logistic(logistic.id)
        .await
        .map_err(|e| e.to_string())?;
    if joined.logistic.status != DispatchStatus::Ready {
        return Err(format!(
            "expected READY after rollback, got {}",
            joined.logistic.status
        ));
    }
    if joined.logistic.cargo_id.is_some() {
        return Err("rollback left a cargo attached".to_string());
    }

    let histories = s
        .list_histories(Some(logistic.id), 0)
        .await
        .map_err(|e| e.to_string())?;
    if !histories.is_empty() {
        return Err(format!(
            "expected no history after rollback, got {}",
            histories.len()
        ));
    }
    let transactions = s.list_transactions(0).await.map_err(|e| e.to_string())?;
    if !transactions.is_empty() {
        return Err(format!(
            "expected no transactions after rollback, got {}",
            transactions.len()
        ));
    }
    Ok(())
}

/// Each committed transition appends its own history row.
async fn history_rows_accumulate<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (_, logistic) = seed_assignment(&s).await?;

    let statuses = [
        DispatchStatus::WillBeReady,
        DispatchStatus::AtHome,
        DispatchStatus::Ready,
    ];
    let mut prev = logistic.clone();
    for (i, status) in statuses.into_iter().enumerate() {
        let mut next = prev.clone();
        next.status = status;
        let mut tx = s.begin().await.map_err(|e| e.to_string())?;
        s.update_logistic(&mut tx, &next, i as i64)
            .await
            .map_err(|e| e.to_string())?;
        s.insert_history(&mut tx, make_history(&prev, &next, uuid::Uuid::new_v4()))
            .await
            .map_err(|e| e.to_string())?;
        s.commit(tx).await.map_err(|e| e.to_string())?;
        prev = next;
    }

    let histories = s
        .list_histories(Some(logistic.id), 0)
        .await
        .map_err(|e| e.to_string())?;
    if histories.len() != 3 {
        return Err(format!("expected 3 history rows, got {}", histories.len()));
    }
    Ok(())
}

/// A cargo inserted and then amended inside the same transaction commits
/// with the amended fields.
async fn cargo_insert_and_update_in_one_tx<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (_, logistic) = seed_assignment(&s).await?;

    let cargo = make_cargo(uuid::Uuid::new_v4());
    let mut tx = s.begin().await.map_err(|e| e.to_string())?;
    s.insert_cargo(&mut tx, cargo.clone())
        .await
        .map_err(|e| e.to_string())?;
    let mut amended = cargo.clone();
    amended.provider = "Landstar".to_string();
    s.update_cargo(&mut tx, &amended)
        .await
        .map_err(|e| e.to_string())?;
    let mut updated = logistic.clone();
    updated.status = DispatchStatus::Covered;
    updated.cargo_id = Some(cargo.id);
    s.update_logistic(&mut tx, &updated, 0)
        .await
        .map_err(|e| e.to_string())?;
    s.commit(tx).await.map_err(|e| e.to_string())?;

    let joined = s
        .get_logistic(logistic.id)
        .await
        .map_err(|e| e.to_string())?;
    match joined.cargo {
        Some(got) if got.provider == "Landstar" => Ok(()),
        other => Err(format!("expected amended cargo, got {other:?}")),
    }
}

/// Begin + commit with nothing staged must not error.
async fn empty_transaction_commits<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let tx = s.begin().await.map_err(|e| e.to_string())?;
    s.commit(tx).await.map_err(|e| e.to_string())
}
