use std::future::Future;

use uuid::Uuid;

use super::{make_cargo, seed_assignment, TestResult};
use crate::{DispatchStorage, StorageError};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "error",
            "get_missing_logistic",
            get_missing_logistic(factory).await,
        ),
        TestResult::from_result(
            "error",
            "update_missing_logistic",
            update_missing_logistic(factory).await,
        ),
        TestResult::from_result(
            "error",
            "get_missing_cargo",
            get_missing_cargo(factory).await,
        ),
        TestResult::from_result(
            "error",
            "update_missing_cargo",
            update_missing_cargo(factory).await,
        ),
        TestResult::from_result(
            "error",
            "get_missing_driver",
            get_missing_driver(factory).await,
        ),
        TestResult::from_result(
            "error",
            "delete_missing_logistic",
            delete_missing_logistic(factory).await,
        ),
    ]
}

async fn get_missing_logistic<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = Uuid::new_v4();
    match s.get_logistic(id).await {
        Err(StorageError::LogisticNotFound { id: got }) if got == id => Ok(()),
        Err(other) => Err(format!("expected LogisticNotFound, got {other}")),
        Ok(_) => Err("get of missing logistic succeeded".to_string()),
    }
}

async fn update_missing_logistic<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (_, mut logistic) = seed_assignment(&s).await?;
    logistic.id = Uuid::new_v4();

    let mut tx = s.begin().await.map_err(|e| e.to_string())?;
    let result = s.update_logistic(&mut tx, &logistic, 0).await;
    s.rollback(tx).await.map_err(|e| e.to_string())?;
    match result {
        Err(StorageError::LogisticNotFound { .. }) => Ok(()),
        Err(other) => Err(format!("expected LogisticNotFound, got {other}")),
        Ok(_) => Err("update of missing logistic succeeded".to_string()),
    }
}

async fn get_missing_cargo<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = Uuid::new_v4();
    let mut tx = s.begin().await.map_err(|e| e.to_string())?;
    let result = s.get_cargo(&mut tx, id).await;
    s.rollback(tx).await.map_err(|e| e.to_string())?;
    match result {
        Err(StorageError::CargoNotFound { id: got }) if got == id => Ok(()),
        Err(other) => Err(format!("expected CargoNotFound, got {other}")),
        Ok(_) => Err("get of missing cargo succeeded".to_string()),
    }
}

async fn update_missing_cargo<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let cargo = make_cargo(Uuid::new_v4());
    let mut tx = s.begin().await.map_err(|e| e.to_string())?;
    let result = s.update_cargo(&mut tx, &cargo).await;
    s.rollback(tx).await.map_err(|e| e.to_string())?;
    match result {
        Err(StorageError::CargoNotFound { .. }) => Ok(()),
        Err(other) => Err(format!("expected CargoNotFound, got {other}")),
        Ok(()) => Err("update of missing cargo succeeded".to_string()),
    }
}

async fn get_missing_driver<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = Uuid::new_v4();
    match s.get_driver(id).await {
        Err(StorageError::DriverNotFound { id: got }) if got == id => Ok(()),
        Err(other) => Err(format!("expected DriverNotFound, got {other}")),
        Ok(_) => Err("get of missing driver succeeded".to_string()),
    }
}

async fn delete_missing_logistic<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DispatchStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.delete_logistic(Uuid::new_v4()).await {
        Err(StorageError::LogisticNotFound { .. }) => Ok(()),
        Err(other) => Err(format!("expected LogisticNotFound, got {other}")),
        Ok(()) => Err("delete of missing logistic succeeded".to_string()),
    }
}
