use uuid::Uuid;

/// All errors that can be returned by a DispatchStorage implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Optimistic concurrency conflict — another transaction moved the
    /// dispatch record past the expected version.
    #[error("concurrent conflict on logistic {id}: expected version {expected_version}")]
    ConcurrentConflict { id: Uuid, expected_version: i64 },

    /// No dispatch record with the given id.
    #[error("logistic not found: {id}")]
    LogisticNotFound { id: Uuid },

    /// No cargo row with the given id.
    #[error("cargo not found: {id}")]
    CargoNotFound { id: Uuid },

    /// No driver row with the given id.
    #[error("driver not found: {id}")]
    DriverNotFound { id: Uuid },

    /// The driver already owns a live dispatch record (1:1 constraint).
    #[error("driver {driver_id} already has a dispatch record")]
    DriverAlreadyAssigned { driver_id: Uuid },

    /// A backend-specific storage error (connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
