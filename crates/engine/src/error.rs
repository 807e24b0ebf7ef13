use time::OffsetDateTime;
use uuid::Uuid;

use fleetline_core::DispatchStatus;
use fleetline_storage::StorageError;

/// Coarse error class for the collaborator layer to map onto wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Conflict,
    Persistence,
}

/// All errors a transition-engine operation can return.
///
/// Any error aborts the whole operation: the underlying transaction is
/// rolled back and every record is left exactly as it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The dispatch record does not exist.
    #[error("logistic not found: {id}")]
    NotFound { id: Uuid },

    /// A referenced cargo row does not exist.
    #[error("cargo not found: {id}")]
    CargoNotFound { id: Uuid },

    /// The operation needs an attached load and the record has none
    /// (cancel/terminate against an idle assignment).
    #[error("no cargo attached to logistic {id}")]
    NoCargoAttached { id: Uuid },

    /// Amending an existing load without saying which one.
    #[error("cargo id required to amend an existing load")]
    CargoIdRequired,

    /// Pickup scheduled after delivery.
    #[error("pickup time {pickup} is after delivery time {delivery}")]
    PickupAfterDelivery {
        pickup: OffsetDateTime,
        delivery: OffsetDateTime,
    },

    /// An assigned-load status with no cargo attached.
    #[error("status {status} requires an attached cargo")]
    CargoRequired { status: DispatchStatus },

    /// An idle status with a cargo still attached.
    #[error("status {status} cannot keep a cargo attached")]
    CargoForbidden { status: DispatchStatus },

    /// The transition guard rejected the requested status change.
    #[error("transition {from} -> {to} is not allowed")]
    TransitionNotAllowed {
        from: DispatchStatus,
        to: DispatchStatus,
    },

    /// Another transition committed first; the caller must re-read and
    /// resubmit.
    #[error("concurrent modification of logistic {id}")]
    Conflict { id: Uuid },

    /// The persistence gateway rejected a read or write.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// The taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound { .. } | EngineError::CargoNotFound { .. } => ErrorKind::NotFound,
            EngineError::NoCargoAttached { .. }
            | EngineError::CargoIdRequired
            | EngineError::PickupAfterDelivery { .. }
            | EngineError::CargoRequired { .. }
            | EngineError::CargoForbidden { .. }
            | EngineError::TransitionNotAllowed { .. } => ErrorKind::InvalidState,
            EngineError::Conflict { .. } => ErrorKind::Conflict,
            EngineError::Storage(_) => ErrorKind::Persistence,
        }
    }
}
