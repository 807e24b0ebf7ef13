pub mod conformance;
mod error;
mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use memory::MemoryStorage;
pub use record::{
    CargoRecord, CompanyRecord, DisputeStatus, DriverRecord, FaultParty, HistoryRecord,
    LogisticFilter, LogisticJoined, LogisticListing, LogisticRecord, PerformanceRecord,
    TransactionRecord,
};
pub use traits::DispatchStorage;
