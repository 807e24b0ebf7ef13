//! Fleetline transition engine.
//!
//! Orchestrates every change to a driver's dispatch record as one atomic
//! storage transaction that also appends the audit trail: status updates,
//! cargo attach/detach/amend, trip termination, and cancellation/dispute
//! handling. Read paths (board listing, occupancy overview) project their
//! derived fields from a single `now` snapshot and persist nothing.

mod emoji;
mod engine;
mod error;
mod listing;
mod request;

pub use emoji::{status_emoji, EmojiRefresher};
pub use engine::TransitionEngine;
pub use error::{EngineError, ErrorKind};
pub use listing::{CompanyListing, ListingPage, LogisticView};
pub use request::{
    CargoChange, CargoPayload, DisputePayload, LogisticUpdate, NewDriver, NewLogistic,
};
