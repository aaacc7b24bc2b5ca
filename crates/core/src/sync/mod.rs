//! Confirmation sync: drains the upstream received-orders queue into the
//! local confirmation store.
//!
//! - **Processor**: brings one correlation id to a durable terminal state,
//!   with linear-backoff retries
//! - **Runner**: lists pending ids batch by batch and fans them out with a
//!   concurrency cap until the queue is empty, drained, or the batch limit is hit

mod processor;
mod runner;
mod types;

pub use processor::ItemProcessor;
pub use runner::ConfirmationSync;
pub use types::{
    AttemptOutcome, ItemError, ItemResult, ItemStatus, ItemSuccess, StopReason, SyncError,
    SyncReport, SyncSummary,
};
