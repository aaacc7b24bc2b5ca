//! Confirmation records: local sync state for upstream lab confirmations.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteConfirmationStore;
pub use store::{ConfirmationFilter, ConfirmationStore, StoreError};
pub use types::{ConfirmationRecord, ConfirmationUpsert, LabOrder, Linkage, SyncStatus};
