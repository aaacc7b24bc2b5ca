//! Confirmation storage trait and types.

use thiserror::Error;

use super::{ConfirmationRecord, ConfirmationUpsert, LabOrder, SyncStatus};

/// Error type for confirmation store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Filter for querying confirmations.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationFilter {
    /// Filter by sync status.
    pub status: Option<SyncStatus>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl ConfirmationFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            status: None,
            limit: 100,
            offset: 0,
        }
    }

    /// Filter by sync status.
    pub fn with_status(mut self, status: SyncStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for confirmation storage backends.
///
/// All writes go through [`ConfirmationStore::upsert`], keyed on the
/// correlation id; there is no plain insert.
pub trait ConfirmationStore: Send + Sync {
    /// Get a confirmation by correlation id.
    fn get(&self, correlation_id: &str) -> Result<Option<ConfirmationRecord>, StoreError>;

    /// Insert or update a confirmation and return the stored row.
    fn upsert(&self, upsert: ConfirmationUpsert) -> Result<ConfirmationRecord, StoreError>;

    /// Look up a local lab order by accession number.
    fn find_order_by_accession(&self, accession_number: &str)
        -> Result<Option<LabOrder>, StoreError>;

    /// List confirmations matching the filter, most recently updated first.
    fn list(&self, filter: &ConfirmationFilter) -> Result<Vec<ConfirmationRecord>, StoreError>;

    /// Count confirmations matching the filter.
    fn count(&self, filter: &ConfirmationFilter) -> Result<i64, StoreError>;
}
