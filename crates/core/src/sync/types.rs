//! Types for confirmation sync.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::confirmation::StoreError;
use crate::lab_interface::LabInterfaceError;

/// Failure of a single processing attempt.
#[derive(Debug, Error)]
pub enum ItemError {
    /// Any lab interface failure.
    #[error("upstream unavailable: {0}")]
    Upstream(#[from] LabInterfaceError),

    #[error("store read failed: {0}")]
    StoreRead(#[source] StoreError),

    #[error("store write failed: {0}")]
    StoreWrite(#[source] StoreError),
}

impl ItemError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ItemError::Upstream(e) => e.is_retryable(),
            ItemError::StoreWrite(StoreError::InvalidRecord(_)) => false,
            ItemError::StoreRead(_) | ItemError::StoreWrite(_) => true,
        }
    }
}

/// Run-level failure that aborts a sync.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to list pending confirmations: {0}")]
    ListPending(#[source] LabInterfaceError),
}

/// What a successful attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSuccess {
    /// Fetched, stored, and acknowledged.
    Synced { accession_number: Option<String> },
    /// Already acknowledged locally; acknowledged upstream again.
    Reacknowledged,
}

/// Result of one processing attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Completed(ItemSuccess),
    Retryable(ItemError),
    Terminal(ItemError),
}

impl From<Result<ItemSuccess, ItemError>> for AttemptOutcome {
    fn from(result: Result<ItemSuccess, ItemError>) -> Self {
        match result {
            Ok(success) => AttemptOutcome::Completed(success),
            Err(e) if e.is_retryable() => AttemptOutcome::Retryable(e),
            Err(e) => AttemptOutcome::Terminal(e),
        }
    }
}

/// Final status of one correlation id within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "re-acknowledged")]
    Reacknowledged,
    #[serde(rename = "error")]
    Error,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Success => "success",
            ItemStatus::Reacknowledged => "re-acknowledged",
            ItemStatus::Error => "error",
        }
    }
}

/// Per-item entry in a sync report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    pub correlation_id: String,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accession_number: Option<String>,
    /// Last failure message (error results only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Attempts used.
    pub attempts: u32,
}

impl ItemResult {
    pub fn succeeded(correlation_id: &str, success: ItemSuccess, attempts: u32) -> Self {
        let (status, accession_number) = match success {
            ItemSuccess::Synced { accession_number } => (ItemStatus::Success, accession_number),
            ItemSuccess::Reacknowledged => (ItemStatus::Reacknowledged, None),
        };
        Self {
            correlation_id: correlation_id.to_string(),
            status,
            accession_number,
            error: None,
            attempts,
        }
    }

    pub fn failed(correlation_id: &str, error: String, attempts: u32) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            status: ItemStatus::Error,
            accession_number: None,
            error: Some(error),
            attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status != ItemStatus::Error
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A list call returned no ids.
    QueueEmpty,
    /// The upstream reported nothing beyond the last page.
    Drained,
    /// The configured batch ceiling was reached.
    BatchLimit,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::QueueEmpty => "queue_empty",
            StopReason::Drained => "drained",
            StopReason::BatchLimit => "batch_limit",
        }
    }
}

/// Totals of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub batches: u32,
    pub total_processed: usize,
    pub successful: usize,
    pub errors: usize,
}

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Number of list calls made.
    pub batches: u32,
    pub stop_reason: StopReason,
    pub results: Vec<ItemResult>,
}

impl SyncReport {
    pub fn summary(&self) -> SyncSummary {
        let successful = self.results.iter().filter(|r| r.is_success()).count();
        SyncSummary {
            batches: self.batches,
            total_processed: self.results.len(),
            successful,
            errors: self.results.len() - successful,
        }
    }

    /// Results that ended in error.
    pub fn failures(&self) -> impl Iterator<Item = &ItemResult> {
        self.results.iter().filter(|r| !r.is_success())
    }
}
