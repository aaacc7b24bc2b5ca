//! Types for lab interface operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the lab interface.
#[derive(Debug, Error)]
pub enum LabInterfaceError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid correlation id: {0:?}")]
    InvalidCorrelationId(String),

    #[error("Client configuration error: {0}")]
    Configuration(String),
}

impl LabInterfaceError {
    /// Whether retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            LabInterfaceError::InvalidCorrelationId(_) | LabInterfaceError::Configuration(_)
        )
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LabInterfaceError::Timeout
        } else if e.is_connect() {
            LabInterfaceError::ConnectionFailed(e.to_string())
        } else {
            LabInterfaceError::InvalidResponse(e.to_string())
        }
    }
}

/// One page of the upstream pending queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConfirmations {
    /// Total confirmations the upstream reports as outstanding.
    pub total_count: u64,
    /// Number of ids returned in this page.
    pub returned_count: u64,
    /// Correlation ids (GUIDs) in upstream order.
    pub ids: Vec<String>,
}

impl PendingConfirmations {
    /// Build a page where the counts match the returned ids.
    pub fn complete(ids: Vec<String>) -> Self {
        let count = ids.len() as u64;
        Self {
            total_count: count,
            returned_count: count,
            ids,
        }
    }

    /// Whether the upstream has nothing beyond this page.
    pub fn is_drained(&self) -> bool {
        self.returned_count >= self.total_count
    }
}

/// Trait for lab interface backends.
#[async_trait]
pub trait LabInterface: Send + Sync {
    /// Get the backend name (for logging).
    fn name(&self) -> &str;

    /// List the correlation ids currently waiting in the received queue.
    async fn list_pending(&self) -> Result<PendingConfirmations, LabInterfaceError>;

    /// Fetch the raw confirmation payload for one correlation id.
    async fn fetch_detail(&self, correlation_id: &str) -> Result<String, LabInterfaceError>;

    /// Mark a confirmation as consumed so it leaves the pending queue.
    async fn acknowledge(&self, correlation_id: &str) -> Result<(), LabInterfaceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LabInterfaceError::Timeout.is_retryable());
        assert!(LabInterfaceError::ConnectionFailed("refused".into()).is_retryable());
        assert!(LabInterfaceError::Http {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!LabInterfaceError::InvalidCorrelationId(String::new()).is_retryable());
        assert!(!LabInterfaceError::Configuration("tls".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = LabInterfaceError::Http {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");
    }

    #[test]
    fn test_pending_drained() {
        let page = PendingConfirmations {
            total_count: 120,
            returned_count: 50,
            ids: vec![],
        };
        assert!(!page.is_drained());
        assert!(PendingConfirmations::complete(vec!["a".into(), "b".into()]).is_drained());
        assert!(PendingConfirmations::default().is_drained());
    }
}
