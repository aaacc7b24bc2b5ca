//! Testing utilities and mock implementations.
//!
//! Provides a mock of the lab interface so sync runs can be exercised
//! without a real upstream.
//!
//! # Example
//!
//! ```rust,ignore
//! use labsync_core::testing::{fixtures, MockLabInterface};
//!
//! let lab = MockLabInterface::new();
//! lab.enqueue(fixtures::correlation_ids(5)).await;
//! lab.set_page_size(2).await;
//! ```

mod mock_lab_interface;

pub use mock_lab_interface::MockLabInterface;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::confirmation::LabOrder;

    /// Build a raw detail payload in the upstream text format.
    pub fn payload(accession: &str, received_time: &str) -> String {
        format!(
            "Received Time:{}\nAccession:{}\nMSH|^~\\&|LAB|ACME|||{}||ORU^R01|{}|P|2.3\rPID|1||{}\n",
            received_time, accession, received_time, accession, accession
        )
    }

    /// Create a local lab order with organization and facility set.
    pub fn lab_order(id: &str, accession: &str) -> LabOrder {
        LabOrder {
            id: id.to_string(),
            accession_number: accession.to_string(),
            organization_id: Some(format!("org-{}", id)),
            facility_id: Some(format!("fac-{}", id)),
        }
    }

    /// Generate distinct GUID correlation ids.
    pub fn correlation_ids(count: usize) -> Vec<String> {
        (0..count)
            .map(|_| uuid::Uuid::new_v4().to_string())
            .collect()
    }
}
