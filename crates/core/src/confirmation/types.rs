//! Confirmation record types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sync lifecycle of a confirmation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Detail fetched and stored, not yet acknowledged upstream.
    Retrieved,
    /// Acknowledged upstream; terminal success.
    Acknowledged,
    /// Attempts exhausted; `sync_error` holds the last failure.
    Error,
}

impl SyncStatus {
    /// Returns the string representation used in storage and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Retrieved => "retrieved",
            SyncStatus::Acknowledged => "acknowledged",
            SyncStatus::Error => "error",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retrieved" => Ok(SyncStatus::Retrieved),
            "acknowledged" => Ok(SyncStatus::Acknowledged),
            "error" => Ok(SyncStatus::Error),
            other => Err(format!("unknown sync status: {}", other)),
        }
    }
}

/// A persisted confirmation, one row per correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRecord {
    /// Upstream correlation id (GUID). Unique and immutable.
    pub correlation_id: String,
    /// Matched local lab order.
    pub lab_order_id: Option<String>,
    pub organization_id: Option<String>,
    pub facility_id: Option<String>,
    /// Accession number extracted from the payload.
    pub accession_number: Option<String>,
    /// Received time extracted from the payload (upstream digit timestamp).
    pub received_time: Option<String>,
    /// Embedded protocol message (`MSH|...`), kept as-is.
    pub message: Option<String>,
    /// Full raw detail response.
    pub raw_payload: Option<String>,
    pub sync_status: SyncStatus,
    pub sync_error: Option<String>,
    pub retrieved_at: Option<DateTime<Utc>>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A local lab order, looked up by accession number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabOrder {
    pub id: String,
    pub accession_number: String,
    pub organization_id: Option<String>,
    pub facility_id: Option<String>,
}

/// Order linkage carried on a confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Linkage {
    pub lab_order_id: Option<String>,
    pub organization_id: Option<String>,
    pub facility_id: Option<String>,
}

impl Linkage {
    /// Fill fields missing from `existing` with values from `order`.
    pub fn resolve(existing: Option<&ConfirmationRecord>, order: Option<&LabOrder>) -> Self {
        let current = existing.map(|r| Linkage {
            lab_order_id: r.lab_order_id.clone(),
            organization_id: r.organization_id.clone(),
            facility_id: r.facility_id.clone(),
        });
        let current = current.unwrap_or_default();

        match order {
            Some(order) => Linkage {
                lab_order_id: current.lab_order_id.or_else(|| Some(order.id.clone())),
                organization_id: current.organization_id.or_else(|| order.organization_id.clone()),
                facility_id: current.facility_id.or_else(|| order.facility_id.clone()),
            },
            None => current,
        }
    }
}

/// A write to a confirmation record, keyed on `correlation_id`.
///
/// Optional fields left as `None` keep whatever is stored. `sync_status`
/// and `sync_error` are always written.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationUpsert {
    pub correlation_id: String,
    pub sync_status: SyncStatus,
    pub sync_error: Option<String>,
    pub linkage: Linkage,
    pub accession_number: Option<String>,
    pub received_time: Option<String>,
    pub message: Option<String>,
    pub raw_payload: Option<String>,
    pub retrieved_at: Option<DateTime<Utc>>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl ConfirmationUpsert {
    fn base(correlation_id: impl Into<String>, sync_status: SyncStatus) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            sync_status,
            sync_error: None,
            linkage: Linkage::default(),
            accession_number: None,
            received_time: None,
            message: None,
            raw_payload: None,
            retrieved_at: None,
            acknowledged_at: None,
        }
    }

    /// Detail fetched and parsed.
    pub fn retrieved(correlation_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            retrieved_at: Some(at),
            ..Self::base(correlation_id, SyncStatus::Retrieved)
        }
    }

    /// Acknowledged upstream.
    pub fn acknowledged(correlation_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            acknowledged_at: Some(at),
            ..Self::base(correlation_id, SyncStatus::Acknowledged)
        }
    }

    /// All attempts failed.
    pub fn error(correlation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sync_error: Some(message.into()),
            ..Self::base(correlation_id, SyncStatus::Error)
        }
    }

    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    pub fn with_accession_number(mut self, accession_number: Option<String>) -> Self {
        self.accession_number = accession_number;
        self
    }

    pub fn with_received_time(mut self, received_time: Option<String>) -> Self {
        self.received_time = received_time;
        self
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    pub fn with_raw_payload(mut self, raw_payload: impl Into<String>) -> Self {
        self.raw_payload = Some(raw_payload.into());
        self
    }

    /// Check the status invariants before writing.
    pub fn validate(&self) -> Result<(), String> {
        if self.correlation_id.trim().is_empty() {
            return Err("correlation_id cannot be empty".to_string());
        }
        match self.sync_status {
            SyncStatus::Acknowledged if self.acknowledged_at.is_none() => {
                Err("acknowledged record requires acknowledged_at".to_string())
            }
            SyncStatus::Error if self.sync_error.is_none() => {
                Err("error record requires sync_error".to_string())
            }
            _ => Ok(()),
        }
    }
}
