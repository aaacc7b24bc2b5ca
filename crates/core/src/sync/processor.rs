//! Per-item processing with retries.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::confirmation::{ConfirmationStore, ConfirmationUpsert, Linkage, SyncStatus};
use crate::lab_interface::LabInterface;
use crate::metrics::{ITEMS_PROCESSED, ITEM_RETRIES};
use crate::payload::parse_confirmation;

use super::types::{AttemptOutcome, ItemError, ItemResult, ItemSuccess};

/// Brings one correlation id to `acknowledged` or a recorded `error`.
///
/// Never fails: exhausted retries are persisted and returned as an
/// error [`ItemResult`].
pub struct ItemProcessor {
    lab: Arc<dyn LabInterface>,
    store: Arc<dyn ConfirmationStore>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl ItemProcessor {
    pub fn new(
        lab: Arc<dyn LabInterface>,
        store: Arc<dyn ConfirmationStore>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            lab,
            store,
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Process one correlation id.
    pub async fn process(&self, correlation_id: &str) -> ItemResult {
        let mut attempt = 1;

        loop {
            match AttemptOutcome::from(self.try_sync(correlation_id).await) {
                AttemptOutcome::Completed(success) => {
                    let result = ItemResult::succeeded(correlation_id, success, attempt);
                    ITEMS_PROCESSED
                        .with_label_values(&[result.status.as_str()])
                        .inc();
                    return result;
                }
                AttemptOutcome::Retryable(e) if attempt < self.max_attempts => {
                    let delay = backoff_delay(self.retry_delay, attempt);
                    warn!(
                        correlation_id = %correlation_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Confirmation sync attempt failed, retrying: {}",
                        e
                    );
                    ITEM_RETRIES.inc();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                AttemptOutcome::Retryable(e) | AttemptOutcome::Terminal(e) => {
                    return self.record_failure(correlation_id, e, attempt);
                }
            }
        }
    }

    /// One pass over the acknowledge protocol.
    async fn try_sync(&self, correlation_id: &str) -> Result<ItemSuccess, ItemError> {
        let existing = self
            .store
            .get(correlation_id)
            .map_err(ItemError::StoreRead)?;

        if existing
            .as_ref()
            .is_some_and(|r| r.sync_status == SyncStatus::Acknowledged)
        {
            debug!(correlation_id = %correlation_id, "Already acknowledged, re-acknowledging");
            self.lab.acknowledge(correlation_id).await?;
            return Ok(ItemSuccess::Reacknowledged);
        }

        let raw = self.lab.fetch_detail(correlation_id).await?;
        let parsed = parse_confirmation(&raw);

        let missing = parsed.missing_fields();
        if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(|f| f.to_string()).collect();
            warn!(
                correlation_id = %correlation_id,
                missing = %names.join(","),
                "Confirmation payload incomplete"
            );
        }

        let order = match parsed.accession_number.as_deref() {
            Some(accession) => self
                .store
                .find_order_by_accession(accession)
                .map_err(ItemError::StoreRead)?,
            None => None,
        };
        if order.is_none() && parsed.accession_number.is_some() {
            debug!(
                correlation_id = %correlation_id,
                accession = ?parsed.accession_number,
                "No local lab order for accession"
            );
        }
        let linkage = Linkage::resolve(existing.as_ref(), order.as_ref());

        self.store
            .upsert(
                ConfirmationUpsert::retrieved(correlation_id, Utc::now())
                    .with_linkage(linkage)
                    .with_accession_number(parsed.accession_number.clone())
                    .with_received_time(parsed.received_time)
                    .with_message(parsed.message)
                    .with_raw_payload(raw),
            )
            .map_err(ItemError::StoreWrite)?;

        self.lab.acknowledge(correlation_id).await?;

        self.store
            .upsert(ConfirmationUpsert::acknowledged(correlation_id, Utc::now()))
            .map_err(ItemError::StoreWrite)?;

        info!(
            correlation_id = %correlation_id,
            accession = ?parsed.accession_number,
            "Confirmation synced"
        );

        Ok(ItemSuccess::Synced {
            accession_number: parsed.accession_number,
        })
    }

    fn record_failure(&self, correlation_id: &str, e: ItemError, attempts: u32) -> ItemResult {
        let message = e.to_string();
        error!(
            correlation_id = %correlation_id,
            attempts,
            "Confirmation sync failed: {}",
            message
        );

        if let Err(store_err) = self
            .store
            .upsert(ConfirmationUpsert::error(correlation_id, message.clone()))
        {
            error!(
                correlation_id = %correlation_id,
                "Failed to record sync error: {}",
                store_err
            );
        }

        ITEMS_PROCESSED.with_label_values(&["error"]).inc();
        ItemResult::failed(correlation_id, message, attempts)
    }
}

/// Linear backoff: the wait after failed attempt `n` is `base * n`.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_linear_in_attempt() {
        let base = Duration::from_millis(1000);
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 5), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_saturates_instead_of_overflowing() {
        assert_eq!(backoff_delay(Duration::MAX, 2), Duration::MAX);
        assert_eq!(backoff_delay(Duration::ZERO, u32::MAX), Duration::ZERO);
    }
}
