//! Batch orchestration of a sync run.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::confirmation::ConfirmationStore;
use crate::lab_interface::LabInterface;
use crate::metrics::{SYNC_BATCHES, SYNC_RUNS, SYNC_RUN_DURATION};

use super::processor::ItemProcessor;
use super::types::{ItemResult, StopReason, SyncError, SyncReport};

/// Drains the upstream received-orders queue.
///
/// One `run` lists pending ids, processes them in chunks of at most
/// `concurrency`, and repeats until the queue is empty, the upstream reports
/// it is drained, or `max_batches` list calls were made. Runs on the same
/// instance are serialized.
pub struct ConfirmationSync {
    lab: Arc<dyn LabInterface>,
    processor: ItemProcessor,
    config: SyncConfig,
    run_lock: Mutex<()>,
}

impl ConfirmationSync {
    /// Create a new sync over the given lab interface and store.
    pub fn new(
        lab: Arc<dyn LabInterface>,
        store: Arc<dyn ConfirmationStore>,
        config: SyncConfig,
    ) -> Self {
        let processor = ItemProcessor::new(Arc::clone(&lab), store, &config);
        Self {
            lab,
            processor,
            config,
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run one full pass. Only a failing list call aborts the run.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let _guard = self.run_lock.lock().await;
        let start = Instant::now();

        info!(lab = self.lab.name(), "Starting confirmation sync");
        let result = self.run_batches().await;

        let label = match &result {
            Ok(report) => report.stop_reason.as_str(),
            Err(_) => "failed",
        };
        SYNC_RUNS.with_label_values(&[label]).inc();
        SYNC_RUN_DURATION
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(report) => {
                let summary = report.summary();
                SYNC_BATCHES.observe(summary.batches as f64);
                info!(
                    batches = summary.batches,
                    processed = summary.total_processed,
                    successful = summary.successful,
                    errors = summary.errors,
                    stop_reason = label,
                    "Confirmation sync finished"
                );
            }
            Err(e) => warn!("Confirmation sync aborted: {}", e),
        }

        result
    }

    async fn run_batches(&self) -> Result<SyncReport, SyncError> {
        let mut results = Vec::new();
        let mut batches: u32 = 0;

        let stop_reason = loop {
            if batches >= self.config.max_batches {
                warn!(
                    max_batches = self.config.max_batches,
                    "Batch limit reached, stopping with confirmations possibly still queued"
                );
                break StopReason::BatchLimit;
            }

            if batches > 0 {
                sleep_ms(self.config.batch_delay_ms).await;
            }
            batches += 1;

            let pending = self
                .lab
                .list_pending()
                .await
                .map_err(SyncError::ListPending)?;

            info!(
                batch = batches,
                total = pending.total_count,
                returned = pending.returned_count,
                ids = pending.ids.len(),
                "Listed pending confirmations"
            );

            if pending.ids.is_empty() {
                break StopReason::QueueEmpty;
            }

            results.extend(self.process_batch(&pending.ids).await);

            if pending.is_drained() {
                break StopReason::Drained;
            }
        };

        Ok(SyncReport {
            batches,
            stop_reason,
            results,
        })
    }

    /// Process one listing batch chunk by chunk, keeping id order.
    async fn process_batch(&self, ids: &[String]) -> Vec<ItemResult> {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = ids.iter().filter(|id| seen.insert(id.as_str())).collect();
        if unique.len() < ids.len() {
            debug!(
                duplicates = ids.len() - unique.len(),
                "Skipping duplicate ids in listing"
            );
        }

        let mut results = Vec::with_capacity(unique.len());
        for (index, chunk) in unique.chunks(self.config.concurrency.max(1)).enumerate() {
            if index > 0 {
                sleep_ms(self.config.chunk_delay_ms).await;
            }

            let settled = join_all(chunk.iter().map(|id| self.processor.process(id))).await;
            results.extend(settled);
        }

        results
    }
}

async fn sleep_ms(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
