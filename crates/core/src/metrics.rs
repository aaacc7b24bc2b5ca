//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Sync runs (outcome, duration, batches)
//! - Per-item processing (outcomes, retries)
//! - Upstream lab interface calls

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Sync Run Metrics
// =============================================================================

/// Sync runs total by result.
pub static SYNC_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("labsync_sync_runs_total", "Total sync runs"),
        &["result"], // "queue_empty", "drained", "batch_limit", "failed"
    )
    .unwrap()
});

/// Sync run duration in seconds.
pub static SYNC_RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("labsync_sync_run_duration_seconds", "Duration of sync runs")
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["result"],
    )
    .unwrap()
});

/// Listing batches per run.
pub static SYNC_BATCHES: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("labsync_sync_batches", "Number of list calls per sync run")
            .buckets(vec![1.0, 2.0, 3.0, 5.0, 10.0, 20.0, 50.0]),
    )
    .unwrap()
});

// =============================================================================
// Item Metrics
// =============================================================================

/// Items processed total by outcome.
pub static ITEMS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "labsync_items_processed_total",
            "Total confirmations processed",
        ),
        &["outcome"], // "success", "re-acknowledged", "error"
    )
    .unwrap()
});

/// Item retry attempts total.
pub static ITEM_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "labsync_item_retries_total",
        "Total retry attempts for confirmations",
    )
    .unwrap()
});

// =============================================================================
// Upstream Metrics
// =============================================================================

/// Upstream request duration.
pub static UPSTREAM_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "labsync_upstream_request_duration_seconds",
            "Duration of lab interface calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"],
    )
    .unwrap()
});

/// Upstream requests total.
pub static UPSTREAM_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "labsync_upstream_requests_total",
            "Total lab interface requests",
        ),
        &["operation", "status"], // operation: "list", "detail", "ack"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Runs
        Box::new(SYNC_RUNS.clone()),
        Box::new(SYNC_RUN_DURATION.clone()),
        Box::new(SYNC_BATCHES.clone()),
        // Items
        Box::new(ITEMS_PROCESSED.clone()),
        Box::new(ITEM_RETRIES.clone()),
        // Upstream
        Box::new(UPSTREAM_REQUEST_DURATION.clone()),
        Box::new(UPSTREAM_REQUESTS.clone()),
    ]
}
