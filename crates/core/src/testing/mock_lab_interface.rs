//! Mock lab interface for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::lab_interface::{LabInterface, LabInterfaceError, PendingConfirmations};

const DEFAULT_PAYLOAD: &str = "Received Time:20240101000000\nMSH|^~\\&|MOCK|LAB|||20240101000000||ORU^R01|1|P|2.3";

/// Mock implementation of the LabInterface trait.
///
/// Behaves like a received-orders queue by default: `list_pending` returns
/// the head of the queue and a successful `acknowledge` removes the id.
/// Listings can also be scripted page by page.
///
/// # Example
///
/// ```rust,ignore
/// let lab = MockLabInterface::new();
/// lab.enqueue(["g-1", "g-2"]).await;
/// lab.set_detail("g-1", fixtures::payload("12345", "20240115103000")).await;
/// lab.fail_ack("g-2", 2).await; // two failures, then success
///
/// sync.run().await?;
/// assert!(lab.pending().await.is_empty());
/// ```
#[derive(Debug)]
pub struct MockLabInterface {
    /// Ids still waiting upstream.
    queue: Arc<RwLock<Vec<String>>>,
    /// Max ids per listing page (None = whole queue).
    page_size: Arc<RwLock<Option<usize>>>,
    /// Scripted listings, returned before falling back to the queue.
    scripted_pages: Arc<RwLock<VecDeque<PendingConfirmations>>>,
    /// Detail payloads by id.
    details: Arc<RwLock<HashMap<String, String>>>,
    /// Remaining failures per operation.
    list_failures: Arc<RwLock<u32>>,
    detail_failures: Arc<RwLock<HashMap<String, u32>>>,
    ack_failures: Arc<RwLock<HashMap<String, u32>>>,
    /// Recorded calls.
    list_calls: Arc<RwLock<u32>>,
    detail_calls: Arc<RwLock<Vec<String>>>,
    ack_calls: Arc<RwLock<Vec<String>>>,
    acknowledged: Arc<RwLock<Vec<String>>>,
    /// Artificial latency for detail/ack calls.
    call_delay: Arc<RwLock<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockLabInterface {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLabInterface {
    /// Create a new mock with an empty queue.
    pub fn new() -> Self {
        Self {
            queue: Arc::new(RwLock::new(Vec::new())),
            page_size: Arc::new(RwLock::new(None)),
            scripted_pages: Arc::new(RwLock::new(VecDeque::new())),
            details: Arc::new(RwLock::new(HashMap::new())),
            list_failures: Arc::new(RwLock::new(0)),
            detail_failures: Arc::new(RwLock::new(HashMap::new())),
            ack_failures: Arc::new(RwLock::new(HashMap::new())),
            list_calls: Arc::new(RwLock::new(0)),
            detail_calls: Arc::new(RwLock::new(Vec::new())),
            ack_calls: Arc::new(RwLock::new(Vec::new())),
            acknowledged: Arc::new(RwLock::new(Vec::new())),
            call_delay: Arc::new(RwLock::new(Duration::ZERO)),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Append ids to the pending queue.
    pub async fn enqueue<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queue
            .write()
            .await
            .extend(ids.into_iter().map(Into::into));
    }

    /// Ids still pending upstream.
    pub async fn pending(&self) -> Vec<String> {
        self.queue.read().await.clone()
    }

    /// Limit how many ids one listing returns.
    pub async fn set_page_size(&self, size: usize) {
        *self.page_size.write().await = Some(size);
    }

    /// Queue a literal listing response.
    pub async fn push_page(&self, page: PendingConfirmations) {
        self.scripted_pages.write().await.push_back(page);
    }

    /// Set the raw detail payload for an id.
    pub async fn set_detail(&self, correlation_id: &str, payload: impl Into<String>) {
        self.details
            .write()
            .await
            .insert(correlation_id.to_string(), payload.into());
    }

    /// Fail the next `times` list calls.
    pub async fn fail_list(&self, times: u32) {
        *self.list_failures.write().await = times;
    }

    /// Fail the next `times` detail fetches for an id.
    pub async fn fail_detail(&self, correlation_id: &str, times: u32) {
        self.detail_failures
            .write()
            .await
            .insert(correlation_id.to_string(), times);
    }

    /// Fail the next `times` acknowledgements for an id.
    pub async fn fail_ack(&self, correlation_id: &str, times: u32) {
        self.ack_failures
            .write()
            .await
            .insert(correlation_id.to_string(), times);
    }

    /// Delay every detail and ack call.
    pub async fn set_call_delay(&self, delay: Duration) {
        *self.call_delay.write().await = delay;
    }

    pub async fn list_calls(&self) -> u32 {
        *self.list_calls.read().await
    }

    /// Number of detail fetches made for an id.
    pub async fn detail_calls(&self, correlation_id: &str) -> usize {
        self.detail_calls
            .read()
            .await
            .iter()
            .filter(|id| *id == correlation_id)
            .count()
    }

    /// Number of acknowledge calls made for an id, failed ones included.
    pub async fn ack_calls(&self, correlation_id: &str) -> usize {
        self.ack_calls
            .read()
            .await
            .iter()
            .filter(|id| *id == correlation_id)
            .count()
    }

    /// Ids acknowledged successfully, in order.
    pub async fn acknowledged(&self) -> Vec<String> {
        self.acknowledged.read().await.clone()
    }

    /// Highest number of detail/ack calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn unavailable(operation: &str) -> LabInterfaceError {
        LabInterfaceError::Http {
            status: 503,
            body: format!("mock {} unavailable", operation),
        }
    }

    /// Consume one scripted failure for an id, if any remain.
    async fn take_failure(failures: &RwLock<HashMap<String, u32>>, correlation_id: &str) -> bool {
        let mut failures = failures.write().await;
        match failures.get_mut(correlation_id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    async fn enter_call(&self) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = *self.call_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn exit_call(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LabInterface for MockLabInterface {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_pending(&self) -> Result<PendingConfirmations, LabInterfaceError> {
        *self.list_calls.write().await += 1;

        {
            let mut failures = self.list_failures.write().await;
            if *failures > 0 {
                *failures -= 1;
                return Err(Self::unavailable("list"));
            }
        }

        if let Some(page) = self.scripted_pages.write().await.pop_front() {
            return Ok(page);
        }

        let queue = self.queue.read().await;
        let take = self.page_size.read().await.unwrap_or(queue.len());
        let ids: Vec<String> = queue.iter().take(take).cloned().collect();

        Ok(PendingConfirmations {
            total_count: queue.len() as u64,
            returned_count: ids.len() as u64,
            ids,
        })
    }

    async fn fetch_detail(&self, correlation_id: &str) -> Result<String, LabInterfaceError> {
        self.detail_calls
            .write()
            .await
            .push(correlation_id.to_string());

        self.enter_call().await;
        let result = if Self::take_failure(&self.detail_failures, correlation_id).await {
            Err(Self::unavailable("detail"))
        } else {
            Ok(self
                .details
                .read()
                .await
                .get(correlation_id)
                .cloned()
                .unwrap_or_else(|| DEFAULT_PAYLOAD.to_string()))
        };
        self.exit_call();

        result
    }

    async fn acknowledge(&self, correlation_id: &str) -> Result<(), LabInterfaceError> {
        self.ack_calls.write().await.push(correlation_id.to_string());

        self.enter_call().await;
        let failed = Self::take_failure(&self.ack_failures, correlation_id).await;
        self.exit_call();

        if failed {
            return Err(Self::unavailable("ack"));
        }

        self.queue.write().await.retain(|id| id != correlation_id);
        self.acknowledged
            .write()
            .await
            .push(correlation_id.to_string());
        Ok(())
    }
}
