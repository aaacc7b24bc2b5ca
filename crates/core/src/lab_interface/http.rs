//! HTTP lab interface implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::metrics::{UPSTREAM_REQUESTS, UPSTREAM_REQUEST_DURATION};

use super::{LabInterface, LabInterfaceError, PendingConfirmations};

/// Raw list response from `GET /order/received`.
/// The `status` field is ignored; HTTP status decides success.
#[derive(Debug, Deserialize)]
struct ReceivedOrdersResponse {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    result_count: u64,
    #[serde(default)]
    results: Vec<String>,
}

/// Lab interface client speaking HTTP with Basic Auth.
pub struct HttpLabInterface {
    client: Client,
    config: UpstreamConfig,
}

impl HttpLabInterface {
    /// Create a new client. Fails only if the underlying HTTP client cannot be built.
    pub fn new(config: UpstreamConfig) -> Result<Self, LabInterfaceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| LabInterfaceError::Configuration(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn list_url(&self) -> String {
        format!("{}/order/received", self.base_url())
    }

    fn detail_url(&self, correlation_id: &str) -> Result<String, LabInterfaceError> {
        let id = validate_id(correlation_id)?;
        Ok(format!(
            "{}/order/received/{}",
            self.base_url(),
            urlencoding::encode(id)
        ))
    }

    fn ack_url(&self, correlation_id: &str) -> Result<String, LabInterfaceError> {
        Ok(format!("{}/ack", self.detail_url(correlation_id)?))
    }

    /// Attach credentials, send, and reject non-2xx responses.
    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, LabInterfaceError> {
        let start = Instant::now();
        let result = self.send_inner(request).await;

        UPSTREAM_REQUEST_DURATION
            .with_label_values(&[operation])
            .observe(start.elapsed().as_secs_f64());
        UPSTREAM_REQUESTS
            .with_label_values(&[operation, if result.is_ok() { "success" } else { "error" }])
            .inc();

        result
    }

    async fn send_inner(&self, request: RequestBuilder) -> Result<Response, LabInterfaceError> {
        let response = request
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(LabInterfaceError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LabInterfaceError::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Ok(response)
    }
}

/// Ids go on the wire exactly as they are keyed in the store, so blank ids
/// and ids with surrounding whitespace are rejected rather than trimmed.
fn validate_id(correlation_id: &str) -> Result<&str, LabInterfaceError> {
    let trimmed = correlation_id.trim();
    if trimmed.is_empty() || trimmed.len() != correlation_id.len() {
        return Err(LabInterfaceError::InvalidCorrelationId(
            correlation_id.to_string(),
        ));
    }
    Ok(correlation_id)
}

#[async_trait]
impl LabInterface for HttpLabInterface {
    fn name(&self) -> &str {
        "lab_interface_http"
    }

    async fn list_pending(&self) -> Result<PendingConfirmations, LabInterfaceError> {
        let url = self.list_url();
        debug!(url = %url, "Listing pending confirmations");

        let response = self.send("list", self.client.get(&url)).await?;
        let body: ReceivedOrdersResponse = response.json().await.map_err(|e| {
            LabInterfaceError::InvalidResponse(format!("Failed to parse list response: {}", e))
        })?;

        debug!(
            total = body.total_count,
            returned = body.result_count,
            ids = body.results.len(),
            "Pending confirmations listed"
        );

        Ok(PendingConfirmations {
            total_count: body.total_count,
            returned_count: body.result_count,
            ids: body.results,
        })
    }

    async fn fetch_detail(&self, correlation_id: &str) -> Result<String, LabInterfaceError> {
        let url = self.detail_url(correlation_id)?;
        debug!(correlation_id = %correlation_id, "Fetching confirmation detail");

        let response = self.send("detail", self.client.get(&url)).await?;
        response
            .text()
            .await
            .map_err(|e| LabInterfaceError::InvalidResponse(e.to_string()))
    }

    async fn acknowledge(&self, correlation_id: &str) -> Result<(), LabInterfaceError> {
        let url = self.ack_url(correlation_id)?;
        debug!(correlation_id = %correlation_id, "Acknowledging confirmation");

        self.send("ack", self.client.post(&url)).await?;
        Ok(())
    }
}
