//! Common test utilities for in-process API testing with mocks.
//!
//! This module provides a test fixture that builds the router around a mock
//! lab interface and a file-backed SQLite store, so the HTTP surface can be
//! exercised without a real upstream.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use labsync_core::{
    testing::MockLabInterface, Config, ConfirmationStore, ConfirmationSync, DatabaseConfig,
    ServerConfig, SqliteConfirmationStore, SyncConfig, UpstreamConfig,
};

/// Re-export fixtures for test convenience
pub use labsync_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_sync_trigger() {
///     let fixture = TestFixture::new();
///     fixture.lab.enqueue(["g-1"]).await;
///
///     let response = fixture.post("/api/v1/sync").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock lab interface - script the upstream queue
    pub lab: Arc<MockLabInterface>,
    /// Confirmation store backing the router
    pub store: Arc<SqliteConfirmationStore>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    /// Raw body text (for non-JSON endpoints)
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with immediate sync timing.
    pub fn new() -> Self {
        Self::with_sync_config(SyncConfig::immediate())
    }

    /// Create a test fixture with custom sync tuning.
    pub fn with_sync_config(sync_config: SyncConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let lab = Arc::new(MockLabInterface::new());
        let store = Arc::new(
            SqliteConfirmationStore::new(&db_path).expect("Failed to create confirmation store"),
        );

        let config = Config {
            upstream: UpstreamConfig {
                url: "http://lab.invalid".to_string(),
                username: "svc".to_string(),
                password: "secret".to_string(),
                timeout_secs: 5,
            },
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            sync: sync_config.clone(),
        };

        let sync = Arc::new(ConfirmationSync::new(
            Arc::clone(&lab) as Arc<dyn labsync_core::LabInterface>,
            Arc::clone(&store) as Arc<dyn ConfirmationStore>,
            sync_config,
        ));

        let state = Arc::new(labsync_server::state::AppState::new(
            config,
            Arc::clone(&store) as Arc<dyn ConfirmationStore>,
            sync,
        ));

        let router = labsync_server::api::create_router(state);

        Self {
            router,
            lab,
            store,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    /// Send a POST request without a body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path).await
    }

    /// Send an OPTIONS request (CORS preflight).
    pub async fn options(&self, path: &str) -> TestResponse {
        self.request("OPTIONS", path).await
    }

    /// Send a request to the test server.
    pub async fn request(&self, method: &str, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
