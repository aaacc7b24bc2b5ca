use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("labsync.db")
}

/// Lab interface API configuration.
///
/// Credentials are expected to come from the environment
/// (`LABSYNC_UPSTREAM__USERNAME`, `LABSYNC_UPSTREAM__PASSWORD`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Base URL (e.g., "https://lab.example.com/api")
    pub url: String,
    /// HTTP Basic Auth username
    pub username: String,
    /// HTTP Basic Auth password
    pub password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// Tuning for a sync run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Maximum confirmations processed at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Total attempts per confirmation (first try included).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base retry delay; attempt N waits `retry_delay_ms * N`.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Pause between chunks of a listing batch (milliseconds).
    #[serde(default = "default_chunk_delay")]
    pub chunk_delay_ms: u64,

    /// Pause between successive list calls (milliseconds).
    #[serde(default = "default_batch_delay")]
    pub batch_delay_ms: u64,

    /// Upper bound on list calls per run.
    #[serde(default = "default_max_batches")]
    pub max_batches: u32,
}

fn default_concurrency() -> usize {
    3
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1000 // 1 second
}

fn default_chunk_delay() -> u64 {
    500
}

fn default_batch_delay() -> u64 {
    1000
}

fn default_max_batches() -> u32 {
    10
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay(),
            chunk_delay_ms: default_chunk_delay(),
            batch_delay_ms: default_batch_delay(),
            max_batches: default_max_batches(),
        }
    }
}

impl SyncConfig {
    /// Config with every delay zeroed, for tests.
    pub fn immediate() -> Self {
        Self {
            retry_delay_ms: 0,
            chunk_delay_ms: 0,
            batch_delay_ms: 0,
            ..Self::default()
        }
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub upstream: SanitizedUpstreamConfig,
    pub sync: SyncConfig,
}

/// Sanitized upstream config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedUpstreamConfig {
    pub url: String,
    pub username: String,
    pub password_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            upstream: SanitizedUpstreamConfig {
                url: config.upstream.url.clone(),
                username: config.upstream.username.clone(),
                password_configured: !config.upstream.password.is_empty(),
                timeout_secs: config.upstream.timeout_secs,
            },
            sync: config.sync.clone(),
        }
    }
}
