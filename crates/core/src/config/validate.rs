use super::{types::Config, ConfigError};

/// Upper bound for `sync.retry_delay_ms` (five minutes)
pub const MAX_RETRY_DELAY_MS: u64 = 300_000;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Upstream URL is http(s) and credentials are present
/// - Sync limits are at least 1
/// - Retry delay is at most [`MAX_RETRY_DELAY_MS`]
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let url = config.upstream.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "upstream.url must start with http:// or https:// (got '{}')",
            url
        )));
    }

    if config.upstream.username.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "upstream.username cannot be empty".to_string(),
        ));
    }

    if config.upstream.password.is_empty() {
        return Err(ConfigError::ValidationError(
            "upstream.password cannot be empty".to_string(),
        ));
    }

    if config.sync.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "sync.concurrency must be at least 1".to_string(),
        ));
    }

    if config.sync.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "sync.max_attempts must be at least 1".to_string(),
        ));
    }

    if config.sync.max_batches == 0 {
        return Err(ConfigError::ValidationError(
            "sync.max_batches must be at least 1".to_string(),
        ));
    }

    if config.sync.retry_delay_ms > MAX_RETRY_DELAY_MS {
        return Err(ConfigError::ValidationError(format!(
            "sync.retry_delay_ms must be at most {} (got {})",
            MAX_RETRY_DELAY_MS, config.sync.retry_delay_ms
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, ServerConfig, SyncConfig, UpstreamConfig};

    fn valid_config() -> Config {
        Config {
            upstream: UpstreamConfig {
                url: "https://lab.example.com".to_string(),
                username: "svc".to_string(),
                password: "secret".to_string(),
                timeout_secs: 30,
            },
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            sync: SyncConfig::default(),
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = valid_config();
        config.server.port = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_bad_scheme_fails() {
        let mut config = valid_config();
        config.upstream.url = "ftp://lab.example.com".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("upstream.url"));
    }

    #[test]
    fn test_validate_missing_credentials_fails() {
        let mut config = valid_config();
        config.upstream.password = String::new();
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.upstream.username = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_limits_fail() {
        let mut config = valid_config();
        config.sync.concurrency = 0;
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.sync.max_attempts = 0;
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.sync.max_batches = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_retry_delay_upper_bound() {
        let mut config = valid_config();
        config.sync.retry_delay_ms = MAX_RETRY_DELAY_MS;
        assert!(validate_config(&config).is_ok());

        config.sync.retry_delay_ms = u64::MAX;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("sync.retry_delay_ms"));
    }
}
