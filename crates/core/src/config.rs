// Runtime configuration (environment driven)

use crate::application::collateral::CollateralPolicy;
use crate::error::{AppError, Result};
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "~/.cascade/meta.db";
pub const DEFAULT_ORCHESTRATOR_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_REGISTRY_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_SCHEDULER_URL: &str = "http://127.0.0.1:8081";
pub const DEFAULT_COLLATERAL_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_RETRY_BATCH: u32 = 50;

/// Cascade configuration
///
/// # Environment Variables
///
/// - `CASCADE_DB_PATH`: metadata database path (tilde-expanded)
/// - `CASCADE_COLLATERAL_POLICY`: `fire-and-log` or `retry-queue`
/// - `CASCADE_COLLATERAL_TIMEOUT_MS`: per-action timeout
/// - `CASCADE_RETRY_MAX_ATTEMPTS`, `CASCADE_RETRY_INTERVAL_SECS`, `CASCADE_RETRY_BATCH`
/// - `CASCADE_ORCHESTRATOR_URL`, `CASCADE_REGISTRY_URL`, `CASCADE_SCHEDULER_URL`
/// - `CASCADE_HTTP_TIMEOUT_MS`
#[derive(Debug, Clone)]
pub struct CascadeConfig {
    pub db_path: String,
    pub collateral_policy: CollateralPolicy,
    pub collateral_timeout: Duration,
    pub retry: RetryConfig,
    pub backends: BackendConfig,
}

/// Collateral ledger retry settings
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub interval: Duration,
    pub batch_size: u32,
}

/// Infrastructure endpoints
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub orchestrator_url: String,
    pub registry_url: String,
    pub scheduler_url: String,
    pub http_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
            batch_size: DEFAULT_RETRY_BATCH,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            orchestrator_url: DEFAULT_ORCHESTRATOR_URL.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            scheduler_url: DEFAULT_SCHEDULER_URL.to_string(),
            http_timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
        }
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            db_path: shellexpand::tilde(DEFAULT_DB_PATH).into_owned(),
            collateral_policy: CollateralPolicy::default(),
            collateral_timeout: Duration::from_millis(DEFAULT_COLLATERAL_TIMEOUT_MS),
            retry: RetryConfig::default(),
            backends: BackendConfig::default(),
        }
    }
}

impl CascadeConfig {
    /// Load configuration from process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup (used by tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("CASCADE_DB_PATH") {
            config.db_path = shellexpand::tilde(&path).into_owned();
        }
        if let Some(policy) = lookup("CASCADE_COLLATERAL_POLICY") {
            config.collateral_policy = policy.parse()?;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "CASCADE_COLLATERAL_TIMEOUT_MS")? {
            if ms == 0 {
                return Err(AppError::Config(
                    "CASCADE_COLLATERAL_TIMEOUT_MS must be at least 1".to_string(),
                ));
            }
            config.collateral_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var::<u32>(&lookup, "CASCADE_RETRY_MAX_ATTEMPTS")? {
            if n == 0 {
                return Err(AppError::Config(
                    "CASCADE_RETRY_MAX_ATTEMPTS must be at least 1".to_string(),
                ));
            }
            config.retry.max_attempts = n;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "CASCADE_RETRY_INTERVAL_SECS")? {
            if secs == 0 {
                return Err(AppError::Config(
                    "CASCADE_RETRY_INTERVAL_SECS must be at least 1".to_string(),
                ));
            }
            config.retry.interval = Duration::from_secs(secs);
        }
        if let Some(n) = parse_var::<u32>(&lookup, "CASCADE_RETRY_BATCH")? {
            config.retry.batch_size = n;
        }
        if let Some(url) = lookup("CASCADE_ORCHESTRATOR_URL") {
            config.backends.orchestrator_url = url;
        }
        if let Some(url) = lookup("CASCADE_REGISTRY_URL") {
            config.backends.registry_url = url;
        }
        if let Some(url) = lookup("CASCADE_SCHEDULER_URL") {
            config.backends.scheduler_url = url;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "CASCADE_HTTP_TIMEOUT_MS")? {
            config.backends.http_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::Config(format!("{} has invalid value '{}'", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = CascadeConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.collateral_policy, CollateralPolicy::FireAndLog);
        assert_eq!(
            config.collateral_timeout,
            Duration::from_millis(DEFAULT_COLLATERAL_TIMEOUT_MS)
        );
        assert_eq!(config.retry.max_attempts, DEFAULT_RETRY_MAX_ATTEMPTS);
        assert!(!config.db_path.starts_with('~'));
    }

    #[test]
    fn test_overrides() {
        let config = CascadeConfig::from_lookup(lookup_from(&[
            ("CASCADE_DB_PATH", "/tmp/cascade.db"),
            ("CASCADE_COLLATERAL_POLICY", "retry-queue"),
            ("CASCADE_COLLATERAL_TIMEOUT_MS", "250"),
            ("CASCADE_RETRY_MAX_ATTEMPTS", "2"),
            ("CASCADE_REGISTRY_URL", "http://registry:5000"),
        ]))
        .unwrap();

        assert_eq!(config.db_path, "/tmp/cascade.db");
        assert_eq!(config.collateral_policy, CollateralPolicy::RetryQueue);
        assert_eq!(config.collateral_timeout, Duration::from_millis(250));
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.backends.registry_url, "http://registry:5000");
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let result =
            CascadeConfig::from_lookup(lookup_from(&[("CASCADE_RETRY_BATCH", "lots")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_unknown_policy_is_config_error() {
        let result =
            CascadeConfig::from_lookup(lookup_from(&[("CASCADE_COLLATERAL_POLICY", "retry")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let result =
            CascadeConfig::from_lookup(lookup_from(&[("CASCADE_RETRY_MAX_ATTEMPTS", "0")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_retry_interval_rejected() {
        let result =
            CascadeConfig::from_lookup(lookup_from(&[("CASCADE_RETRY_INTERVAL_SECS", "0")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_collateral_timeout_rejected() {
        let result =
            CascadeConfig::from_lookup(lookup_from(&[("CASCADE_COLLATERAL_TIMEOUT_MS", "0")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
