//! Reconciler configuration.
//!
//! Provides [`ReconcilerConfig`], which carries the default region and every
//! retry deadline the engine uses. Values are loaded from environment
//! variables the same way the rest of the RustStack tooling is configured.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::retry::RetryPolicy;

/// Reconciler configuration.
///
/// # Examples
///
/// ```
/// use ruststack_s3_reconciler::config::ReconcilerConfig;
///
/// let config = ReconcilerConfig::default();
/// assert_eq!(config.default_region, "us-east-1");
/// assert_eq!(config.create_timeout_secs, 300);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ReconcilerConfig {
    /// Region used when a desired state does not name one.
    #[builder(default = String::from("us-east-1"))]
    pub default_region: String,

    /// Deadline for retrying bucket creation.
    #[builder(default = 300)]
    pub create_timeout_secs: u64,

    /// Deadline for retrying one facet put or delete.
    #[builder(default = 60)]
    pub update_timeout_secs: u64,

    /// Deadline for waiting on a freshly created bucket to become visible
    /// during a read pass.
    #[builder(default = 60)]
    pub read_timeout_secs: u64,

    /// First delay between retry attempts.
    #[builder(default = 500)]
    pub retry_initial_delay_ms: u64,

    /// Upper bound of the delay between retry attempts.
    #[builder(default = 10_000)]
    pub retry_max_delay_ms: u64,

    /// Maximum `DeleteBucket` attempts of a forced destroy. The bucket is
    /// emptied completely between attempts.
    #[builder(default = 100)]
    pub destroy_max_passes: usize,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            default_region: String::from("us-east-1"),
            create_timeout_secs: 300,
            update_timeout_secs: 60,
            read_timeout_secs: 60,
            retry_initial_delay_ms: 500,
            retry_max_delay_ms: 10_000,
            destroy_max_passes: 100,
            log_level: String::from("info"),
        }
    }
}

impl ReconcilerConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `DEFAULT_REGION` | `us-east-1` |
    /// | `S3_CREATE_TIMEOUT_SECS` | `300` |
    /// | `S3_UPDATE_TIMEOUT_SECS` | `60` |
    /// | `S3_READ_TIMEOUT_SECS` | `60` |
    /// | `S3_RETRY_INITIAL_DELAY_MS` | `500` |
    /// | `S3_RETRY_MAX_DELAY_MS` | `10000` |
    /// | `S3_DESTROY_MAX_PASSES` | `100` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("DEFAULT_REGION") {
            config.default_region = v;
        }
        if let Some(n) = parse_env("S3_CREATE_TIMEOUT_SECS") {
            config.create_timeout_secs = n;
        }
        if let Some(n) = parse_env("S3_UPDATE_TIMEOUT_SECS") {
            config.update_timeout_secs = n;
        }
        if let Some(n) = parse_env("S3_READ_TIMEOUT_SECS") {
            config.read_timeout_secs = n;
        }
        if let Some(n) = parse_env("S3_RETRY_INITIAL_DELAY_MS") {
            config.retry_initial_delay_ms = n;
        }
        if let Some(n) = parse_env("S3_RETRY_MAX_DELAY_MS") {
            config.retry_max_delay_ms = n;
        }
        if let Some(n) = parse_env("S3_DESTROY_MAX_PASSES") {
            config.destroy_max_passes = n;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Retry policy for the create call.
    #[must_use]
    pub fn create_retry(&self) -> RetryPolicy {
        self.retry_with(self.create_timeout_secs)
    }

    /// Retry policy for facet puts and deletes.
    #[must_use]
    pub fn update_retry(&self) -> RetryPolicy {
        self.retry_with(self.update_timeout_secs)
    }

    /// Retry policy for the existence check of a read pass.
    #[must_use]
    pub fn read_retry(&self) -> RetryPolicy {
        self.retry_with(self.read_timeout_secs)
    }

    fn retry_with(&self, timeout_secs: u64) -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(timeout_secs)).with_delays(
            Duration::from_millis(self.retry_initial_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        )
    }
}

/// Parse a numeric environment variable, ignoring unset or malformed values.
fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.default_region, "us-east-1");
        assert_eq!(config.create_timeout_secs, 300);
        assert_eq!(config.update_timeout_secs, 60);
        assert_eq!(config.read_timeout_secs, 60);
        assert_eq!(config.retry_initial_delay_ms, 500);
        assert_eq!(config.retry_max_delay_ms, 10_000);
        assert_eq!(config.destroy_max_passes, 100);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_should_load_from_env() {
        let config = ReconcilerConfig::from_env();
        assert!(!config.default_region.is_empty());
    }

    #[test]
    fn test_should_build_with_typed_builder() {
        let config = ReconcilerConfig::builder()
            .default_region("eu-west-1".into())
            .create_timeout_secs(10)
            .update_timeout_secs(5)
            .destroy_max_passes(3)
            .log_level("debug".into())
            .build();

        assert_eq!(config.default_region, "eu-west-1");
        assert_eq!(config.create_timeout_secs, 10);
        assert_eq!(config.update_timeout_secs, 5);
        assert_eq!(config.read_timeout_secs, 60);
        assert_eq!(config.destroy_max_passes, 3);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_should_derive_retry_deadlines() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.create_retry().timeout(), Duration::from_secs(300));
        assert_eq!(config.update_retry().timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_should_serialize_to_camel_case_json() {
        let config = ReconcilerConfig::default();
        let json = serde_json::to_string(&config).expect("test serialization");
        assert!(json.contains("defaultRegion"));
        assert!(json.contains("createTimeoutSecs"));
    }
}
