//! Desired and recorded bucket state.

use ruststack_core::AwsRegion;
use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, ReconcileResult};
use crate::facets::BucketConfig;
use crate::naming::{prefixed_unique_id, unique_id};
use crate::validation::validate_bucket_prefix;

/// What the caller wants a bucket to look like.
///
/// ```
/// use ruststack_s3_reconciler::state::DesiredState;
///
/// let desired: DesiredState = serde_json::from_str(r#"{
///     "bucket": "photos",
///     "region": "eu-west-1",
///     "versioning": {"enabled": true},
///     "tags": {"team": "media"}
/// }"#).unwrap();
/// assert_eq!(desired.bucket.as_deref(), Some("photos"));
/// assert!(desired.config.versioning.unwrap().enabled);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesiredState {
    /// Exact bucket name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// Name prefix completed by a generated suffix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_prefix: Option<String>,
    /// Target region; the configured default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<AwsRegion>,
    /// Empty the bucket, including every object version, before deleting it.
    pub force_destroy: bool,
    /// Facet configuration.
    #[serde(flatten)]
    pub config: BucketConfig,
}

impl DesiredState {
    /// Desired state of a named bucket.
    #[must_use]
    pub fn named(bucket: impl Into<String>, config: BucketConfig) -> Self {
        Self {
            bucket: Some(bucket.into()),
            config,
            ..Self::default()
        }
    }

    /// How the bucket name is chosen.
    pub fn naming(&self) -> ReconcileResult<BucketNaming> {
        match (&self.bucket, &self.bucket_prefix) {
            (Some(_), Some(_)) => Err(ReconcileError::validation(
                "bucket",
                "bucket and bucket_prefix are mutually exclusive",
            )),
            (Some(name), None) => Ok(BucketNaming::Named(name.clone())),
            (None, Some(prefix)) => {
                validate_bucket_prefix(prefix)?;
                Ok(BucketNaming::Prefixed(prefix.clone()))
            }
            (None, None) => Ok(BucketNaming::Generated),
        }
    }
}

/// Source of a bucket name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketNaming {
    /// Use the name as given.
    Named(String),
    /// Append a unique suffix to this prefix.
    Prefixed(String),
    /// Generate the whole name.
    Generated,
}

impl BucketNaming {
    /// The bucket name to create.
    #[must_use]
    pub fn resolve(&self) -> String {
        match self {
            Self::Named(name) => name.clone(),
            Self::Prefixed(prefix) => prefixed_unique_id(prefix),
            Self::Generated => unique_id(),
        }
    }
}

/// What a read pass found. Replaced wholesale on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedState {
    /// Bucket name.
    pub bucket: String,
    /// Bucket ARN.
    pub arn: String,
    /// Region the bucket lives in.
    pub region: AwsRegion,
    /// Global virtual-hosted domain name.
    pub bucket_domain_name: String,
    /// Regional virtual-hosted domain name.
    pub bucket_regional_domain_name: String,
    /// Route 53 hosted zone of the region's website endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosted_zone_id: Option<String>,
    /// Website endpoint, only with website hosting configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_endpoint: Option<String>,
    /// Website domain, only with website hosting configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_domain: Option<String>,
    /// Whether destroy may empty the bucket first.
    pub force_destroy: bool,
    /// Facet configuration as read back.
    pub config: BucketConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::UNIQUE_ID_PREFIX;

    #[test]
    fn test_should_reject_name_and_prefix_together() {
        let desired = DesiredState {
            bucket: Some("a".into()),
            bucket_prefix: Some("b".into()),
            ..DesiredState::default()
        };
        let err = desired.naming().unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_should_resolve_each_naming_mode() {
        let named = DesiredState::named("photos", BucketConfig::default());
        assert_eq!(named.naming().unwrap().resolve(), "photos");

        let prefixed = DesiredState {
            bucket_prefix: Some("logs-".into()),
            ..DesiredState::default()
        };
        assert!(prefixed.naming().unwrap().resolve().starts_with("logs-"));

        let generated = DesiredState::default().naming().unwrap().resolve();
        assert!(generated.starts_with(UNIQUE_ID_PREFIX));
    }

    #[test]
    fn test_should_reject_long_prefix() {
        let desired = DesiredState {
            bucket_prefix: Some("p".repeat(40)),
            ..DesiredState::default()
        };
        assert!(desired.naming().is_err());
    }
}
