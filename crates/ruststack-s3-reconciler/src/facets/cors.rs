//! CORS rules.

use ruststack_s3_model::S3ErrorCode;
use ruststack_s3_model::types as wire;
use serde::{Deserialize, Serialize};

use super::{BucketConfig, FacetName, FacetSynchronizer, FacetValue, SyncContext, tolerate};
use crate::error::{ReconcileError, ReconcileResult};
use crate::fingerprint::{FingerprintBuilder, Fingerprinted, same_set};

const ALLOWED_METHODS: &[&str] = &["GET", "PUT", "POST", "DELETE", "HEAD"];

/// One CORS rule. Rules form an unordered set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsRule {
    /// Headers allowed in preflight requests.
    pub allowed_headers: Vec<String>,
    /// HTTP methods allowed.
    pub allowed_methods: Vec<String>,
    /// Origins allowed.
    pub allowed_origins: Vec<String>,
    /// Response headers exposed to the browser.
    pub expose_headers: Vec<String>,
    /// Preflight cache time in seconds. Zero is the same as unset.
    pub max_age_seconds: Option<i32>,
}

impl Fingerprinted for CorsRule {
    fn write_fields(&self, fp: &mut FingerprintBuilder) {
        fp.list("allowed_headers", &self.allowed_headers)
            .list("allowed_methods", &self.allowed_methods)
            .list("allowed_origins", &self.allowed_origins)
            .list("expose_headers", &self.expose_headers)
            .int(
                "max_age_seconds",
                self.max_age_seconds.filter(|s| *s != 0).map(i64::from),
            );
    }
}

impl From<&CorsRule> for wire::CorsRule {
    fn from(rule: &CorsRule) -> Self {
        Self {
            allowed_headers: rule.allowed_headers.clone(),
            allowed_methods: rule.allowed_methods.clone(),
            allowed_origins: rule.allowed_origins.clone(),
            expose_headers: rule.expose_headers.clone(),
            max_age_seconds: rule.max_age_seconds.filter(|s| *s != 0),
        }
    }
}

impl From<wire::CorsRule> for CorsRule {
    fn from(rule: wire::CorsRule) -> Self {
        Self {
            allowed_headers: rule.allowed_headers,
            allowed_methods: rule.allowed_methods,
            allowed_origins: rule.allowed_origins,
            expose_headers: rule.expose_headers,
            max_age_seconds: rule.max_age_seconds.filter(|s| *s != 0),
        }
    }
}

/// Synchronizes [`BucketConfig::cors_rules`]. An empty list deletes the
/// CORS configuration.
#[derive(Debug)]
pub struct CorsSync;

#[async_trait::async_trait]
impl FacetSynchronizer for CorsSync {
    fn facet(&self) -> FacetName {
        FacetName::Cors
    }

    fn validate(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        for (i, rule) in cx.desired.cors_rules.iter().enumerate() {
            if rule.allowed_origins.is_empty() {
                return Err(ReconcileError::validation(
                    FacetName::Cors,
                    format!("rule {i} has no allowed origins"),
                ));
            }
            if rule.allowed_methods.is_empty() {
                return Err(ReconcileError::validation(
                    FacetName::Cors,
                    format!("rule {i} has no allowed methods"),
                ));
            }
            if let Some(method) = rule
                .allowed_methods
                .iter()
                .find(|m| !ALLOWED_METHODS.contains(&m.as_str()))
            {
                return Err(ReconcileError::validation(
                    FacetName::Cors,
                    format!("rule {i}: unsupported method {method:?}"),
                ));
            }
            if rule.max_age_seconds.is_some_and(|s| s < 0) {
                return Err(ReconcileError::validation(
                    FacetName::Cors,
                    format!("rule {i}: max_age_seconds must not be negative"),
                ));
            }
        }
        Ok(())
    }

    fn unchanged(&self, old: &BucketConfig, new: &BucketConfig) -> bool {
        same_set(&old.cors_rules, &new.cors_rules)
    }

    async fn apply(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        if cx.desired.cors_rules.is_empty() {
            return cx
                .api
                .delete_bucket_cors(cx.bucket)
                .await
                .map_err(|e| cx.remote(FacetName::Cors, "DeleteBucketCors", e));
        }

        let rules: Vec<wire::CorsRule> = cx.desired.cors_rules.iter().map(Into::into).collect();
        cx.api
            .put_bucket_cors(cx.bucket, rules.clone())
            .await
            .map_err(|e| cx.remote_with(FacetName::Cors, "PutBucketCors", &rules, e))
    }

    async fn read(&self, cx: &SyncContext<'_>) -> ReconcileResult<FacetValue> {
        let rules = tolerate(
            cx.api.get_bucket_cors(cx.bucket).await,
            &[S3ErrorCode::NoSuchCORSConfiguration],
        )
        .map_err(|e| cx.remote(FacetName::Cors, "GetBucketCors", e))?
        .unwrap_or_default();
        Ok(FacetValue::Cors(rules.into_iter().map(Into::into).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(methods: &[&str], origins: &[&str]) -> CorsRule {
        CorsRule {
            allowed_methods: methods.iter().map(|m| (*m).to_owned()).collect(),
            allowed_origins: origins.iter().map(|o| (*o).to_owned()).collect(),
            ..CorsRule::default()
        }
    }

    #[test]
    fn test_should_ignore_rule_and_method_order() {
        let old = BucketConfig {
            cors_rules: vec![rule(&["GET", "PUT"], &["*"]), rule(&["POST"], &["a.com"])],
            ..BucketConfig::default()
        };
        let new = BucketConfig {
            cors_rules: vec![rule(&["POST"], &["a.com"]), rule(&["PUT", "GET"], &["*"])],
            ..BucketConfig::default()
        };
        assert!(CorsSync.unchanged(&old, &new));
    }

    #[test]
    fn test_should_treat_zero_max_age_as_unset() {
        let mut a = rule(&["GET"], &["*"]);
        let b = a.clone();
        a.max_age_seconds = Some(0);
        assert_eq!(a.fingerprint(), b.fingerprint());
        a.max_age_seconds = Some(60);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
