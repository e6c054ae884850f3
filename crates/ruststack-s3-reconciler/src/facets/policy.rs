//! Bucket policy.

use std::fmt;

use ruststack_s3_model::{S3Error, S3ErrorCode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::{BucketConfig, FacetName, FacetSynchronizer, FacetValue, SyncContext, tolerate};
use crate::error::{ReconcileError, ReconcileResult};
use crate::retry::is_propagation_lag;

/// A bucket policy document.
///
/// Held as parsed JSON, so two documents that differ only in key order or
/// whitespace are equal. Deserializes from either a JSON object or a string
/// containing one.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDocument(Value);

impl PolicyDocument {
    /// Parse a policy document.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text).map(Self)
    }

    /// The parsed document.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Compact serialization, as sent to the remote.
    #[must_use]
    pub fn to_compact(&self) -> String {
        self.0.to_string()
    }
}

impl From<Value> for PolicyDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl fmt::Display for PolicyDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for PolicyDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PolicyDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(text) => Self::parse(&text).map_err(serde::de::Error::custom),
            other => Ok(Self(other)),
        }
    }
}

/// Synchronizes [`BucketConfig::policy`].
#[derive(Debug)]
pub struct PolicySync;

#[async_trait::async_trait]
impl FacetSynchronizer for PolicySync {
    fn facet(&self) -> FacetName {
        FacetName::Policy
    }

    fn validate(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        match &cx.desired.policy {
            Some(doc) if !doc.as_value().is_object() => Err(ReconcileError::validation(
                FacetName::Policy,
                "policy must be a JSON object",
            )),
            _ => Ok(()),
        }
    }

    fn unchanged(&self, old: &BucketConfig, new: &BucketConfig) -> bool {
        old.policy == new.policy
    }

    async fn apply(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        match &cx.desired.policy {
            None => cx
                .api
                .delete_bucket_policy(cx.bucket)
                .await
                .map_err(|e| cx.remote(FacetName::Policy, "DeleteBucketPolicy", e)),
            Some(doc) => cx
                .api
                .put_bucket_policy(cx.bucket, doc.to_compact())
                .await
                .map_err(|e| cx.remote_with(FacetName::Policy, "PutBucketPolicy", doc, e)),
        }
    }

    async fn read(&self, cx: &SyncContext<'_>) -> ReconcileResult<FacetValue> {
        let text = tolerate(
            cx.api.get_bucket_policy(cx.bucket).await,
            &[S3ErrorCode::NoSuchBucketPolicy],
        )
        .map_err(|e| cx.remote(FacetName::Policy, "GetBucketPolicy", e))?;

        let doc = text
            .filter(|t| !t.trim().is_empty())
            .map(|t| PolicyDocument::parse(&t))
            .transpose()
            .map_err(|e| {
                ReconcileError::Internal(anyhow::anyhow!(
                    "bucket {} returned an unparseable policy: {e}",
                    cx.bucket
                ))
            })?;
        Ok(FacetValue::Policy(doc))
    }

    /// Principals named in a fresh policy may not be resolvable yet.
    fn is_retryable(&self, err: &S3Error) -> bool {
        is_propagation_lag(err) || err.is(S3ErrorCode::MalformedPolicy)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_should_compare_policies_semantically() {
        let a = PolicyDocument::parse(r#"{"Version":"2012-10-17","Statement":[]}"#).unwrap();
        let b = PolicyDocument::parse("{ \"Statement\": [],\n  \"Version\": \"2012-10-17\" }")
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_compact(), b.to_compact());
    }

    #[test]
    fn test_should_accept_object_or_string() {
        let from_object: PolicyDocument =
            serde_json::from_value(json!({"Version": "2012-10-17"})).unwrap();
        let from_string: PolicyDocument =
            serde_json::from_value(json!("{\"Version\":\"2012-10-17\"}")).unwrap();
        assert_eq!(from_object, from_string);
        assert!(serde_json::from_value::<PolicyDocument>(json!("{not json")).is_err());
    }

    #[test]
    fn test_should_retry_malformed_policy() {
        assert!(PolicySync.is_retryable(&S3Error::malformed_policy("Invalid principal")));
        assert!(!PolicySync.is_retryable(&S3Error::new(S3ErrorCode::AccessDenied)));
    }
}
