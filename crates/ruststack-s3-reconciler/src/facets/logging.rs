//! Server access logging.

use ruststack_s3_model::types::LoggingEnabled;
use serde::{Deserialize, Serialize};

use super::{BucketConfig, FacetName, FacetSynchronizer, FacetValue, SyncContext};
use crate::error::{ReconcileError, ReconcileResult};

/// Access-log delivery target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logging {
    /// Bucket receiving the logs.
    pub target_bucket: String,
    /// Key prefix of delivered log objects.
    #[serde(default)]
    pub target_prefix: String,
}

/// Synchronizes [`BucketConfig::logging`].
#[derive(Debug)]
pub struct LoggingSync;

#[async_trait::async_trait]
impl FacetSynchronizer for LoggingSync {
    fn facet(&self) -> FacetName {
        FacetName::Logging
    }

    fn validate(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        match &cx.desired.logging {
            Some(logging) if logging.target_bucket.is_empty() => Err(
                ReconcileError::validation(FacetName::Logging, "target_bucket is required"),
            ),
            _ => Ok(()),
        }
    }

    fn unchanged(&self, old: &BucketConfig, new: &BucketConfig) -> bool {
        old.logging == new.logging
    }

    async fn apply(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        let target = cx.desired.logging.as_ref().map(|l| LoggingEnabled {
            target_bucket: l.target_bucket.clone(),
            target_prefix: l.target_prefix.clone(),
        });
        cx.api
            .put_bucket_logging(cx.bucket, target.clone())
            .await
            .map_err(|e| cx.remote_with(FacetName::Logging, "PutBucketLogging", &target, e))
    }

    async fn read(&self, cx: &SyncContext<'_>) -> ReconcileResult<FacetValue> {
        let target = cx
            .api
            .get_bucket_logging(cx.bucket)
            .await
            .map_err(|e| cx.remote(FacetName::Logging, "GetBucketLogging", e))?;
        Ok(FacetValue::Logging(target.map(|t| Logging {
            target_bucket: t.target_bucket,
            target_prefix: t.target_prefix,
        })))
    }
}
