//! Transfer acceleration.

use ruststack_s3_model::types::BucketAccelerateStatus;

use super::{BucketConfig, FacetName, FacetSynchronizer, FacetValue, SyncContext};
use crate::error::ReconcileResult;

fn canonical(status: Option<BucketAccelerateStatus>) -> Option<BucketAccelerateStatus> {
    status.filter(|s| *s != BucketAccelerateStatus::Suspended)
}

/// Synchronizes [`BucketConfig::acceleration_status`]. Absent means
/// `Suspended`.
#[derive(Debug)]
pub struct AccelerationSync;

#[async_trait::async_trait]
impl FacetSynchronizer for AccelerationSync {
    fn facet(&self) -> FacetName {
        FacetName::Acceleration
    }

    fn unchanged(&self, old: &BucketConfig, new: &BucketConfig) -> bool {
        canonical(old.acceleration_status) == canonical(new.acceleration_status)
    }

    async fn apply(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        let status = cx
            .desired
            .acceleration_status
            .unwrap_or(BucketAccelerateStatus::Suspended);
        cx.api
            .put_bucket_accelerate_configuration(cx.bucket, status)
            .await
            .map_err(|e| {
                cx.remote_with(
                    FacetName::Acceleration,
                    "PutBucketAccelerateConfiguration",
                    &status,
                    e,
                )
            })
    }

    async fn read(&self, cx: &SyncContext<'_>) -> ReconcileResult<FacetValue> {
        let status = cx
            .api
            .get_bucket_accelerate_configuration(cx.bucket)
            .await
            .map_err(|e| {
                cx.remote(
                    FacetName::Acceleration,
                    "GetBucketAccelerateConfiguration",
                    e,
                )
            })?;
        Ok(FacetValue::Acceleration(canonical(status)))
    }
}
