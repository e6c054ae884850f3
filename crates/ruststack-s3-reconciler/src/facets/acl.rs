//! Canned ACL.

use ruststack_s3_model::types::BucketCannedAcl;

use super::{BucketConfig, FacetName, FacetSynchronizer, FacetValue, SyncContext};
use crate::error::ReconcileResult;

fn canonical(acl: Option<BucketCannedAcl>) -> Option<BucketCannedAcl> {
    acl.filter(|a| *a != BucketCannedAcl::Private)
}

/// Synchronizes [`BucketConfig::acl`].
///
/// The canned ACL is sent with the create call, so the creation pass skips
/// it. A canned ACL cannot be read back; the read reports the desired value.
#[derive(Debug)]
pub struct AclSync;

#[async_trait::async_trait]
impl FacetSynchronizer for AclSync {
    fn facet(&self) -> FacetName {
        FacetName::Acl
    }

    fn unchanged(&self, old: &BucketConfig, new: &BucketConfig) -> bool {
        canonical(old.acl) == canonical(new.acl)
    }

    async fn apply(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        let acl = cx.desired.acl.unwrap_or(BucketCannedAcl::Private);
        cx.api
            .put_bucket_acl(cx.bucket, acl)
            .await
            .map_err(|e| cx.remote_with(FacetName::Acl, "PutBucketAcl", &acl, e))
    }

    async fn read(&self, cx: &SyncContext<'_>) -> ReconcileResult<FacetValue> {
        Ok(FacetValue::Acl(canonical(cx.desired.acl)))
    }
}
