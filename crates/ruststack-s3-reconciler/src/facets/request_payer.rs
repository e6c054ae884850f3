//! Requester pays.

use ruststack_s3_model::types::Payer;

use super::{BucketConfig, FacetName, FacetSynchronizer, FacetValue, SyncContext};
use crate::error::ReconcileResult;

fn canonical(payer: Option<Payer>) -> Option<Payer> {
    payer.filter(|p| *p != Payer::BucketOwner)
}

/// Synchronizes [`BucketConfig::request_payer`]. Absent means
/// `BucketOwner`.
#[derive(Debug)]
pub struct RequestPayerSync;

#[async_trait::async_trait]
impl FacetSynchronizer for RequestPayerSync {
    fn facet(&self) -> FacetName {
        FacetName::RequestPayer
    }

    fn unchanged(&self, old: &BucketConfig, new: &BucketConfig) -> bool {
        canonical(old.request_payer) == canonical(new.request_payer)
    }

    async fn apply(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        let payer = cx.desired.request_payer.unwrap_or(Payer::BucketOwner);
        cx.api
            .put_bucket_request_payment(cx.bucket, payer)
            .await
            .map_err(|e| {
                cx.remote_with(FacetName::RequestPayer, "PutBucketRequestPayment", &payer, e)
            })
    }

    async fn read(&self, cx: &SyncContext<'_>) -> ReconcileResult<FacetValue> {
        let payer = cx
            .api
            .get_bucket_request_payment(cx.bucket)
            .await
            .map_err(|e| cx.remote(FacetName::RequestPayer, "GetBucketRequestPayment", e))?;
        Ok(FacetValue::RequestPayer(canonical(Some(payer))))
    }
}
