//! Default server-side encryption.

use ruststack_s3_model::S3ErrorCode;
use ruststack_s3_model::types::{
    ServerSideEncryption, ServerSideEncryptionByDefault, ServerSideEncryptionConfiguration,
    ServerSideEncryptionRule,
};
use serde::{Deserialize, Serialize};

use super::{
    BucketConfig, FacetName, FacetSynchronizer, FacetValue, SyncContext, non_empty, tolerate,
};
use crate::error::{ReconcileError, ReconcileResult};

/// Default encryption applied to new objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encryption {
    /// `AES256` or `aws:kms`.
    pub sse_algorithm: ServerSideEncryption,
    /// KMS key, only with `aws:kms`. Unset uses the account's default key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_master_key_id: Option<String>,
}

/// Synchronizes [`BucketConfig::server_side_encryption`].
#[derive(Debug)]
pub struct EncryptionSync;

#[async_trait::async_trait]
impl FacetSynchronizer for EncryptionSync {
    fn facet(&self) -> FacetName {
        FacetName::Encryption
    }

    fn validate(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        match &cx.desired.server_side_encryption {
            Some(Encryption {
                sse_algorithm: ServerSideEncryption::Aes256,
                kms_master_key_id: Some(_),
            }) => Err(ReconcileError::validation(
                FacetName::Encryption,
                "kms_master_key_id requires sse_algorithm aws:kms",
            )),
            _ => Ok(()),
        }
    }

    fn unchanged(&self, old: &BucketConfig, new: &BucketConfig) -> bool {
        old.server_side_encryption == new.server_side_encryption
    }

    async fn apply(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        let Some(encryption) = &cx.desired.server_side_encryption else {
            return cx
                .api
                .delete_bucket_encryption(cx.bucket)
                .await
                .map_err(|e| cx.remote(FacetName::Encryption, "DeleteBucketEncryption", e));
        };

        let config = ServerSideEncryptionConfiguration {
            rules: vec![ServerSideEncryptionRule {
                apply_server_side_encryption_by_default: Some(ServerSideEncryptionByDefault {
                    sse_algorithm: encryption.sse_algorithm,
                    kms_master_key_id: encryption.kms_master_key_id.clone(),
                }),
            }],
        };
        cx.api
            .put_bucket_encryption(cx.bucket, config.clone())
            .await
            .map_err(|e| cx.remote_with(FacetName::Encryption, "PutBucketEncryption", &config, e))
    }

    async fn read(&self, cx: &SyncContext<'_>) -> ReconcileResult<FacetValue> {
        let config = tolerate(
            cx.api.get_bucket_encryption(cx.bucket).await,
            &[S3ErrorCode::ServerSideEncryptionConfigurationNotFoundError],
        )
        .map_err(|e| cx.remote(FacetName::Encryption, "GetBucketEncryption", e))?;

        let encryption = config
            .and_then(|c| c.rules.into_iter().next())
            .and_then(|r| r.apply_server_side_encryption_by_default)
            .map(|d| Encryption {
                sse_algorithm: d.sse_algorithm,
                kms_master_key_id: non_empty(d.kms_master_key_id),
            });
        Ok(FacetValue::Encryption(encryption))
    }
}
