//! Bucket deletion, optionally emptying the bucket first.
//!
//! A forced destroy alternates between deleting the bucket and emptying it,
//! one page of object versions and delete markers at a time:
//!
//! ```text
//! DeleteBucket ──ok / NoSuchBucket──────────────────────────────▶ Ok
//!      │
//!      BucketNotEmpty ──!force / attempt cap────────────────────▶ Conflict
//!      │
//!      ListObjectVersions ──nothing listed──────────────────────▶ Conflict
//!      │        ▲
//!      │        └──────── more versions listed ───┐
//!      DeleteObjects ──nothing deleted──────────────────────────▶ Internal
//!      │                                          │
//!      └── listing empty ──▶ next attempt: DeleteBucket
//! ```
//!
//! Emptying runs until a listing comes back empty, however many pages that
//! takes; every batch must delete something and the run context is checked
//! between batches. [`ReconcilerConfig::destroy_max_passes`] caps the
//! `DeleteBucket` attempts, so a writer that keeps refilling the bucket
//! cannot keep the destroyer running.
//!
//! [`ReconcilerConfig::destroy_max_passes`]: crate::config::ReconcilerConfig::destroy_max_passes

use ruststack_s3_model::S3ErrorCode;
use ruststack_s3_model::input::ListObjectVersionsInput;
use tracing::{debug, info, warn};

use crate::client::S3ControlPlane;
use crate::context::RunContext;
use crate::error::{ReconcileError, ReconcileResult};

/// Deletes buckets, emptying them first when allowed to.
#[derive(Debug, Clone, Copy)]
pub struct RecursiveDestroyer<'a> {
    api: &'a dyn S3ControlPlane,
    max_passes: usize,
}

impl<'a> RecursiveDestroyer<'a> {
    /// A destroyer making at most `max_passes` delete attempts.
    #[must_use]
    pub fn new(api: &'a dyn S3ControlPlane, max_passes: usize) -> Self {
        Self {
            api,
            max_passes: max_passes.max(1),
        }
    }

    /// Delete `bucket`. A bucket that is already gone counts as deleted.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::Conflict`] if the bucket is not empty and
    ///   `force_empty` is false, or it is still not empty after the last
    ///   attempt.
    /// - [`ReconcileError::Remote`] for any other remote failure.
    pub async fn destroy(
        &self,
        cx: &RunContext,
        bucket: &str,
        force_empty: bool,
    ) -> ReconcileResult<()> {
        for attempt in 1..=self.max_passes {
            let err = match self.api.delete_bucket(bucket).await {
                Ok(()) => {
                    info!(bucket, attempt, "bucket deleted");
                    return Ok(());
                }
                Err(err) if err.is(S3ErrorCode::NoSuchBucket) => {
                    debug!(bucket, "bucket already gone");
                    return Ok(());
                }
                Err(err) if err.is(S3ErrorCode::BucketNotEmpty) => err,
                Err(err) => return Err(ReconcileError::remote(bucket, "DeleteBucket", err)),
            };

            if !force_empty {
                return Err(ReconcileError::Conflict {
                    bucket: bucket.to_owned(),
                    message: format!("{}; set force_destroy to empty it first", err.message),
                });
            }
            if attempt == self.max_passes {
                break;
            }
            self.empty(cx, bucket).await?;
        }

        Err(ReconcileError::Conflict {
            bucket: bucket.to_owned(),
            message: format!("still not empty after {} delete attempts", self.max_passes),
        })
    }

    /// Remove every listed object version and delete marker of `bucket`.
    async fn empty(&self, cx: &RunContext, bucket: &str) -> ReconcileResult<()> {
        let mut removed = 0usize;
        for batch in 1usize.. {
            if cx.is_done() {
                return Err(ReconcileError::Conflict {
                    bucket: bucket.to_owned(),
                    message: "run cancelled while emptying".to_owned(),
                });
            }

            let page = self
                .api
                .list_object_versions(ListObjectVersionsInput::first_page(bucket))
                .await
                .map_err(|e| ReconcileError::remote(bucket, "ListObjectVersions", e))?;
            let objects = page.identifiers();
            if objects.is_empty() {
                if batch == 1 {
                    return Err(ReconcileError::Conflict {
                        bucket: bucket.to_owned(),
                        message: "bucket reports objects but none are listed".to_owned(),
                    });
                }
                break;
            }

            let requested = objects.len();
            let out = self
                .api
                .delete_objects(bucket, objects)
                .await
                .map_err(|e| ReconcileError::remote(bucket, "DeleteObjects", e))?;
            debug!(
                bucket,
                batch,
                requested,
                deleted = out.deleted.len(),
                errors = out.errors.len(),
                "deleted one page"
            );

            if out.deleted.is_empty() {
                return Err(match out.errors.first() {
                    Some(first) => anyhow::anyhow!(
                        "emptying bucket {bucket}: could not delete {} ({}): {}: {}",
                        first.key,
                        first.version_id.as_deref().unwrap_or("current"),
                        first.code,
                        first.message,
                    )
                    .into(),
                    None => ReconcileError::Conflict {
                        bucket: bucket.to_owned(),
                        message: "batch delete removed nothing".to_owned(),
                    },
                });
            }
            if !out.errors.is_empty() {
                warn!(bucket, errors = out.errors.len(), "some versions could not be deleted");
            }
            removed += out.deleted.len();
        }

        debug!(bucket, removed, "bucket emptied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ruststack_s3_model::input::CreateBucketInput;
    use ruststack_s3_model::s3_error;
    use ruststack_s3_model::types::{BucketVersioningStatus, VersioningConfiguration};

    use super::*;
    use crate::error::ErrorKind;
    use crate::memory::InMemoryS3;

    async fn versioned_bucket(api: &InMemoryS3, name: &str) {
        api.create_bucket(CreateBucketInput {
            bucket: name.to_owned(),
            acl: None,
            create_bucket_configuration: None,
            object_lock_enabled_for_bucket: false,
        })
        .await
        .unwrap();
        api.put_bucket_versioning(
            name,
            VersioningConfiguration {
                status: Some(BucketVersioningStatus::Enabled),
                mfa_delete: None,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_should_treat_missing_bucket_as_deleted() {
        let api = InMemoryS3::new();
        RecursiveDestroyer::new(&api, 10)
            .destroy(&RunContext::new(), "ghost", true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_should_refuse_non_empty_bucket_without_force() {
        let api = InMemoryS3::new();
        versioned_bucket(&api, "full").await;
        api.put_object("full", "a").unwrap();

        let err = RecursiveDestroyer::new(&api, 10)
            .destroy(&RunContext::new(), "full", false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(api.object_version_count("full"), Some(1));
        assert_eq!(api.call_count("DeleteObjects"), 0);
    }

    #[tokio::test]
    async fn test_should_empty_every_version_then_delete() {
        let api = InMemoryS3::new();
        versioned_bucket(&api, "full").await;
        for key in ["a", "b", "c"] {
            api.put_object("full", key).unwrap();
            api.put_object("full", key).unwrap();
        }
        api.delete_object("full", "a").unwrap();

        RecursiveDestroyer::new(&api, 10)
            .destroy(&RunContext::new(), "full", true)
            .await
            .unwrap();
        assert!(!api.bucket_exists("full"));
        assert_eq!(api.call_count("DeleteObjects"), 1);
        assert_eq!(api.call_count("DeleteBucket"), 2);
    }

    #[tokio::test]
    async fn test_should_empty_many_pages_within_one_attempt() {
        let api = InMemoryS3::new();
        versioned_bucket(&api, "deep").await;
        for _ in 0..5 {
            for i in 0..500 {
                api.put_object("deep", &format!("key-{i}")).unwrap();
            }
        }
        assert_eq!(api.object_version_count("deep"), Some(2500));

        RecursiveDestroyer::new(&api, 2)
            .destroy(&RunContext::new(), "deep", true)
            .await
            .unwrap();
        assert!(!api.bucket_exists("deep"));
        assert_eq!(api.call_count("DeleteObjects"), 3);
        assert_eq!(api.call_count("DeleteBucket"), 2);
    }

    #[tokio::test]
    async fn test_should_abort_when_batch_delete_fails() {
        let api = InMemoryS3::new();
        versioned_bucket(&api, "busy").await;
        api.put_object("busy", "a").unwrap();
        api.inject_error("DeleteObjects", s3_error!(AccessDenied));

        let err = RecursiveDestroyer::new(&api, 3)
            .destroy(&RunContext::new(), "busy", true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permanent);
        assert!(err.to_string().contains("DeleteObjects"));
    }

    #[tokio::test]
    async fn test_should_surface_other_delete_errors() {
        let api = InMemoryS3::new();
        versioned_bucket(&api, "b").await;
        api.inject_error("DeleteBucket", s3_error!(AccessDenied));
        let err = RecursiveDestroyer::new(&api, 3)
            .destroy(&RunContext::new(), "b", true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permanent);
        assert!(api.bucket_exists("b"));
    }

    #[tokio::test]
    async fn test_should_conflict_when_nothing_left_to_list() {
        let api = InMemoryS3::new();
        versioned_bucket(&api, "b").await;
        api.put_object("b", "a").unwrap();
        api.inject_error("DeleteBucket", s3_error!(BucketNotEmpty));

        let err = RecursiveDestroyer::new(&api, 2)
            .destroy(&RunContext::new(), "b", true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
