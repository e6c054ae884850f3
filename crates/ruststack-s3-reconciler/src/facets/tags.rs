//! Bucket tag set.

use ruststack_s3_model::S3ErrorCode;
use ruststack_s3_model::types::Tag;
use tracing::debug;

use super::{BucketConfig, FacetName, FacetSynchronizer, FacetValue, SyncContext, tolerate};
use crate::error::ReconcileResult;
use crate::validation::validate_tags;

/// Synchronizes [`BucketConfig::tags`]. An empty map deletes the tag set.
#[derive(Debug)]
pub struct TagsSync;

#[async_trait::async_trait]
impl FacetSynchronizer for TagsSync {
    fn facet(&self) -> FacetName {
        FacetName::Tags
    }

    fn validate(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        validate_tags(FacetName::Tags.as_str(), &cx.desired.tags)
    }

    fn unchanged(&self, old: &BucketConfig, new: &BucketConfig) -> bool {
        old.tags == new.tags
    }

    async fn apply(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        if cx.desired.tags.is_empty() {
            debug!(bucket = %cx.bucket, "deleting bucket tags");
            return cx
                .api
                .delete_bucket_tagging(cx.bucket)
                .await
                .map_err(|e| cx.remote(FacetName::Tags, "DeleteBucketTagging", e));
        }

        let tags: Vec<Tag> = cx
            .desired
            .tags
            .iter()
            .map(|(k, v)| Tag::new(k.as_str(), v.as_str()))
            .collect();
        cx.api
            .put_bucket_tagging(cx.bucket, tags.clone())
            .await
            .map_err(|e| cx.remote_with(FacetName::Tags, "PutBucketTagging", &tags, e))
    }

    async fn read(&self, cx: &SyncContext<'_>) -> ReconcileResult<FacetValue> {
        let tags = tolerate(
            cx.api.get_bucket_tagging(cx.bucket).await,
            &[S3ErrorCode::NoSuchTagSet],
        )
        .map_err(|e| cx.remote(FacetName::Tags, "GetBucketTagging", e))?
        .unwrap_or_default();
        Ok(FacetValue::Tags(
            tags.into_iter().map(|t| (t.key, t.value)).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ruststack_s3_model::input::CreateBucketInput;

    use super::*;
    use crate::client::S3ControlPlane;
    use crate::facets::SyncPass;
    use crate::memory::InMemoryS3;

    async fn bucket(api: &InMemoryS3) {
        api.create_bucket(CreateBucketInput {
            bucket: "tagged".into(),
            acl: None,
            create_bucket_configuration: None,
            object_lock_enabled_for_bucket: false,
        })
        .await
        .unwrap();
    }

    fn with_tags(pairs: &[(&str, &str)]) -> BucketConfig {
        BucketConfig {
            tags: pairs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            ..BucketConfig::default()
        }
    }

    fn cx<'a>(api: &'a InMemoryS3, desired: &'a BucketConfig) -> SyncContext<'a> {
        SyncContext {
            api,
            bucket: "tagged",
            desired,
            prior: None,
            pass: SyncPass::Update,
        }
    }

    #[tokio::test]
    async fn test_should_put_then_delete_tag_set() {
        let api = InMemoryS3::new();
        bucket(&api).await;

        let desired = with_tags(&[("env", "prod"), ("team", "web")]);
        TagsSync.apply(&cx(&api, &desired)).await.unwrap();
        let read = TagsSync.read(&cx(&api, &desired)).await.unwrap();
        assert_eq!(read, FacetValue::Tags(desired.tags.clone()));

        let empty = BucketConfig::default();
        TagsSync.apply(&cx(&api, &empty)).await.unwrap();
        assert_eq!(api.call_count("DeleteBucketTagging"), 1);
        let read = TagsSync.read(&cx(&api, &empty)).await.unwrap();
        assert_eq!(read, FacetValue::Tags(BTreeMap::new()));
    }

    #[test]
    fn test_should_reject_oversized_tag_key() {
        let api = InMemoryS3::new();
        let long = "k".repeat(129);
        let desired = with_tags(&[(long.as_str(), "v")]);
        assert!(TagsSync.validate(&cx(&api, &desired)).is_err());
    }
}
