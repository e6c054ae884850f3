//! Bucket lifecycle integration tests: create, update, refresh, import and
//! delete.

#[cfg(test)]
mod tests {
    use ruststack_s3_model::types::BucketCannedAcl;
    use ruststack_s3_reconciler::{
        BucketReconciler, ErrorKind, LifecycleState, ReconcileError, RunContext,
    };
    use serde_json::json;

    use crate::{desired, fast_config, reconciler, test_bucket_name};

    #[tokio::test(start_paused = true)]
    async fn test_should_walk_bucket_through_full_lifecycle() {
        let (api, mut r) = reconciler();
        let bucket = test_bucket_name("life");
        let cx = RunContext::new();

        let recorded = r
            .create(
                &cx,
                desired(json!({
                    "bucket": bucket,
                    "region": "eu-central-1",
                    "acl": "public-read",
                    "tags": {"team": "data", "env": "dev"},
                    "versioning": {"enabled": true}
                })),
            )
            .await
            .unwrap();
        assert_eq!(r.state(), LifecycleState::Ready);
        assert_eq!(recorded.bucket, bucket);
        assert_eq!(recorded.region.as_str(), "eu-central-1");
        assert_eq!(recorded.arn, format!("arn:aws:s3:::{bucket}"));
        assert_eq!(recorded.bucket_domain_name, format!("{bucket}.s3.amazonaws.com"));
        assert_eq!(recorded.config.acl, Some(BucketCannedAcl::PublicRead));
        assert!(recorded.config.versioning.is_some_and(|v| v.enabled));
        assert_eq!(recorded.config.tags.len(), 2);

        api.clear_calls();
        let recorded = r
            .update(
                &cx,
                desired(json!({
                    "bucket": bucket,
                    "region": "eu-central-1",
                    "acl": "public-read",
                    "tags": {"team": "data"},
                    "versioning": {"enabled": true}
                })),
            )
            .await
            .unwrap();
        assert_eq!(api.call_count("PutBucketTagging"), 1);
        assert_eq!(api.call_count("PutBucketVersioning"), 0);
        assert_eq!(api.call_count("PutBucketAcl"), 0);
        assert_eq!(recorded.config.tags.len(), 1);

        let refreshed = r.refresh(&cx).await.unwrap();
        assert_eq!(refreshed.config, recorded.config);

        r.delete(&cx).await.unwrap();
        assert_eq!(r.state(), LifecycleState::Absent);
        assert!(r.recorded().is_none());
        assert!(!api.bucket_exists(&bucket));
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_generate_name_from_prefix() {
        let (api, mut r) = reconciler();
        let recorded = r
            .create(&RunContext::new(), desired(json!({"bucket_prefix": "scratch-"})))
            .await
            .unwrap();
        assert!(recorded.bucket.starts_with("scratch-"));
        assert!(recorded.bucket.len() > "scratch-".len());
        assert!(api.bucket_exists(&recorded.bucket));
        assert_eq!(r.bucket(), Some(recorded.bucket.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_adopt_bucket_created_elsewhere() {
        let (api, mut owner) = reconciler();
        let bucket = test_bucket_name("adopt");
        let cx = RunContext::new();
        owner
            .create(
                &cx,
                desired(json!({"bucket": bucket, "tags": {"owner": "ops"}})),
            )
            .await
            .unwrap();

        let mut adopter = BucketReconciler::new(api.clone(), fast_config());
        let imported = adopter.import(&cx, &bucket).await.unwrap();
        assert_eq!(adopter.state(), LifecycleState::Ready);
        assert_eq!(imported.config.tags.get("owner").map(String::as_str), Some("ops"));

        let err = adopter.import(&cx, &bucket).await.unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidTransition { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_report_missing_bucket_on_import() {
        let (_api, mut r) = reconciler();
        let err = r
            .import(&RunContext::new(), &test_bucket_name("ghost"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_recreate_after_out_of_band_delete() {
        let (api, mut r) = reconciler();
        let bucket = test_bucket_name("gone");
        let cx = RunContext::new();
        let wanted = desired(json!({"bucket": bucket, "tags": {"a": "1"}}));
        r.create(&cx, wanted.clone()).await.unwrap();

        assert!(api.remove_bucket_out_of_band(&bucket));
        let _ = r.refresh(&cx).await;
        assert_eq!(r.state(), LifecycleState::Absent);

        let recorded = r.create(&cx, wanted).await.unwrap();
        assert_eq!(recorded.bucket, bucket);
        assert_eq!(r.state(), LifecycleState::Ready);
    }
}
