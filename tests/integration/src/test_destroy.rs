//! Forced destroy integration tests.

#[cfg(test)]
mod tests {
    use ruststack_s3_reconciler::{ErrorKind, LifecycleState, RunContext};
    use serde_json::json;

    use crate::{desired, reconciler, test_bucket_name};

    #[tokio::test(start_paused = true)]
    async fn test_should_empty_large_versioned_bucket_across_pages() {
        let (api, mut r) = reconciler();
        let bucket = test_bucket_name("destroy");
        let cx = RunContext::new();
        r.create(
            &cx,
            desired(json!({
                "bucket": bucket,
                "force_destroy": true,
                "versioning": {"enabled": true}
            })),
        )
        .await
        .unwrap();

        for i in 0..750 {
            let key = format!("logs/{i:04}.json");
            api.put_object(&bucket, &key).unwrap();
            api.put_object(&bucket, &key).unwrap();
        }
        assert_eq!(api.object_version_count(&bucket), Some(1500));

        r.delete(&cx).await.unwrap();
        assert_eq!(r.state(), LifecycleState::Absent);
        assert!(!api.bucket_exists(&bucket));
        assert_eq!(api.call_count("DeleteObjects"), 2);
        assert_eq!(api.call_count("DeleteBucket"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_keep_bucket_and_state_without_force() {
        let (api, mut r) = reconciler();
        let bucket = test_bucket_name("keep");
        let cx = RunContext::new();
        r.create(&cx, desired(json!({"bucket": bucket}))).await.unwrap();
        api.put_object(&bucket, "report.csv").unwrap();

        let err = r.delete(&cx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(r.state(), LifecycleState::Ready);
        assert!(api.bucket_exists(&bucket));
        assert_eq!(api.object_version_count(&bucket), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_allow_force_destroy_after_update() {
        let (api, mut r) = reconciler();
        let bucket = test_bucket_name("late");
        let cx = RunContext::new();
        r.create(&cx, desired(json!({"bucket": bucket}))).await.unwrap();
        api.put_object(&bucket, "a").unwrap();
        api.put_object(&bucket, "b").unwrap();
        assert_eq!(r.delete(&cx).await.unwrap_err().kind(), ErrorKind::Conflict);

        r.update(&cx, desired(json!({"bucket": bucket, "force_destroy": true})))
            .await
            .unwrap();
        r.delete(&cx).await.unwrap();
        assert!(!api.bucket_exists(&bucket));
    }
}
