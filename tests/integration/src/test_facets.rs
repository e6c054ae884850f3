//! Facet round-trip integration tests.

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use ruststack_s3_model::types::{Protocol, TransitionStorageClass};
    use ruststack_s3_reconciler::facets::{RedirectTarget, Website};
    use ruststack_s3_reconciler::{ErrorKind, LifecycleState, RunContext};
    use serde_json::json;

    use crate::{desired, reconciler, test_bucket_name};

    #[tokio::test(start_paused = true)]
    async fn test_should_round_trip_redirect_website() {
        let (_api, mut r) = reconciler();
        let bucket = test_bucket_name("site");
        let recorded = r
            .create(
                &RunContext::new(),
                desired(json!({
                    "bucket": bucket,
                    "region": "eu-west-1",
                    "website": {"redirect_all_requests_to": "https://example.com/docs?lang=en"}
                })),
            )
            .await
            .unwrap();

        let website = recorded.config.website.clone().unwrap();
        assert_eq!(
            website.redirect_all_requests_to,
            Some(RedirectTarget {
                host: "example.com".into(),
                path: "/docs".into(),
                query: Some("lang=en".into()),
                protocol: Some(Protocol::Https),
            })
        );
        assert!(website.index_document.is_none());
        let endpoint = recorded.website_endpoint.as_deref().unwrap();
        assert!(endpoint.starts_with(&bucket));
        assert!(recorded.website_domain.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_clear_website_endpoint_when_hosting_removed() {
        let (api, mut r) = reconciler();
        let bucket = test_bucket_name("site");
        let cx = RunContext::new();
        let mut wanted = desired(json!({
            "bucket": bucket,
            "website": {"index_document": "index.html", "error_document": "404.html"}
        }));
        let recorded = r.create(&cx, wanted.clone()).await.unwrap();
        assert_eq!(
            recorded.config.website,
            Some(Website {
                index_document: Some("index.html".into()),
                error_document: Some("404.html".into()),
                ..Website::default()
            })
        );
        assert!(recorded.website_endpoint.is_some());

        wanted.config.website = None;
        let recorded = r.update(&cx, wanted).await.unwrap();
        assert_eq!(api.call_count("DeleteBucketWebsite"), 1);
        assert!(recorded.config.website.is_none());
        assert!(recorded.website_endpoint.is_none());
        assert!(recorded.website_domain.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_round_trip_lifecycle_rule_with_prefix_and_tags() {
        let (api, mut r) = reconciler();
        let bucket = test_bucket_name("rules");
        let cx = RunContext::new();
        let wanted = desired(json!({
            "bucket": bucket,
            "lifecycle_rules": [{
                "prefix": "tmp/",
                "tags": {"class": "scratch", "owner": "ci"},
                "enabled": true,
                "expiration": {"days": 7},
                "transitions": [{"date": "2030-01-01", "storage_class": "GLACIER"}]
            }]
        }));
        let recorded = r.create(&cx, wanted.clone()).await.unwrap();

        let [rule] = recorded.config.lifecycle_rules.as_slice() else {
            panic!("expected one rule, got {:?}", recorded.config.lifecycle_rules);
        };
        assert!(rule.id.as_deref().is_some_and(|id| !id.is_empty()));
        assert_eq!(rule.prefix.as_deref(), Some("tmp/"));
        assert_eq!(rule.tags.len(), 2);
        assert_eq!(rule.expiration.as_ref().and_then(|e| e.days), Some(7));
        assert_eq!(
            rule.transitions[0].date,
            NaiveDate::from_ymd_opt(2030, 1, 1)
        );
        assert_eq!(rule.transitions[0].storage_class, TransitionStorageClass::Glacier);

        // The generated id does not count as drift.
        api.clear_calls();
        r.update(&cx, wanted).await.unwrap();
        assert_eq!(api.call_count("PutBucketLifecycleConfiguration"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_reject_rule_without_action_before_any_call() {
        let (api, mut r) = reconciler();
        let err = r
            .create(
                &RunContext::new(),
                desired(json!({
                    "bucket": test_bucket_name("rules"),
                    "lifecycle_rules": [{"prefix": "tmp/", "enabled": true}]
                })),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_configure_replication_after_versioning() {
        let (api, mut r) = reconciler();
        let bucket = test_bucket_name("src");
        let recorded = r
            .create(
                &RunContext::new(),
                desired(json!({
                    "bucket": bucket,
                    "versioning": {"enabled": true},
                    "replication": {
                        "role": "arn:aws:iam::123456789012:role/replicator",
                        "rules": [{
                            "id": "all",
                            "prefix": "",
                            "destination": {"bucket": "arn:aws:s3:::replica", "storage_class": "STANDARD"}
                        }]
                    }
                })),
            )
            .await
            .unwrap();

        let replication = recorded.config.replication.clone().unwrap();
        assert_eq!(replication.role, "arn:aws:iam::123456789012:role/replicator");
        assert_eq!(replication.rules.len(), 1);
        assert_eq!(replication.rules[0].destination.bucket, "arn:aws:s3:::replica");

        let calls = api.calls();
        let position = |op: &str| calls.iter().position(|c| c.operation == op).unwrap();
        assert!(position("PutBucketVersioning") < position("PutBucketReplication"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_reject_replication_without_versioning() {
        let (api, mut r) = reconciler();
        let err = r
            .create(
                &RunContext::new(),
                desired(json!({
                    "bucket": test_bucket_name("src"),
                    "replication": {
                        "role": "arn:aws:iam::123456789012:role/replicator",
                        "rules": [{"destination": {"bucket": "arn:aws:s3:::replica"}}]
                    }
                })),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("versioning"));
        assert!(api.calls().is_empty());
        assert_eq!(r.state(), LifecycleState::Absent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_enable_object_lock_on_create() {
        let (api, mut r) = reconciler();
        let bucket = test_bucket_name("lock");
        let recorded = r
            .create(
                &RunContext::new(),
                desired(json!({
                    "bucket": bucket,
                    "versioning": {"enabled": true},
                    "object_lock": {
                        "enabled": true,
                        "default_retention": {"mode": "GOVERNANCE", "days": 30}
                    }
                })),
            )
            .await
            .unwrap();

        let lock = recorded.config.object_lock.clone().unwrap();
        assert!(lock.enabled);
        assert_eq!(lock.default_retention.and_then(|d| d.days), Some(30));
        assert!(recorded.config.versioning.is_some_and(|v| v.enabled));
        assert_eq!(api.call_count("CreateBucket"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_reapply_object_lock_bucket_without_versioning_calls() {
        let (api, mut r) = reconciler();
        let cx = RunContext::new();
        let bucket = test_bucket_name("lock");
        let state = json!({"bucket": bucket, "object_lock": {"enabled": true}});
        let recorded = r.create(&cx, desired(state.clone())).await.unwrap();
        assert!(recorded.config.versioning.is_some_and(|v| v.enabled));

        assert!(r.plan(&desired(state.clone())).unwrap().changed.is_empty());
        api.clear_calls();
        r.update(&cx, desired(state)).await.unwrap();
        assert_eq!(api.call_count("PutBucketVersioning"), 0);
        assert_eq!(r.state(), LifecycleState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_reject_dropping_versioning_under_replication() {
        let (api, mut r) = reconciler();
        let cx = RunContext::new();
        let bucket = test_bucket_name("src");
        let replication = json!({
            "role": "arn:aws:iam::123456789012:role/replicator",
            "rules": [{"prefix": "", "destination": {"bucket": "arn:aws:s3:::replica"}}]
        });
        r.create(
            &cx,
            desired(json!({
                "bucket": bucket,
                "versioning": {"enabled": true},
                "replication": replication
            })),
        )
        .await
        .unwrap();
        api.clear_calls();

        let err = r
            .update(&cx, desired(json!({"bucket": bucket, "replication": replication})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(api.calls().is_empty());
        assert!(r.recorded().unwrap().config.versioning.is_some_and(|v| v.enabled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_record_unsupported_facets_as_absent() {
        let (api, mut r) = reconciler();
        api.mark_unsupported("GetBucketAccelerateConfiguration");
        api.mark_unsupported("GetBucketRequestPayment");
        api.mark_unsupported("GetObjectLockConfiguration");

        let recorded = r
            .create(
                &RunContext::new(),
                desired(json!({"bucket": test_bucket_name("minio"), "tags": {"a": "b"}})),
            )
            .await
            .unwrap();
        assert_eq!(r.state(), LifecycleState::Ready);
        assert!(recorded.config.acceleration_status.is_none());
        assert!(recorded.config.request_payer.is_none());
        assert!(recorded.config.object_lock.is_none());
        assert_eq!(recorded.config.tags.len(), 1);
    }
}
