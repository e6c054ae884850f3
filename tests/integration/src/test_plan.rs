//! Plan integration tests: diffing desired documents against recorded state
//! that went through JSON, the way the plan tool loads it.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ruststack_s3_reconciler::facets::{FacetName, SyncPass};
    use ruststack_s3_reconciler::{
        BucketReconciler, ErrorKind, InMemoryS3, RecordedState, RunContext,
    };
    use serde_json::json;

    use crate::{desired, fast_config, reconciler, test_bucket_name};

    #[tokio::test(start_paused = true)]
    async fn test_should_plan_update_against_serialized_recorded_state() {
        let (_api, mut r) = reconciler();
        let bucket = test_bucket_name("plan");
        let created = r
            .create(
                &RunContext::new(),
                desired(json!({
                    "bucket": bucket,
                    "tags": {"env": "dev"},
                    "cors_rules": [{
                        "allowed_methods": ["GET"],
                        "allowed_origins": ["*"]
                    }],
                    "policy": {
                        "Version": "2012-10-17",
                        "Statement": [{"Effect": "Allow", "Principal": "*", "Action": "s3:GetObject"}]
                    }
                })),
            )
            .await
            .unwrap();

        let text = serde_json::to_string(&*created).unwrap();
        let recorded: RecordedState = serde_json::from_str(&text).unwrap();
        assert_eq!(recorded, *created);

        // Nothing else touches the remote from here on.
        let offline =
            BucketReconciler::resume(Arc::new(InMemoryS3::new()), fast_config(), recorded);
        let plan = offline
            .plan(&desired(json!({
                "bucket": bucket,
                "tags": {"env": "prod"},
                "cors_rules": [{
                    "allowed_methods": ["GET"],
                    "allowed_origins": ["*"]
                }],
                "policy": "{\"Statement\":[{\"Action\":\"s3:GetObject\",\"Principal\":\"*\",\"Effect\":\"Allow\"}],\"Version\":\"2012-10-17\"}",
                "versioning": {"enabled": true}
            })))
            .unwrap();
        assert_eq!(plan.pass, SyncPass::Update);
        assert_eq!(plan.bucket.as_deref(), Some(bucket.as_str()));
        assert_eq!(
            plan.changed.into_iter().collect::<Vec<_>>(),
            vec![FacetName::Tags, FacetName::Versioning]
        );
    }

    #[test]
    fn test_should_plan_creation_in_apply_order() {
        let (api, r) = reconciler();
        let plan = r
            .plan(&desired(json!({
                "bucket_prefix": "assets-",
                "region": "ap-southeast-2",
                "acl": "public-read",
                "versioning": {"enabled": true},
                "tags": {"a": "b"},
                "website": {"index_document": "index.html"},
                "server_side_encryption": {"sse_algorithm": "AES256"}
            })))
            .unwrap();
        assert_eq!(plan.pass, SyncPass::Create);
        assert!(plan.bucket.is_none());
        assert_eq!(plan.region.as_str(), "ap-southeast-2");
        assert_eq!(
            plan.changed.into_iter().collect::<Vec<_>>(),
            vec![
                FacetName::Tags,
                FacetName::Website,
                FacetName::Versioning,
                FacetName::Encryption,
            ]
        );
        assert!(api.calls().is_empty());

        let rendered = serde_json::to_value(
            r.plan(&desired(json!({"bucket": "assets", "tags": {"a": "b"}})))
                .unwrap(),
        )
        .unwrap();
        assert_eq!(rendered["pass"], "create");
        assert_eq!(rendered["changed"], json!(["tags"]));
    }

    #[test]
    fn test_should_reject_invalid_documents_in_plan() {
        let (_api, r) = reconciler();
        let err = r
            .plan(&desired(json!({"bucket": "a", "bucket_prefix": "b"})))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = r
            .plan(&desired(json!({"bucket": "Upper_Case", "region": "eu-west-1"})))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
