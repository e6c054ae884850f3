//! Object versioning.

use ruststack_s3_model::types::{BucketVersioningStatus, MfaDeleteStatus, VersioningConfiguration};
use serde::{Deserialize, Serialize};

use super::{BucketConfig, FacetName, FacetSynchronizer, FacetValue, SyncContext, object_lock};
use crate::error::{ReconcileError, ReconcileResult};

/// Versioning configuration. `{enabled: false, mfa_delete: false}` is the
/// remote default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Versioning {
    /// Keep every version of every object.
    pub enabled: bool,
    /// Require MFA to change versioning state or delete versions.
    pub mfa_delete: bool,
}

impl Versioning {
    /// `None` for the remote default.
    #[must_use]
    pub fn canonical(value: Option<Self>) -> Option<Self> {
        value.filter(|v| *v != Self::default())
    }

    fn to_wire(self) -> VersioningConfiguration {
        VersioningConfiguration {
            status: Some(if self.enabled {
                BucketVersioningStatus::Enabled
            } else {
                BucketVersioningStatus::Suspended
            }),
            mfa_delete: Some(if self.mfa_delete {
                MfaDeleteStatus::Enabled
            } else {
                MfaDeleteStatus::Disabled
            }),
        }
    }
}

/// The versioning state `config` leads to. Object lock turns versioning on
/// and keeps it on, whether or not `versioning` says so.
#[must_use]
pub fn effective(config: &BucketConfig) -> Option<Versioning> {
    if object_lock::is_enabled(config) {
        return Some(Versioning {
            enabled: true,
            mfa_delete: config.versioning.is_some_and(|v| v.mfa_delete),
        });
    }
    Versioning::canonical(config.versioning)
}

/// Whether `config` asks for versioning.
#[must_use]
pub fn is_enabled(config: &BucketConfig) -> bool {
    effective(config).is_some_and(|v| v.enabled)
}

/// Synchronizes [`BucketConfig::versioning`].
///
/// An absent value suspends versioning; a bucket can never return to the
/// unversioned state once versioning was enabled.
#[derive(Debug)]
pub struct VersioningSync;

#[async_trait::async_trait]
impl FacetSynchronizer for VersioningSync {
    fn facet(&self) -> FacetName {
        FacetName::Versioning
    }

    fn validate(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        let suspended = cx.desired.versioning.is_some_and(|v| !v.enabled);
        if suspended && object_lock::is_enabled(cx.desired) {
            return Err(ReconcileError::validation(
                FacetName::Versioning,
                "versioning cannot be suspended on a bucket with object lock",
            ));
        }
        Ok(())
    }

    fn unchanged(&self, old: &BucketConfig, new: &BucketConfig) -> bool {
        effective(old) == effective(new)
    }

    async fn apply(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        let config = match effective(cx.desired) {
            Some(v) => v.to_wire(),
            None => VersioningConfiguration {
                status: Some(BucketVersioningStatus::Suspended),
                mfa_delete: None,
            },
        };
        cx.api
            .put_bucket_versioning(cx.bucket, config.clone())
            .await
            .map_err(|e| cx.remote_with(FacetName::Versioning, "PutBucketVersioning", &config, e))
    }

    async fn read(&self, cx: &SyncContext<'_>) -> ReconcileResult<FacetValue> {
        let config = cx
            .api
            .get_bucket_versioning(cx.bucket)
            .await
            .map_err(|e| cx.remote(FacetName::Versioning, "GetBucketVersioning", e))?;
        let versioning = Versioning {
            enabled: config.status == Some(BucketVersioningStatus::Enabled),
            mfa_delete: config.mfa_delete == Some(MfaDeleteStatus::Enabled),
        };
        Ok(FacetValue::Versioning(Versioning::canonical(Some(versioning))))
    }
}

#[cfg(test)]
mod tests {
    use ruststack_s3_model::input::CreateBucketInput;

    use super::*;
    use crate::client::S3ControlPlane;
    use crate::facets::{ObjectLock, SyncPass};
    use crate::memory::InMemoryS3;

    fn cx<'a>(api: &'a InMemoryS3, desired: &'a BucketConfig) -> SyncContext<'a> {
        SyncContext {
            api,
            bucket: "versioned",
            desired,
            prior: None,
            pass: SyncPass::Update,
        }
    }

    #[tokio::test]
    async fn test_should_suspend_when_removed() {
        let api = InMemoryS3::new();
        api.create_bucket(CreateBucketInput {
            bucket: "versioned".into(),
            acl: None,
            create_bucket_configuration: None,
            object_lock_enabled_for_bucket: false,
        })
        .await
        .unwrap();

        let on = BucketConfig {
            versioning: Some(Versioning {
                enabled: true,
                mfa_delete: false,
            }),
            ..BucketConfig::default()
        };
        VersioningSync.apply(&cx(&api, &on)).await.unwrap();
        assert_eq!(
            VersioningSync.read(&cx(&api, &on)).await.unwrap(),
            FacetValue::Versioning(on.versioning)
        );

        let off = BucketConfig::default();
        VersioningSync.apply(&cx(&api, &off)).await.unwrap();
        let status = api.get_bucket_versioning("versioned").await.unwrap().status;
        assert_eq!(status, Some(BucketVersioningStatus::Suspended));
        assert_eq!(
            VersioningSync.read(&cx(&api, &off)).await.unwrap(),
            FacetValue::Versioning(None)
        );
    }

    #[test]
    fn test_should_treat_disabled_as_default() {
        let explicit = BucketConfig {
            versioning: Some(Versioning::default()),
            ..BucketConfig::default()
        };
        assert!(VersioningSync.unchanged(&BucketConfig::default(), &explicit));
    }

    fn locked(versioning: Option<Versioning>) -> BucketConfig {
        BucketConfig {
            versioning,
            object_lock: Some(ObjectLock {
                enabled: true,
                default_retention: None,
            }),
            ..BucketConfig::default()
        }
    }

    #[test]
    fn test_should_keep_versioning_on_under_object_lock() {
        let implicit = locked(None);
        assert!(is_enabled(&implicit));
        assert!(VersioningSync.unchanged(&implicit, &implicit));

        let explicit = locked(Some(Versioning {
            enabled: true,
            mfa_delete: false,
        }));
        assert!(VersioningSync.unchanged(&implicit, &explicit));
        assert!(!VersioningSync.unchanged(&BucketConfig::default(), &implicit));
    }

    #[test]
    fn test_should_reject_suspending_locked_bucket() {
        let api = InMemoryS3::new();
        let desired = locked(Some(Versioning::default()));
        let err = VersioningSync.validate(&cx(&api, &desired)).unwrap_err();
        assert!(err.to_string().contains("object lock"));
        assert!(VersioningSync.validate(&cx(&api, &locked(None))).is_ok());
    }
}
