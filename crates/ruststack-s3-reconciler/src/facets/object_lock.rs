//! Object lock.
//!
//! Object lock can only be turned on when the bucket is created and never
//! turned off. Afterwards only the default-retention rule may change.

use ruststack_s3_model::S3ErrorCode;
use ruststack_s3_model::types::{
    self as wire, ObjectLockConfiguration, ObjectLockEnabled, ObjectLockRetentionMode,
    ObjectLockRule,
};
use serde::{Deserialize, Serialize};

use super::{
    BucketConfig, FacetName, FacetSynchronizer, FacetValue, SyncContext, SyncPass, tolerate,
};
use crate::error::{ReconcileError, ReconcileResult};
use crate::validation::validate_at_least;

/// Object-lock configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectLock {
    /// Whether object lock is on.
    pub enabled: bool,
    /// Retention applied to new object versions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_retention: Option<DefaultRetention>,
}

/// Default retention period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultRetention {
    /// `GOVERNANCE` or `COMPLIANCE`.
    pub mode: ObjectLockRetentionMode,
    /// Retention in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<i32>,
    /// Retention in years.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years: Option<i32>,
}

fn canonical(lock: Option<&ObjectLock>) -> Option<&ObjectLock> {
    lock.filter(|l| l.enabled || l.default_retention.is_some())
}

/// Whether `config` asks for object lock.
#[must_use]
pub fn is_enabled(config: &BucketConfig) -> bool {
    config.object_lock.as_ref().is_some_and(|l| l.enabled)
}

/// Synchronizes [`BucketConfig::object_lock`].
#[derive(Debug)]
pub struct ObjectLockSync;

#[async_trait::async_trait]
impl FacetSynchronizer for ObjectLockSync {
    fn facet(&self) -> FacetName {
        FacetName::ObjectLock
    }

    fn validate(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        let wanted = is_enabled(cx.desired);
        if let (SyncPass::Update, Some(prior)) = (cx.pass, cx.prior) {
            let had = is_enabled(prior);
            if had && !wanted {
                return Err(ReconcileError::validation(
                    FacetName::ObjectLock,
                    "object lock cannot be disabled once enabled",
                ));
            }
            if !had && wanted {
                return Err(ReconcileError::validation(
                    FacetName::ObjectLock,
                    "object lock can only be enabled at bucket creation",
                ));
            }
        }

        let Some(lock) = &cx.desired.object_lock else {
            return Ok(());
        };
        if let Some(retention) = &lock.default_retention {
            if !lock.enabled {
                return Err(ReconcileError::validation(
                    FacetName::ObjectLock,
                    "default_retention requires enabled object lock",
                ));
            }
            if retention.days.is_none() && retention.years.is_none() {
                return Err(ReconcileError::validation(
                    FacetName::ObjectLock,
                    "default_retention needs days or years",
                ));
            }
            validate_at_least(FacetName::ObjectLock.as_str(), "days", retention.days, 1)?;
            validate_at_least(FacetName::ObjectLock.as_str(), "years", retention.years, 1)?;
        }
        Ok(())
    }

    fn unchanged(&self, old: &BucketConfig, new: &BucketConfig) -> bool {
        canonical(old.object_lock.as_ref()) == canonical(new.object_lock.as_ref())
    }

    async fn apply(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        let Some(lock) = cx.desired.object_lock.as_ref().filter(|l| l.enabled) else {
            return Ok(());
        };
        let config = ObjectLockConfiguration {
            object_lock_enabled: Some(ObjectLockEnabled::Enabled),
            rule: lock.default_retention.map(|r| ObjectLockRule {
                default_retention: Some(wire::DefaultRetention {
                    mode: r.mode,
                    days: r.days,
                    years: r.years,
                }),
            }),
        };
        cx.api
            .put_object_lock_configuration(cx.bucket, config.clone())
            .await
            .map_err(|e| {
                cx.remote_with(
                    FacetName::ObjectLock,
                    "PutObjectLockConfiguration",
                    &config,
                    e,
                )
            })
    }

    async fn read(&self, cx: &SyncContext<'_>) -> ReconcileResult<FacetValue> {
        let config = tolerate(
            cx.api.get_object_lock_configuration(cx.bucket).await,
            &[S3ErrorCode::ObjectLockConfigurationNotFoundError],
        )
        .map_err(|e| cx.remote(FacetName::ObjectLock, "GetObjectLockConfiguration", e))?;

        let lock = config
            .filter(|c| c.object_lock_enabled == Some(ObjectLockEnabled::Enabled))
            .map(|c| ObjectLock {
                enabled: true,
                default_retention: c.rule.and_then(|r| r.default_retention).map(|r| {
                    DefaultRetention {
                        mode: r.mode,
                        days: r.days,
                        years: r.years,
                    }
                }),
            });
        Ok(FacetValue::ObjectLock(lock))
    }
}
