//! Lifecycle rules.
//!
//! Rules are an ordered list. Within a rule, the transition blocks form
//! unordered sets compared by fingerprint. A desired rule without an `id`
//! gets a generated one on apply, and matches a recorded rule whatever id
//! the recorded rule carries.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use ruststack_s3_model::S3ErrorCode;
use ruststack_s3_model::types::{
    self as wire, AbortIncompleteMultipartUpload, ExpirationStatus, LifecycleRuleAndOperator,
    LifecycleRuleFilter, Tag, TransitionStorageClass,
};
use serde::{Deserialize, Serialize};

use super::{
    BucketConfig, FacetName, FacetSynchronizer, FacetValue, SyncContext, non_empty, tolerate,
};
use crate::error::{ReconcileError, ReconcileResult};
use crate::fingerprint::{FingerprintBuilder, Fingerprinted};
use crate::naming::prefixed_unique_id;
use crate::validation::{validate_at_least, validate_tags};

/// Prefix of generated lifecycle rule ids.
pub const RULE_ID_PREFIX: &str = "ruststack-s3-lifecycle-";

const MAX_RULE_ID_LEN: usize = 255;

/// One lifecycle rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleRule {
    /// Rule id; generated when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Object key prefix the rule applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Object tags the rule applies to, in addition to the prefix.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Whether the rule is active.
    pub enabled: bool,
    /// Days after which incomplete multipart uploads are aborted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_incomplete_multipart_upload_days: Option<i32>,
    /// Expiration of current versions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Expiration>,
    /// Expiration of noncurrent versions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noncurrent_version_expiration: Option<NoncurrentVersionExpiration>,
    /// Storage-class transitions of current versions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<Transition>,
    /// Storage-class transitions of noncurrent versions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub noncurrent_version_transitions: Vec<NoncurrentVersionTransition>,
}

impl Default for LifecycleRule {
    fn default() -> Self {
        Self {
            id: None,
            prefix: None,
            tags: BTreeMap::new(),
            enabled: true,
            abort_incomplete_multipart_upload_days: None,
            expiration: None,
            noncurrent_version_expiration: None,
            transitions: Vec::new(),
            noncurrent_version_transitions: Vec::new(),
        }
    }
}

/// Current-version expiration.
///
/// Only one trigger is sent: `date` wins over `days`, which wins over
/// `expired_object_delete_marker`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Expiration {
    /// Expire on this day, at midnight UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Expire this many days after creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<i32>,
    /// Remove delete markers that have no noncurrent versions left.
    pub expired_object_delete_marker: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExpirationTrigger {
    Date(NaiveDate),
    Days(i32),
    DeleteMarker,
}

impl Expiration {
    fn trigger(&self) -> Option<ExpirationTrigger> {
        if let Some(date) = self.date {
            Some(ExpirationTrigger::Date(date))
        } else if let Some(days) = self.days.filter(|d| *d > 0) {
            Some(ExpirationTrigger::Days(days))
        } else if self.expired_object_delete_marker {
            Some(ExpirationTrigger::DeleteMarker)
        } else {
            None
        }
    }

    fn to_wire(&self) -> Option<wire::LifecycleExpiration> {
        let mut out = wire::LifecycleExpiration::default();
        match self.trigger()? {
            ExpirationTrigger::Date(date) => out.date = Some(midnight_utc(date)),
            ExpirationTrigger::Days(days) => out.days = Some(days),
            ExpirationTrigger::DeleteMarker => out.expired_object_delete_marker = Some(true),
        }
        Some(out)
    }

    fn from_wire(expiration: wire::LifecycleExpiration) -> Option<Self> {
        let out = Self {
            date: expiration.date.map(|d| d.date_naive()),
            days: expiration.days,
            expired_object_delete_marker: expiration.expired_object_delete_marker.unwrap_or(false),
        };
        out.trigger().map(|_| out)
    }
}

impl Fingerprinted for Expiration {
    fn write_fields(&self, fp: &mut FingerprintBuilder) {
        match self.trigger() {
            Some(ExpirationTrigger::Date(date)) => {
                fp.str("date", Some(date.to_string().as_str()));
            }
            Some(ExpirationTrigger::Days(days)) => {
                fp.int("days", Some(i64::from(days)));
            }
            Some(ExpirationTrigger::DeleteMarker) => {
                fp.flag("expired_object_delete_marker", true);
            }
            None => {}
        }
    }
}

/// Noncurrent-version expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoncurrentVersionExpiration {
    /// Days after a version becomes noncurrent.
    pub days: i32,
}

/// Current-version storage-class transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Transition on this day, at midnight UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Transition this many days after creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<i32>,
    /// Target storage class.
    pub storage_class: TransitionStorageClass,
}

impl Fingerprinted for Transition {
    fn write_fields(&self, fp: &mut FingerprintBuilder) {
        fp.str("date", self.date.map(|d| d.to_string()).as_deref())
            .int("days", self.days.map(i64::from))
            .str("storage_class", Some(self.storage_class.as_str()));
    }
}

/// Noncurrent-version storage-class transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoncurrentVersionTransition {
    /// Days after a version becomes noncurrent.
    pub days: i32,
    /// Target storage class.
    pub storage_class: TransitionStorageClass,
}

impl Fingerprinted for NoncurrentVersionTransition {
    fn write_fields(&self, fp: &mut FingerprintBuilder) {
        fp.int("days", Some(i64::from(self.days)))
            .str("storage_class", Some(self.storage_class.as_str()));
    }
}

/// Everything but the id.
impl Fingerprinted for LifecycleRule {
    fn write_fields(&self, fp: &mut FingerprintBuilder) {
        fp.str("prefix", self.prefix.as_deref())
            .map("tags", &self.tags)
            .flag("enabled", self.enabled)
            .int(
                "abort_incomplete_multipart_upload_days",
                self.abort_incomplete_multipart_upload_days.map(i64::from),
            )
            .nested("expiration", self.expiration.as_ref())
            .int(
                "noncurrent_version_expiration",
                self.noncurrent_version_expiration.map(|e| i64::from(e.days)),
            )
            .set("transitions", &self.transitions)
            .set(
                "noncurrent_version_transitions",
                &self.noncurrent_version_transitions,
            );
    }
}

impl LifecycleRule {
    /// Whether the recorded rule `prior` satisfies this desired rule.
    #[must_use]
    pub fn matched_by(&self, prior: &Self) -> bool {
        let id_matches = match self.id.as_deref() {
            None | Some("") => true,
            Some(id) => prior.id.as_deref() == Some(id),
        };
        id_matches && self.fingerprint() == prior.fingerprint()
    }

    fn to_wire(&self) -> wire::LifecycleRule {
        let id = non_empty(self.id.clone()).unwrap_or_else(|| prefixed_unique_id(RULE_ID_PREFIX));
        let prefix = self.prefix.clone().unwrap_or_default();
        let filter = if self.tags.is_empty() {
            LifecycleRuleFilter {
                prefix: Some(prefix),
                ..LifecycleRuleFilter::default()
            }
        } else {
            LifecycleRuleFilter {
                and: Some(LifecycleRuleAndOperator {
                    prefix: Some(prefix),
                    tags: self.tags.iter().map(|(k, v)| Tag::new(k.as_str(), v.as_str())).collect(),
                }),
                ..LifecycleRuleFilter::default()
            }
        };

        wire::LifecycleRule {
            id: Some(id),
            status: if self.enabled {
                ExpirationStatus::Enabled
            } else {
                ExpirationStatus::Disabled
            },
            filter: Some(filter),
            prefix: None,
            expiration: self.expiration.as_ref().and_then(Expiration::to_wire),
            noncurrent_version_expiration: self.noncurrent_version_expiration.map(|e| {
                wire::NoncurrentVersionExpiration {
                    noncurrent_days: e.days,
                }
            }),
            transitions: self
                .transitions
                .iter()
                .map(|t| wire::Transition {
                    date: t.date.map(midnight_utc),
                    days: t.days,
                    storage_class: t.storage_class,
                })
                .collect(),
            noncurrent_version_transitions: self
                .noncurrent_version_transitions
                .iter()
                .map(|t| wire::NoncurrentVersionTransition {
                    noncurrent_days: t.days,
                    storage_class: t.storage_class,
                })
                .collect(),
            abort_incomplete_multipart_upload: self
                .abort_incomplete_multipart_upload_days
                .map(|days| AbortIncompleteMultipartUpload {
                    days_after_initiation: days,
                }),
        }
    }

    fn from_wire(rule: wire::LifecycleRule) -> Self {
        let (prefix, tags) = match rule.filter {
            Some(LifecycleRuleFilter { and: Some(and), .. }) => (
                and.prefix,
                and.tags.into_iter().map(|t| (t.key, t.value)).collect(),
            ),
            Some(LifecycleRuleFilter {
                prefix: Some(prefix),
                ..
            }) => (Some(prefix), BTreeMap::new()),
            Some(LifecycleRuleFilter { tag: Some(tag), .. }) => {
                (None, BTreeMap::from([(tag.key, tag.value)]))
            }
            _ => (rule.prefix, BTreeMap::new()),
        };

        Self {
            id: non_empty(rule.id),
            prefix: non_empty(prefix),
            tags,
            enabled: rule.status == ExpirationStatus::Enabled,
            abort_incomplete_multipart_upload_days: rule
                .abort_incomplete_multipart_upload
                .map(|a| a.days_after_initiation),
            expiration: rule.expiration.and_then(Expiration::from_wire),
            noncurrent_version_expiration: rule.noncurrent_version_expiration.map(|e| {
                NoncurrentVersionExpiration {
                    days: e.noncurrent_days,
                }
            }),
            transitions: rule
                .transitions
                .into_iter()
                .map(|t| Transition {
                    date: t.date.map(|d| d.date_naive()),
                    days: t.days,
                    storage_class: t.storage_class,
                })
                .collect(),
            noncurrent_version_transitions: rule
                .noncurrent_version_transitions
                .into_iter()
                .map(|t| NoncurrentVersionTransition {
                    days: t.noncurrent_days,
                    storage_class: t.storage_class,
                })
                .collect(),
        }
    }

    fn has_action(&self) -> bool {
        self.expiration.as_ref().is_some_and(|e| e.trigger().is_some())
            || self.noncurrent_version_expiration.is_some()
            || !self.transitions.is_empty()
            || !self.noncurrent_version_transitions.is_empty()
            || self.abort_incomplete_multipart_upload_days.is_some()
    }
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn validate_rule(i: usize, rule: &LifecycleRule) -> ReconcileResult<()> {
    let field = format!("{}[{i}]", FacetName::Lifecycle);
    let invalid = |msg: String| Err(ReconcileError::validation(&field, msg));

    if rule.id.as_ref().is_some_and(|id| id.len() > MAX_RULE_ID_LEN) {
        return invalid(format!("id exceeds {MAX_RULE_ID_LEN} characters"));
    }
    if !rule.has_action() {
        return invalid("rule has no expiration, transition or abort action".to_owned());
    }
    validate_tags(&field, &rule.tags)?;
    validate_at_least(
        &field,
        "abort_incomplete_multipart_upload_days",
        rule.abort_incomplete_multipart_upload_days,
        1,
    )?;
    if let Some(expiration) = &rule.expiration {
        validate_at_least(&field, "expiration days", expiration.days, 0)?;
    }
    validate_at_least(
        &field,
        "noncurrent_version_expiration days",
        rule.noncurrent_version_expiration.map(|e| e.days),
        1,
    )?;
    for transition in &rule.transitions {
        if transition.date.is_none() && transition.days.is_none() {
            return invalid(format!(
                "transition to {} needs a date or days",
                transition.storage_class
            ));
        }
        validate_at_least(&field, "transition days", transition.days, 0)?;
    }
    for transition in &rule.noncurrent_version_transitions {
        validate_at_least(
            &field,
            "noncurrent transition days",
            Some(transition.days),
            0,
        )?;
    }
    Ok(())
}

/// Synchronizes [`BucketConfig::lifecycle_rules`]. An empty list deletes
/// the lifecycle configuration.
#[derive(Debug)]
pub struct LifecycleSync;

#[async_trait::async_trait]
impl FacetSynchronizer for LifecycleSync {
    fn facet(&self) -> FacetName {
        FacetName::Lifecycle
    }

    fn validate(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        cx.desired
            .lifecycle_rules
            .iter()
            .enumerate()
            .try_for_each(|(i, rule)| validate_rule(i, rule))
    }

    fn unchanged(&self, old: &BucketConfig, new: &BucketConfig) -> bool {
        old.lifecycle_rules.len() == new.lifecycle_rules.len()
            && old
                .lifecycle_rules
                .iter()
                .zip(&new.lifecycle_rules)
                .all(|(prior, desired)| desired.matched_by(prior))
    }

    async fn apply(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        if cx.desired.lifecycle_rules.is_empty() {
            return cx
                .api
                .delete_bucket_lifecycle(cx.bucket)
                .await
                .map_err(|e| cx.remote(FacetName::Lifecycle, "DeleteBucketLifecycle", e));
        }

        let rules: Vec<wire::LifecycleRule> = cx
            .desired
            .lifecycle_rules
            .iter()
            .map(LifecycleRule::to_wire)
            .collect();
        cx.api
            .put_bucket_lifecycle_configuration(cx.bucket, rules.clone())
            .await
            .map_err(|e| {
                cx.remote_with(
                    FacetName::Lifecycle,
                    "PutBucketLifecycleConfiguration",
                    &rules,
                    e,
                )
            })
    }

    async fn read(&self, cx: &SyncContext<'_>) -> ReconcileResult<FacetValue> {
        let rules = tolerate(
            cx.api.get_bucket_lifecycle_configuration(cx.bucket).await,
            &[S3ErrorCode::NoSuchLifecycleConfiguration],
        )
        .map_err(|e| cx.remote(FacetName::Lifecycle, "GetBucketLifecycleConfiguration", e))?
        .unwrap_or_default();
        Ok(FacetValue::Lifecycle(
            rules.into_iter().map(LifecycleRule::from_wire).collect(),
        ))
    }
}
