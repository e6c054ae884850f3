//! Cross-region replication.
//!
//! A rule with a `filter` uses the current rule schema: it carries a
//! priority and an AND-able prefix/tag filter, and delete-marker replication
//! is sent disabled. A rule without a filter uses the legacy schema, which
//! only knows a bare key prefix. Mixing the two inside one rule is rejected
//! before any call.
//!
//! Replication needs versioning on the source bucket. That is checked
//! against the desired configuration up front; the remote may still report
//! versioning as disabled for a short while after it was enabled, which is
//! retried.

use std::collections::BTreeMap;

use ruststack_core::{AccountId, Arn};
use ruststack_s3_model::types::{
    self as wire, AccessControlTranslation, DeleteMarkerReplication, DeleteMarkerReplicationStatus,
    EncryptionConfiguration, OwnerOverride, ReplicationRuleAndOperator, ReplicationRuleFilter,
    ReplicationRuleStatus, SseKmsEncryptedObjects, SseKmsEncryptedObjectsStatus, StorageClass, Tag,
};
use ruststack_s3_model::{S3Error, S3ErrorCode};
use serde::{Deserialize, Serialize};

use super::versioning;
use super::{
    BucketConfig, FacetName, FacetSynchronizer, FacetValue, SyncContext, non_empty, tolerate,
};
use crate::error::{ReconcileError, ReconcileResult};
use crate::fingerprint::{FingerprintBuilder, Fingerprinted, same_set};
use crate::retry::{is_propagation_lag, is_versioning_propagating};
use crate::validation::validate_tags;

const MAX_RULES: usize = 1000;

/// Replication configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replication {
    /// IAM role ARN assumed to replicate objects.
    pub role: String,
    /// Rules, compared as a set.
    pub rules: Vec<ReplicationRule>,
}

fn enabled() -> ReplicationRuleStatus {
    ReplicationRuleStatus::Enabled
}

/// One replication rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationRule {
    /// Rule id; assigned by the remote when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Legacy key prefix. Not allowed together with `filter`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Whether the rule is active.
    #[serde(default = "enabled")]
    pub status: ReplicationRuleStatus,
    /// Precedence among overlapping rules. Requires `filter`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    /// Objects the rule applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<ReplicationFilter>,
    /// Where replicas go.
    pub destination: Destination,
    /// Extra source objects to replicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_selection_criteria: Option<SourceSelectionCriteria>,
}

/// Prefix and tag filter of a replication rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationFilter {
    /// Object key prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Object tags; all must match.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Replication destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Destination bucket ARN.
    pub bucket: String,
    /// Storage class of replicas; the source's class when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<StorageClass>,
    /// KMS key used to encrypt replicas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_kms_key_id: Option<String>,
    /// Account owning the destination bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    /// Change replica ownership to the destination account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_control_translation: Option<OwnerOverride>,
}

/// Source objects selected in addition to the filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSelectionCriteria {
    /// Replicate objects encrypted with SSE-KMS.
    pub sse_kms_encrypted_objects: bool,
}

impl Fingerprinted for ReplicationFilter {
    fn write_fields(&self, fp: &mut FingerprintBuilder) {
        fp.str("prefix", self.prefix.as_deref()).map("tags", &self.tags);
    }
}

impl Fingerprinted for Destination {
    fn write_fields(&self, fp: &mut FingerprintBuilder) {
        fp.str("bucket", Some(self.bucket.as_str()))
            .str("storage_class", self.storage_class.map(StorageClass::as_str))
            .str("replica_kms_key_id", self.replica_kms_key_id.as_deref())
            .str("account_id", self.account_id.as_ref().map(AccountId::as_str))
            .str(
                "access_control_translation",
                self.access_control_translation.map(OwnerOverride::as_str),
            );
    }
}

impl Fingerprinted for SourceSelectionCriteria {
    fn write_fields(&self, fp: &mut FingerprintBuilder) {
        fp.flag("sse_kms_encrypted_objects", self.sse_kms_encrypted_objects);
    }
}

/// Everything but the id. A zero priority is the same as none.
impl Fingerprinted for ReplicationRule {
    fn write_fields(&self, fp: &mut FingerprintBuilder) {
        fp.str("prefix", self.prefix.as_deref())
            .str("status", Some(self.status.as_str()))
            .int(
                "priority",
                self.priority.filter(|p| *p != 0).map(i64::from),
            )
            .nested("filter", self.filter.as_ref())
            .nested("destination", Some(&self.destination))
            .nested(
                "source_selection_criteria",
                self.source_selection_criteria
                    .as_ref()
                    .filter(|c| c.sse_kms_encrypted_objects),
            );
    }
}

impl ReplicationRule {
    /// Whether the recorded rule `prior` satisfies this desired rule.
    #[must_use]
    pub fn matched_by(&self, prior: &Self) -> bool {
        let id_matches = match self.id.as_deref() {
            None | Some("") => true,
            Some(id) => prior.id.as_deref() == Some(id),
        };
        id_matches && self.fingerprint() == prior.fingerprint()
    }

    fn to_wire(&self) -> wire::ReplicationRule {
        let destination = wire::Destination {
            bucket: self.destination.bucket.clone(),
            account: self.destination.account_id.as_ref().map(ToString::to_string),
            storage_class: self.destination.storage_class,
            encryption_configuration: self.destination.replica_kms_key_id.clone().map(
                |replica_kms_key_id| EncryptionConfiguration { replica_kms_key_id },
            ),
            access_control_translation: self
                .destination
                .access_control_translation
                .map(|owner| AccessControlTranslation { owner }),
        };
        let source_selection_criteria =
            self.source_selection_criteria.map(|c| wire::SourceSelectionCriteria {
                sse_kms_encrypted_objects: Some(SseKmsEncryptedObjects {
                    status: if c.sse_kms_encrypted_objects {
                        SseKmsEncryptedObjectsStatus::Enabled
                    } else {
                        SseKmsEncryptedObjectsStatus::Disabled
                    },
                }),
            });

        let mut rule = wire::ReplicationRule {
            id: non_empty(self.id.clone()),
            priority: None,
            prefix: None,
            filter: None,
            status: self.status,
            destination,
            source_selection_criteria,
            delete_marker_replication: None,
        };

        match &self.filter {
            Some(filter) => {
                let prefix = filter.prefix.clone().unwrap_or_default();
                rule.priority = Some(self.priority.unwrap_or(0));
                rule.filter = Some(if filter.tags.is_empty() {
                    ReplicationRuleFilter {
                        prefix: Some(prefix),
                        ..ReplicationRuleFilter::default()
                    }
                } else {
                    ReplicationRuleFilter {
                        and: Some(ReplicationRuleAndOperator {
                            prefix: Some(prefix),
                            tags: filter
                                .tags
                                .iter()
                                .map(|(k, v)| Tag::new(k.as_str(), v.as_str()))
                                .collect(),
                        }),
                        ..ReplicationRuleFilter::default()
                    }
                });
                rule.delete_marker_replication = Some(DeleteMarkerReplication {
                    status: DeleteMarkerReplicationStatus::Disabled,
                });
            }
            None => rule.prefix = Some(self.prefix.clone().unwrap_or_default()),
        }
        rule
    }

    fn from_wire(rule: wire::ReplicationRule) -> Self {
        let destination = Destination {
            bucket: rule.destination.bucket,
            storage_class: rule.destination.storage_class,
            replica_kms_key_id: rule
                .destination
                .encryption_configuration
                .map(|e| e.replica_kms_key_id)
                .filter(|k| !k.is_empty()),
            account_id: rule
                .destination
                .account
                .and_then(|a| AccountId::new(a).ok()),
            access_control_translation: rule
                .destination
                .access_control_translation
                .map(|a| a.owner),
        };
        let source_selection_criteria =
            rule.source_selection_criteria.map(|c| SourceSelectionCriteria {
                sse_kms_encrypted_objects: c
                    .sse_kms_encrypted_objects
                    .is_some_and(|s| s.status == SseKmsEncryptedObjectsStatus::Enabled),
            });

        let (prefix, priority, filter) = match rule.filter {
            Some(filter) => {
                let (prefix, tags) = match filter {
                    ReplicationRuleFilter { and: Some(and), .. } => (
                        and.prefix,
                        and.tags.into_iter().map(|t| (t.key, t.value)).collect(),
                    ),
                    ReplicationRuleFilter { tag: Some(tag), .. } => {
                        (None, BTreeMap::from([(tag.key, tag.value)]))
                    }
                    ReplicationRuleFilter { prefix, .. } => (prefix, BTreeMap::new()),
                };
                (
                    None,
                    rule.priority,
                    Some(ReplicationFilter {
                        prefix: non_empty(prefix),
                        tags,
                    }),
                )
            }
            None => (non_empty(rule.prefix), None, None),
        };

        Self {
            id: non_empty(rule.id),
            prefix,
            status: rule.status,
            priority,
            filter,
            destination,
            source_selection_criteria,
        }
    }
}

fn validate_rule(i: usize, rule: &ReplicationRule) -> ReconcileResult<()> {
    let field = format!("{}.rules[{i}]", FacetName::Replication);
    let invalid = |msg: &str| Err(ReconcileError::validation(&field, msg));

    match Arn::parse(&rule.destination.bucket) {
        Ok(arn) if arn.service() == "s3" => {}
        _ => return invalid("destination bucket must be an S3 bucket ARN"),
    }

    match &rule.filter {
        Some(filter) => {
            if rule.prefix.is_some() {
                return invalid("prefix cannot be used together with filter; use filter.prefix");
            }
            validate_tags(&field, &filter.tags)?;
        }
        None => {
            if rule.priority.is_some() {
                return invalid("priority requires a filter");
            }
        }
    }

    let destination = &rule.destination;
    let sse_kms = rule
        .source_selection_criteria
        .is_some_and(|c| c.sse_kms_encrypted_objects);
    if sse_kms && destination.replica_kms_key_id.is_none() {
        return invalid("sse_kms_encrypted_objects requires destination.replica_kms_key_id");
    }
    if destination.replica_kms_key_id.is_some() && !sse_kms {
        return invalid("destination.replica_kms_key_id requires sse_kms_encrypted_objects");
    }
    if destination.access_control_translation.is_some() && destination.account_id.is_none() {
        return invalid("access_control_translation requires destination.account_id");
    }
    Ok(())
}

/// Synchronizes [`BucketConfig::replication`].
#[derive(Debug)]
pub struct ReplicationSync;

#[async_trait::async_trait]
impl FacetSynchronizer for ReplicationSync {
    fn facet(&self) -> FacetName {
        FacetName::Replication
    }

    fn validate(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        let Some(replication) = &cx.desired.replication else {
            return Ok(());
        };
        let invalid = |msg: String| Err(ReconcileError::validation(FacetName::Replication, msg));

        if !versioning::is_enabled(cx.desired) {
            return invalid("versioning must be enabled to configure replication".to_owned());
        }
        if Arn::parse(&replication.role).is_err() {
            return invalid(format!("role {:?} is not an ARN", replication.role));
        }
        if replication.rules.is_empty() {
            return invalid("at least one rule is required".to_owned());
        }
        if replication.rules.len() > MAX_RULES {
            return invalid(format!("at most {MAX_RULES} rules are allowed"));
        }
        replication
            .rules
            .iter()
            .enumerate()
            .try_for_each(|(i, rule)| validate_rule(i, rule))
    }

    fn unchanged(&self, old: &BucketConfig, new: &BucketConfig) -> bool {
        match (&old.replication, &new.replication) {
            (None, None) => true,
            (Some(prior), Some(desired)) => {
                prior.role == desired.role
                    && same_set(&prior.rules, &desired.rules)
                    && desired
                        .rules
                        .iter()
                        .all(|d| prior.rules.iter().any(|p| d.matched_by(p)))
            }
            _ => false,
        }
    }

    async fn apply(&self, cx: &SyncContext<'_>) -> ReconcileResult<()> {
        let Some(replication) = &cx.desired.replication else {
            return cx
                .api
                .delete_bucket_replication(cx.bucket)
                .await
                .map_err(|e| cx.remote(FacetName::Replication, "DeleteBucketReplication", e));
        };

        let config = wire::ReplicationConfiguration {
            role: replication.role.clone(),
            rules: replication.rules.iter().map(ReplicationRule::to_wire).collect(),
        };
        cx.api
            .put_bucket_replication(cx.bucket, config.clone())
            .await
            .map_err(|e| {
                cx.remote_with(FacetName::Replication, "PutBucketReplication", &config, e)
            })
    }

    async fn read(&self, cx: &SyncContext<'_>) -> ReconcileResult<FacetValue> {
        let config = tolerate(
            cx.api.get_bucket_replication(cx.bucket).await,
            &[S3ErrorCode::ReplicationConfigurationNotFoundError],
        )
        .map_err(|e| cx.remote(FacetName::Replication, "GetBucketReplication", e))?;

        Ok(FacetValue::Replication(config.map(|c| Replication {
            role: c.role,
            rules: c.rules.into_iter().map(ReplicationRule::from_wire).collect(),
        })))
    }

    fn is_retryable(&self, err: &S3Error) -> bool {
        is_propagation_lag(err) || is_versioning_propagating(err)
    }
}
