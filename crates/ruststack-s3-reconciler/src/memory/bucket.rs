//! One bucket of the in-memory control plane.
//!
//! Every facet sits behind its own `parking_lot::RwLock`, so concurrent
//! reconcilers touching different facets of one bucket never contend. The
//! object store keeps full version history, since forced destroy has to
//! page through versions and delete markers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use ruststack_s3_model::output::{DeleteMarkerEntry, ListObjectVersionsOutput, ObjectVersion};
use ruststack_s3_model::types::{
    BucketAccelerateStatus, BucketCannedAcl, BucketVersioningStatus, CorsRule, LifecycleRule,
    LoggingEnabled, ObjectLockConfiguration, Payer, ReplicationConfiguration,
    ServerSideEncryptionConfiguration, Tag, VersioningConfiguration, WebsiteConfiguration,
};

/// Version id S3 assigns to objects written while versioning is off.
pub(crate) const NULL_VERSION: &str = "null";

const DEFAULT_MAX_KEYS: usize = 1000;

/// One stored version of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredVersion {
    pub version_id: String,
    pub delete_marker: bool,
}

/// Version history per key, oldest first.
#[derive(Debug, Default)]
pub(crate) struct ObjectVersions {
    keys: BTreeMap<String, Vec<StoredVersion>>,
}

impl ObjectVersions {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn version_count(&self) -> usize {
        self.keys.values().map(Vec::len).sum()
    }

    /// Write a new current version of `key`.
    pub fn push(&mut self, key: &str, versioned: bool, delete_marker: bool) -> String {
        let history = self.keys.entry(key.to_owned()).or_default();
        let version_id = if versioned {
            uuid::Uuid::new_v4().simple().to_string()
        } else {
            history.retain(|v| v.version_id != NULL_VERSION);
            NULL_VERSION.to_owned()
        };
        if !(delete_marker && !versioned) {
            history.push(StoredVersion {
                version_id: version_id.clone(),
                delete_marker,
            });
        }
        if history.is_empty() {
            self.keys.remove(key);
        }
        version_id
    }

    /// Permanently remove one version. Returns whether it existed.
    pub fn remove_version(&mut self, key: &str, version_id: &str) -> bool {
        let Some(history) = self.keys.get_mut(key) else {
            return false;
        };
        let before = history.len();
        history.retain(|v| v.version_id != version_id);
        let removed = history.len() != before;
        if history.is_empty() {
            self.keys.remove(key);
        }
        removed
    }

    /// One page of versions and delete markers, newest version first per key.
    pub fn list(
        &self,
        key_marker: Option<&str>,
        version_id_marker: Option<&str>,
        max_keys: Option<i32>,
    ) -> ListObjectVersionsOutput {
        let limit = max_keys
            .and_then(|m| usize::try_from(m).ok())
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_MAX_KEYS);

        let all: Vec<(&str, &StoredVersion, bool)> = self
            .keys
            .iter()
            .flat_map(|(key, history)| {
                let last = history.len().saturating_sub(1);
                history
                    .iter()
                    .enumerate()
                    .rev()
                    .map(move |(i, v)| (key.as_str(), v, i == last))
            })
            .collect();

        let after_key = |marker: &str| {
            all.iter()
                .position(|(key, _, _)| *key > marker)
                .unwrap_or(all.len())
        };
        let start = match (key_marker, version_id_marker) {
            (Some(marker), Some(id)) => all
                .iter()
                .position(|(key, v, _)| *key == marker && v.version_id == id)
                .map_or_else(|| after_key(marker), |i| i + 1),
            (Some(marker), None) => after_key(marker),
            (None, _) => 0,
        };

        let page = &all[start.min(all.len())..];
        let page = &page[..limit.min(page.len())];
        let mut output = ListObjectVersionsOutput {
            is_truncated: start + page.len() < all.len(),
            ..ListObjectVersionsOutput::default()
        };
        for (key, v, is_latest) in page {
            if v.delete_marker {
                output.delete_markers.push(DeleteMarkerEntry {
                    key: (*key).to_owned(),
                    version_id: v.version_id.clone(),
                    is_latest: *is_latest,
                });
            } else {
                output.versions.push(ObjectVersion {
                    key: (*key).to_owned(),
                    version_id: v.version_id.clone(),
                    is_latest: *is_latest,
                });
            }
        }
        if output.is_truncated {
            if let Some((key, v, _)) = page.last() {
                output.next_key_marker = Some((*key).to_owned());
                output.next_version_id_marker = Some(v.version_id.clone());
            }
        }
        output
    }
}

/// A bucket and all of its configuration.
pub(crate) struct MemoryBucket {
    pub name: String,
    /// Location constraint; empty for the home region.
    pub location: String,
    pub created_at: DateTime<Utc>,
    /// Calls left before the bucket becomes visible.
    pub invisible_for: AtomicU32,

    pub acl: RwLock<BucketCannedAcl>,
    pub tags: RwLock<Vec<Tag>>,
    pub policy: RwLock<Option<String>>,
    pub cors: RwLock<Option<Vec<CorsRule>>>,
    pub website: RwLock<Option<WebsiteConfiguration>>,
    pub versioning: RwLock<VersioningConfiguration>,
    pub logging: RwLock<Option<LoggingEnabled>>,
    pub lifecycle: RwLock<Option<Vec<LifecycleRule>>>,
    pub accelerate: RwLock<Option<BucketAccelerateStatus>>,
    pub request_payer: RwLock<Payer>,
    pub replication: RwLock<Option<ReplicationConfiguration>>,
    pub encryption: RwLock<Option<ServerSideEncryptionConfiguration>>,
    pub object_lock: RwLock<Option<ObjectLockConfiguration>>,
    pub objects: RwLock<ObjectVersions>,
}

impl std::fmt::Debug for MemoryBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBucket")
            .field("name", &self.name)
            .field("location", &self.location)
            .field("created_at", &self.created_at)
            .field("versions", &self.objects.read().version_count())
            .finish_non_exhaustive()
    }
}

impl MemoryBucket {
    pub fn new(name: String, location: String, acl: BucketCannedAcl, invisible_for: u32) -> Self {
        Self {
            name,
            location,
            created_at: Utc::now(),
            invisible_for: AtomicU32::new(invisible_for),
            acl: RwLock::new(acl),
            tags: RwLock::new(Vec::new()),
            policy: RwLock::new(None),
            cors: RwLock::new(None),
            website: RwLock::new(None),
            versioning: RwLock::new(VersioningConfiguration::default()),
            logging: RwLock::new(None),
            lifecycle: RwLock::new(None),
            accelerate: RwLock::new(None),
            request_payer: RwLock::new(Payer::BucketOwner),
            replication: RwLock::new(None),
            encryption: RwLock::new(None),
            object_lock: RwLock::new(None),
            objects: RwLock::new(ObjectVersions::default()),
        }
    }

    pub fn is_versioned(&self) -> bool {
        self.versioning.read().status == Some(BucketVersioningStatus::Enabled)
    }

    /// Consume one call of the post-create visibility lag. Returns whether
    /// the bucket is still invisible.
    pub fn still_invisible(&self) -> bool {
        self.invisible_for
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}
