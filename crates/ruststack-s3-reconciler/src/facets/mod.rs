//! Bucket facets and their synchronizers.
//!
//! A facet is one independently configurable aspect of a bucket. The desired
//! configuration of all facets lives in one typed [`BucketConfig`]; every
//! facet has a stateless [`FacetSynchronizer`] that validates, applies and
//! reads it.
//!
//! ```text
//!            BucketConfig (desired)          BucketConfig (recorded)
//!                   │                                 ▲
//!    validate ──────┤                                 │
//!                   ▼                                 │
//!   apply: put / delete ──▶ S3ControlPlane ──▶ read ──┘
//! ```
//!
//! A facet that is absent from the desired configuration means "reset to the
//! remote default", never "leave alone".

use std::collections::BTreeMap;
use std::fmt;

use ruststack_s3_model::types::{BucketAccelerateStatus, BucketCannedAcl, Payer};
use ruststack_s3_model::{S3Error, S3ErrorCode};
use serde::{Deserialize, Serialize};

use crate::client::{S3ControlPlane, S3Result};
use crate::error::{ReconcileError, ReconcileResult};

pub mod acceleration;
pub mod acl;
pub mod cors;
pub mod encryption;
pub mod lifecycle;
pub mod logging;
pub mod object_lock;
pub mod policy;
pub mod replication;
pub mod request_payer;
pub mod tags;
pub mod versioning;
pub mod website;

pub use cors::CorsRule;
pub use encryption::Encryption;
pub use lifecycle::{
    Expiration, LifecycleRule, NoncurrentVersionExpiration, NoncurrentVersionTransition,
    Transition,
};
pub use logging::Logging;
pub use object_lock::{DefaultRetention, ObjectLock};
pub use policy::PolicyDocument;
pub use replication::{
    Destination, Replication, ReplicationFilter, ReplicationRule, SourceSelectionCriteria,
};
pub use versioning::Versioning;
pub use website::{RedirectTarget, Website};

// ---------------------------------------------------------------------------
// Facet names
// ---------------------------------------------------------------------------

/// Identifies a facet.
///
/// Declaration order is the order facets are applied in. Versioning comes
/// before replication, which the remote rejects on an unversioned bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetName {
    /// Bucket tag set.
    Tags,
    /// Bucket policy document.
    Policy,
    /// CORS rules.
    Cors,
    /// Static website hosting.
    Website,
    /// Object versioning and MFA delete.
    Versioning,
    /// Canned ACL.
    Acl,
    /// Server access logging.
    Logging,
    /// Lifecycle rules.
    Lifecycle,
    /// Transfer acceleration.
    Acceleration,
    /// Requester pays.
    RequestPayer,
    /// Cross-region replication.
    Replication,
    /// Default server-side encryption.
    Encryption,
    /// Object lock.
    ObjectLock,
}

impl FacetName {
    /// Every facet, in apply order.
    pub const ALL: [Self; 13] = [
        Self::Tags,
        Self::Policy,
        Self::Cors,
        Self::Website,
        Self::Versioning,
        Self::Acl,
        Self::Logging,
        Self::Lifecycle,
        Self::Acceleration,
        Self::RequestPayer,
        Self::Replication,
        Self::Encryption,
        Self::ObjectLock,
    ];

    /// Snake-case name, as used in desired-state documents.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tags => "tags",
            Self::Policy => "policy",
            Self::Cors => "cors",
            Self::Website => "website",
            Self::Versioning => "versioning",
            Self::Acl => "acl",
            Self::Logging => "logging",
            Self::Lifecycle => "lifecycle",
            Self::Acceleration => "acceleration",
            Self::RequestPayer => "request_payer",
            Self::Replication => "replication",
            Self::Encryption => "encryption",
            Self::ObjectLock => "object_lock",
        }
    }
}

impl fmt::Display for FacetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Bucket configuration
// ---------------------------------------------------------------------------

/// Desired or recorded configuration of every facet of one bucket.
///
/// Unset fields are the remote defaults. Field names are those accepted in
/// desired-state JSON documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    /// Canned ACL; `private` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<BucketCannedAcl>,
    /// Bucket policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyDocument>,
    /// CORS rules, compared as a set.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cors_rules: Vec<CorsRule>,
    /// Static website hosting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<Website>,
    /// Versioning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versioning: Option<Versioning>,
    /// Server access logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<Logging>,
    /// Lifecycle rules, compared in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lifecycle_rules: Vec<LifecycleRule>,
    /// Transfer acceleration; `Suspended` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceleration_status: Option<BucketAccelerateStatus>,
    /// Requester pays; `BucketOwner` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_payer: Option<Payer>,
    /// Replication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication: Option<Replication>,
    /// Default encryption.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_side_encryption: Option<Encryption>,
    /// Object lock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_lock: Option<ObjectLock>,
    /// Bucket tags.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl BucketConfig {
    /// Store a value read back from the remote.
    pub fn set(&mut self, value: FacetValue) {
        match value {
            FacetValue::Tags(v) => self.tags = v,
            FacetValue::Policy(v) => self.policy = v,
            FacetValue::Cors(v) => self.cors_rules = v,
            FacetValue::Website(v) => self.website = v,
            FacetValue::Versioning(v) => self.versioning = v,
            FacetValue::Acl(v) => self.acl = v,
            FacetValue::Logging(v) => self.logging = v,
            FacetValue::Lifecycle(v) => self.lifecycle_rules = v,
            FacetValue::Acceleration(v) => self.acceleration_status = v,
            FacetValue::RequestPayer(v) => self.request_payer = v,
            FacetValue::Replication(v) => self.replication = v,
            FacetValue::Encryption(v) => self.server_side_encryption = v,
            FacetValue::ObjectLock(v) => self.object_lock = v,
        }
    }

    /// Whether `facet` differs from its remote default.
    #[must_use]
    pub fn is_present(&self, facet: FacetName) -> bool {
        !synchronizer(facet).unchanged(&Self::default(), self)
    }

    /// Whether `facet` has the same canonical value in `old` and `new`.
    #[must_use]
    pub fn equivalent(facet: FacetName, old: &Self, new: &Self) -> bool {
        synchronizer(facet).unchanged(old, new)
    }
}

/// The value of one facet, as produced by a read.
#[derive(Debug, Clone, PartialEq)]
pub enum FacetValue {
    /// Tag map.
    Tags(BTreeMap<String, String>),
    /// Policy document.
    Policy(Option<PolicyDocument>),
    /// CORS rules.
    Cors(Vec<CorsRule>),
    /// Website hosting.
    Website(Option<Website>),
    /// Versioning.
    Versioning(Option<Versioning>),
    /// Canned ACL.
    Acl(Option<BucketCannedAcl>),
    /// Access logging.
    Logging(Option<Logging>),
    /// Lifecycle rules.
    Lifecycle(Vec<LifecycleRule>),
    /// Acceleration status.
    Acceleration(Option<BucketAccelerateStatus>),
    /// Request payer.
    RequestPayer(Option<Payer>),
    /// Replication.
    Replication(Option<Replication>),
    /// Default encryption.
    Encryption(Option<Encryption>),
    /// Object lock.
    ObjectLock(Option<ObjectLock>),
}

impl FacetValue {
    /// The facet this value belongs to.
    #[must_use]
    pub fn name(&self) -> FacetName {
        match self {
            Self::Tags(_) => FacetName::Tags,
            Self::Policy(_) => FacetName::Policy,
            Self::Cors(_) => FacetName::Cors,
            Self::Website(_) => FacetName::Website,
            Self::Versioning(_) => FacetName::Versioning,
            Self::Acl(_) => FacetName::Acl,
            Self::Logging(_) => FacetName::Logging,
            Self::Lifecycle(_) => FacetName::Lifecycle,
            Self::Acceleration(_) => FacetName::Acceleration,
            Self::RequestPayer(_) => FacetName::RequestPayer,
            Self::Replication(_) => FacetName::Replication,
            Self::Encryption(_) => FacetName::Encryption,
            Self::ObjectLock(_) => FacetName::ObjectLock,
        }
    }

    /// The remote default of `facet`.
    #[must_use]
    pub fn empty(facet: FacetName) -> Self {
        match facet {
            FacetName::Tags => Self::Tags(BTreeMap::new()),
            FacetName::Policy => Self::Policy(None),
            FacetName::Cors => Self::Cors(Vec::new()),
            FacetName::Website => Self::Website(None),
            FacetName::Versioning => Self::Versioning(None),
            FacetName::Acl => Self::Acl(None),
            FacetName::Logging => Self::Logging(None),
            FacetName::Lifecycle => Self::Lifecycle(Vec::new()),
            FacetName::Acceleration => Self::Acceleration(None),
            FacetName::RequestPayer => Self::RequestPayer(None),
            FacetName::Replication => Self::Replication(None),
            FacetName::Encryption => Self::Encryption(None),
            FacetName::ObjectLock => Self::ObjectLock(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Synchronizers
// ---------------------------------------------------------------------------

/// Which sync pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPass {
    /// The pass that directly follows bucket creation.
    Create,
    /// Any later pass.
    Update,
}

/// Everything a synchronizer sees during one pass.
#[derive(Debug, Clone, Copy)]
pub struct SyncContext<'a> {
    /// Control plane.
    pub api: &'a dyn S3ControlPlane,
    /// Bucket name.
    pub bucket: &'a str,
    /// Desired configuration. Read-only.
    pub desired: &'a BucketConfig,
    /// Configuration recorded by the previous read, if any.
    pub prior: Option<&'a BucketConfig>,
    /// Current pass.
    pub pass: SyncPass,
}

impl SyncContext<'_> {
    /// Wrap a failed call that wrote `attempted`.
    pub fn remote_with<T: Serialize + ?Sized>(
        &self,
        facet: FacetName,
        operation: &'static str,
        attempted: &T,
        source: S3Error,
    ) -> ReconcileError {
        ReconcileError::Remote {
            bucket: self.bucket.to_owned(),
            facet: Some(facet),
            operation,
            attempted: serde_json::to_string(attempted).ok(),
            source,
        }
    }

    /// Wrap a failed call that carried no value.
    #[must_use]
    pub fn remote(
        &self,
        facet: FacetName,
        operation: &'static str,
        source: S3Error,
    ) -> ReconcileError {
        ReconcileError::Remote {
            bucket: self.bucket.to_owned(),
            facet: Some(facet),
            operation,
            attempted: None,
            source,
        }
    }
}

/// Validates, applies and reads one facet.
///
/// Implementations are stateless; everything they need is in the
/// [`SyncContext`].
#[async_trait::async_trait]
pub trait FacetSynchronizer: fmt::Debug + Send + Sync {
    /// The facet handled.
    fn facet(&self) -> FacetName;

    /// Check the desired value without calling the remote.
    fn validate(&self, _cx: &SyncContext<'_>) -> ReconcileResult<()> {
        Ok(())
    }

    /// Whether `old` and `new` hold the same canonical value of this facet.
    fn unchanged(&self, old: &BucketConfig, new: &BucketConfig) -> bool;

    /// Put or delete the facet so the remote matches the desired value.
    async fn apply(&self, cx: &SyncContext<'_>) -> ReconcileResult<()>;

    /// Read the facet back in canonical form.
    async fn read(&self, cx: &SyncContext<'_>) -> ReconcileResult<FacetValue>;

    /// Whether a failed apply should be retried.
    fn is_retryable(&self, err: &S3Error) -> bool {
        crate::retry::is_propagation_lag(err)
    }
}

/// The synchronizer of `facet`.
#[must_use]
pub fn synchronizer(facet: FacetName) -> &'static dyn FacetSynchronizer {
    match facet {
        FacetName::Tags => &tags::TagsSync,
        FacetName::Policy => &policy::PolicySync,
        FacetName::Cors => &cors::CorsSync,
        FacetName::Website => &website::WebsiteSync,
        FacetName::Versioning => &versioning::VersioningSync,
        FacetName::Acl => &acl::AclSync,
        FacetName::Logging => &logging::LoggingSync,
        FacetName::Lifecycle => &lifecycle::LifecycleSync,
        FacetName::Acceleration => &acceleration::AccelerationSync,
        FacetName::RequestPayer => &request_payer::RequestPayerSync,
        FacetName::Replication => &replication::ReplicationSync,
        FacetName::Encryption => &encryption::EncryptionSync,
        FacetName::ObjectLock => &object_lock::ObjectLockSync,
    }
}

/// Map "not configured" error codes to `None`.
pub(crate) fn tolerate<T>(result: S3Result<T>, absent: &[S3ErrorCode]) -> S3Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if absent.contains(&err.code) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Treat an empty string as unset.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
