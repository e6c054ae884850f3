//! Bucket-configuration shapes of the S3 control-plane API.
//!
//! Field names follow the API members; serde renders them in the API's
//! PascalCase so a JSON dump of any shape reads like the request it models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown enum wire value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected value.
    pub value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Returns the string value of this enum variant.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

wire_enum! {
    /// Canned ACL applied to a bucket.
    BucketCannedAcl {
        /// Owner gets full control, nobody else has access.
        Private => "private",
        /// AllUsers may read.
        PublicRead => "public-read",
        /// AllUsers may read and write.
        PublicReadWrite => "public-read-write",
        /// EC2 may read AMI bundles.
        AwsExecRead => "aws-exec-read",
        /// Authenticated users may read.
        AuthenticatedRead => "authenticated-read",
        /// The log delivery group may write.
        LogDeliveryWrite => "log-delivery-write",
    }
}

wire_enum! {
    /// Transfer acceleration state.
    BucketAccelerateStatus {
        /// Acceleration on.
        Enabled => "Enabled",
        /// Acceleration off.
        Suspended => "Suspended",
    }
}

wire_enum! {
    /// Who pays for requests and data transfer.
    Payer {
        /// The requester pays.
        Requester => "Requester",
        /// The bucket owner pays.
        BucketOwner => "BucketOwner",
    }
}

wire_enum! {
    /// Versioning state of a bucket.
    BucketVersioningStatus {
        /// Versioning on.
        Enabled => "Enabled",
        /// Versioning suspended.
        Suspended => "Suspended",
    }
}

wire_enum! {
    /// MFA delete state of a versioned bucket.
    MfaDeleteStatus {
        /// MFA delete required.
        Enabled => "Enabled",
        /// MFA delete not required.
        Disabled => "Disabled",
    }
}

wire_enum! {
    /// Whether a lifecycle rule is active.
    ExpirationStatus {
        /// Rule active.
        Enabled => "Enabled",
        /// Rule inactive.
        Disabled => "Disabled",
    }
}

wire_enum! {
    /// Storage classes a lifecycle transition may target.
    TransitionStorageClass {
        /// S3 Glacier Flexible Retrieval.
        Glacier => "GLACIER",
        /// Standard-Infrequent Access.
        StandardIa => "STANDARD_IA",
        /// One Zone-Infrequent Access.
        OnezoneIa => "ONEZONE_IA",
        /// Intelligent-Tiering.
        IntelligentTiering => "INTELLIGENT_TIERING",
        /// Glacier Deep Archive.
        DeepArchive => "DEEP_ARCHIVE",
        /// Glacier Instant Retrieval.
        GlacierIr => "GLACIER_IR",
    }
}

wire_enum! {
    /// Storage classes a replica may be stored in.
    StorageClass {
        /// Standard.
        Standard => "STANDARD",
        /// Reduced redundancy.
        ReducedRedundancy => "REDUCED_REDUNDANCY",
        /// Standard-Infrequent Access.
        StandardIa => "STANDARD_IA",
        /// One Zone-Infrequent Access.
        OnezoneIa => "ONEZONE_IA",
        /// Intelligent-Tiering.
        IntelligentTiering => "INTELLIGENT_TIERING",
        /// S3 Glacier Flexible Retrieval.
        Glacier => "GLACIER",
        /// Glacier Deep Archive.
        DeepArchive => "DEEP_ARCHIVE",
        /// Glacier Instant Retrieval.
        GlacierIr => "GLACIER_IR",
    }
}

wire_enum! {
    /// Whether a replication rule is active.
    ReplicationRuleStatus {
        /// Rule active.
        Enabled => "Enabled",
        /// Rule inactive.
        Disabled => "Disabled",
    }
}

wire_enum! {
    /// Whether delete markers are replicated.
    DeleteMarkerReplicationStatus {
        /// Delete markers replicated.
        Enabled => "Enabled",
        /// Delete markers not replicated.
        Disabled => "Disabled",
    }
}

wire_enum! {
    /// Whether SSE-KMS encrypted objects are replicated.
    SseKmsEncryptedObjectsStatus {
        /// Replicated.
        Enabled => "Enabled",
        /// Not replicated.
        Disabled => "Disabled",
    }
}

wire_enum! {
    /// Replica ownership override.
    OwnerOverride {
        /// Destination bucket owner owns the replica.
        Destination => "Destination",
    }
}

wire_enum! {
    /// Default server-side encryption algorithm.
    ServerSideEncryption {
        /// SSE-S3.
        Aes256 => "AES256",
        /// SSE-KMS.
        AwsKms => "aws:kms",
    }
}

wire_enum! {
    /// Object lock flag of a bucket.
    ObjectLockEnabled {
        /// Object lock on.
        Enabled => "Enabled",
    }
}

wire_enum! {
    /// Default retention mode for locked objects.
    ObjectLockRetentionMode {
        /// Users with special permissions may override.
        Governance => "GOVERNANCE",
        /// Nobody may override.
        Compliance => "COMPLIANCE",
    }
}

wire_enum! {
    /// Redirect protocol.
    Protocol {
        /// Plain HTTP.
        Http => "http",
        /// HTTPS.
        Https => "https",
    }
}

// ---------------------------------------------------------------------------
// Shared shapes
// ---------------------------------------------------------------------------

/// A key/value tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Create a tag.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Identifies one object version in a batch delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectIdentifier {
    /// Object key.
    pub key: String,
    /// Version ID, or `None` for the current version.
    pub version_id: Option<String>,
}

// ---------------------------------------------------------------------------
// CORS
// ---------------------------------------------------------------------------

/// One CORS rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CorsRule {
    /// Headers allowed in a preflight request.
    pub allowed_headers: Vec<String>,
    /// HTTP methods allowed.
    pub allowed_methods: Vec<String>,
    /// Origins allowed.
    pub allowed_origins: Vec<String>,
    /// Headers exposed to the browser.
    pub expose_headers: Vec<String>,
    /// Preflight cache time.
    pub max_age_seconds: Option<i32>,
}

// ---------------------------------------------------------------------------
// Website
// ---------------------------------------------------------------------------

/// Static website configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebsiteConfiguration {
    /// Index document suffix.
    pub index_document: Option<IndexDocument>,
    /// Error document key.
    pub error_document: Option<ErrorDocument>,
    /// Redirect every request to another host.
    pub redirect_all_requests_to: Option<RedirectAllRequestsTo>,
    /// Conditional redirects.
    pub routing_rules: Vec<RoutingRule>,
}

/// Index document of a website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexDocument {
    /// Suffix appended to directory requests.
    pub suffix: String,
}

/// Error document of a website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorDocument {
    /// Object key returned on 4xx errors.
    pub key: String,
}

/// Redirect-all target of a website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RedirectAllRequestsTo {
    /// Target host name, possibly followed by a path and query.
    pub host_name: String,
    /// Target protocol; absent means the protocol of the original request.
    pub protocol: Option<Protocol>,
}

/// One website routing rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoutingRule {
    /// When the redirect applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<RoutingCondition>,
    /// Where to redirect.
    pub redirect: Redirect,
}

/// Condition of a routing rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoutingCondition {
    /// HTTP error code that triggers the redirect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_error_code_returned_equals: Option<String>,
    /// Key prefix that triggers the redirect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_prefix_equals: Option<String>,
}

/// Redirect action of a routing rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Redirect {
    /// Host to redirect to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    /// HTTP redirect code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_redirect_code: Option<String>,
    /// Protocol to redirect with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    /// Replacement for the matched key prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_key_prefix_with: Option<String>,
    /// Replacement for the whole key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_key_with: Option<String>,
}

// ---------------------------------------------------------------------------
// Versioning / logging
// ---------------------------------------------------------------------------

/// Versioning configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersioningConfiguration {
    /// Versioning state; absent on a bucket that was never versioned.
    pub status: Option<BucketVersioningStatus>,
    /// MFA delete state.
    pub mfa_delete: Option<MfaDeleteStatus>,
}

/// Server access logging target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoggingEnabled {
    /// Bucket receiving the logs.
    pub target_bucket: String,
    /// Key prefix of log objects.
    pub target_prefix: String,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// One lifecycle rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleRule {
    /// Rule ID.
    pub id: Option<String>,
    /// Whether the rule is active.
    pub status: ExpirationStatus,
    /// Object filter.
    pub filter: Option<LifecycleRuleFilter>,
    /// Legacy top-level prefix.
    pub prefix: Option<String>,
    /// Current-version expiration.
    pub expiration: Option<LifecycleExpiration>,
    /// Noncurrent-version expiration.
    pub noncurrent_version_expiration: Option<NoncurrentVersionExpiration>,
    /// Current-version transitions.
    pub transitions: Vec<Transition>,
    /// Noncurrent-version transitions.
    pub noncurrent_version_transitions: Vec<NoncurrentVersionTransition>,
    /// Cleanup of incomplete multipart uploads.
    pub abort_incomplete_multipart_upload: Option<AbortIncompleteMultipartUpload>,
}

/// Lifecycle rule filter. At most one member is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleRuleFilter {
    /// Key prefix.
    pub prefix: Option<String>,
    /// Single tag.
    pub tag: Option<Tag>,
    /// Conjunction of a prefix and tags.
    pub and: Option<LifecycleRuleAndOperator>,
}

/// Conjunction of lifecycle filter predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleRuleAndOperator {
    /// Key prefix.
    pub prefix: Option<String>,
    /// Tags that must all match.
    pub tags: Vec<Tag>,
}

/// Current-version expiration. At most one member is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleExpiration {
    /// Absolute expiration instant (midnight UTC).
    pub date: Option<DateTime<Utc>>,
    /// Days after creation.
    pub days: Option<i32>,
    /// Remove expired object delete markers.
    pub expired_object_delete_marker: Option<bool>,
}

/// Noncurrent-version expiration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NoncurrentVersionExpiration {
    /// Days after becoming noncurrent.
    pub noncurrent_days: i32,
}

/// Current-version transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transition {
    /// Absolute transition instant (midnight UTC).
    pub date: Option<DateTime<Utc>>,
    /// Days after creation.
    pub days: Option<i32>,
    /// Target storage class.
    pub storage_class: TransitionStorageClass,
}

/// Noncurrent-version transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NoncurrentVersionTransition {
    /// Days after becoming noncurrent.
    pub noncurrent_days: i32,
    /// Target storage class.
    pub storage_class: TransitionStorageClass,
}

/// Incomplete multipart upload cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AbortIncompleteMultipartUpload {
    /// Days after initiation.
    pub days_after_initiation: i32,
}

// ---------------------------------------------------------------------------
// Replication
// ---------------------------------------------------------------------------

/// Replication configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationConfiguration {
    /// IAM role assumed to replicate.
    pub role: String,
    /// Replication rules.
    pub rules: Vec<ReplicationRule>,
}

/// One replication rule. Either `prefix` (V1) or `filter` (V2) is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationRule {
    /// Rule ID.
    pub id: Option<String>,
    /// Rule priority (V2 only).
    pub priority: Option<i32>,
    /// Legacy key prefix (V1 only).
    pub prefix: Option<String>,
    /// Object filter (V2 only).
    pub filter: Option<ReplicationRuleFilter>,
    /// Whether the rule is active.
    pub status: ReplicationRuleStatus,
    /// Replica destination.
    pub destination: Destination,
    /// Extra source object criteria.
    pub source_selection_criteria: Option<SourceSelectionCriteria>,
    /// Delete marker replication (V2 only).
    pub delete_marker_replication: Option<DeleteMarkerReplication>,
}

/// Replication rule filter. At most one member is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationRuleFilter {
    /// Key prefix.
    pub prefix: Option<String>,
    /// Single tag.
    pub tag: Option<Tag>,
    /// Conjunction of a prefix and tags.
    pub and: Option<ReplicationRuleAndOperator>,
}

/// Conjunction of replication filter predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationRuleAndOperator {
    /// Key prefix.
    pub prefix: Option<String>,
    /// Tags that must all match.
    pub tags: Vec<Tag>,
}

/// Replica destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Destination {
    /// Destination bucket ARN.
    pub bucket: String,
    /// Destination account, for cross-account replication.
    pub account: Option<String>,
    /// Replica storage class.
    pub storage_class: Option<StorageClass>,
    /// Replica encryption.
    pub encryption_configuration: Option<EncryptionConfiguration>,
    /// Replica ownership override.
    pub access_control_translation: Option<AccessControlTranslation>,
}

/// Replica encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptionConfiguration {
    /// KMS key used to encrypt replicas.
    pub replica_kms_key_id: String,
}

/// Replica ownership override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessControlTranslation {
    /// New replica owner.
    pub owner: OwnerOverride,
}

/// Extra source object criteria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceSelectionCriteria {
    /// SSE-KMS encrypted object selection.
    pub sse_kms_encrypted_objects: Option<SseKmsEncryptedObjects>,
}

/// SSE-KMS encrypted object selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SseKmsEncryptedObjects {
    /// Whether such objects are replicated.
    pub status: SseKmsEncryptedObjectsStatus,
}

/// Delete marker replication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteMarkerReplication {
    /// Whether delete markers are replicated.
    pub status: DeleteMarkerReplicationStatus,
}

// ---------------------------------------------------------------------------
// Encryption / object lock
// ---------------------------------------------------------------------------

/// Default encryption configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerSideEncryptionConfiguration {
    /// Encryption rules.
    pub rules: Vec<ServerSideEncryptionRule>,
}

/// One default encryption rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerSideEncryptionRule {
    /// Encryption applied to new objects.
    pub apply_server_side_encryption_by_default: Option<ServerSideEncryptionByDefault>,
}

/// Encryption applied to new objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerSideEncryptionByDefault {
    /// Algorithm.
    #[serde(rename = "SSEAlgorithm")]
    pub sse_algorithm: ServerSideEncryption,
    /// KMS key for `aws:kms`.
    #[serde(rename = "KMSMasterKeyID")]
    pub kms_master_key_id: Option<String>,
}

/// Object lock configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectLockConfiguration {
    /// Lock flag.
    pub object_lock_enabled: Option<ObjectLockEnabled>,
    /// Default retention rule.
    pub rule: Option<ObjectLockRule>,
}

/// Object lock rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectLockRule {
    /// Default retention for new objects.
    pub default_retention: Option<DefaultRetention>,
}

/// Default retention for new objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DefaultRetention {
    /// Retention mode.
    pub mode: ObjectLockRetentionMode,
    /// Retention in days.
    pub days: Option<i32>,
    /// Retention in years.
    pub years: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_wire_enum_values() {
        assert_eq!(
            "aws:kms".parse::<ServerSideEncryption>().unwrap(),
            ServerSideEncryption::AwsKms
        );
        assert_eq!(BucketCannedAcl::LogDeliveryWrite.as_str(), "log-delivery-write");
        let err = "Paused".parse::<BucketAccelerateStatus>().unwrap_err();
        assert_eq!(err.kind, "BucketAccelerateStatus");
    }

    #[test]
    fn test_should_deserialize_routing_rules_from_api_json() {
        let json = r#"[{"Condition":{"KeyPrefixEquals":"docs/"},"Redirect":{"ReplaceKeyPrefixWith":"documents/"}}]"#;
        let rules: Vec<RoutingRule> = serde_json::from_str(json).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].redirect.replace_key_prefix_with.as_deref(),
            Some("documents/")
        );
        let back = serde_json::to_string(&rules).unwrap();
        assert!(!back.contains("null"));
    }

    #[test]
    fn test_should_serialize_kms_key_with_api_member_name() {
        let by_default = ServerSideEncryptionByDefault {
            sse_algorithm: ServerSideEncryption::AwsKms,
            kms_master_key_id: Some("key".into()),
        };
        let json = serde_json::to_string(&by_default).unwrap();
        assert!(json.contains("\"KMSMasterKeyID\":\"key\""));
        assert!(json.contains("\"SSEAlgorithm\":\"aws:kms\""));
    }
}
