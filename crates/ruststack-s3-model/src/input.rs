//! Request shapes that carry more than a bucket name and one configuration.

use serde::{Deserialize, Serialize};

use crate::types::BucketCannedAcl;

/// CreateBucket request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateBucketInput {
    /// Bucket name.
    pub bucket: String,
    /// Canned ACL applied at creation.
    pub acl: Option<BucketCannedAcl>,
    /// Region constraint; absent for the home region.
    pub create_bucket_configuration: Option<CreateBucketConfiguration>,
    /// Create the bucket with object lock enabled.
    pub object_lock_enabled_for_bucket: bool,
}

/// Location of a new bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateBucketConfiguration {
    /// Target region.
    pub location_constraint: String,
}

/// ListObjectVersions request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListObjectVersionsInput {
    /// Bucket name.
    pub bucket: String,
    /// Resume after this key.
    pub key_marker: Option<String>,
    /// Resume after this version of `key_marker`.
    pub version_id_marker: Option<String>,
    /// Page size.
    pub max_keys: Option<i32>,
}

impl ListObjectVersionsInput {
    /// First page of a bucket's versions.
    #[must_use]
    pub fn first_page(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key_marker: None,
            version_id_marker: None,
            max_keys: None,
        }
    }
}
