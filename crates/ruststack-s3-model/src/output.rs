//! Response shapes of listing and batch operations.

use serde::{Deserialize, Serialize};

use crate::types::ObjectIdentifier;

/// HeadBucket response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HeadBucketOutput {
    /// Region the bucket lives in, when the endpoint reports it.
    pub bucket_region: Option<String>,
}

/// ListObjectVersions response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListObjectVersionsOutput {
    /// Object versions in this page.
    pub versions: Vec<ObjectVersion>,
    /// Delete markers in this page.
    pub delete_markers: Vec<DeleteMarkerEntry>,
    /// Whether more pages follow.
    pub is_truncated: bool,
    /// Key marker of the next page.
    pub next_key_marker: Option<String>,
    /// Version marker of the next page.
    pub next_version_id_marker: Option<String>,
}

impl ListObjectVersionsOutput {
    /// Every version and delete marker of this page as batch-delete identifiers.
    #[must_use]
    pub fn identifiers(&self) -> Vec<ObjectIdentifier> {
        self.versions
            .iter()
            .map(|v| (&v.key, &v.version_id))
            .chain(self.delete_markers.iter().map(|m| (&m.key, &m.version_id)))
            .map(|(key, version_id)| ObjectIdentifier {
                key: key.clone(),
                version_id: Some(version_id.clone()),
            })
            .collect()
    }
}

/// One object version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectVersion {
    /// Object key.
    pub key: String,
    /// Version ID (`"null"` for unversioned objects).
    pub version_id: String,
    /// Whether this is the current version.
    pub is_latest: bool,
}

/// One delete marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteMarkerEntry {
    /// Object key.
    pub key: String,
    /// Version ID of the marker.
    pub version_id: String,
    /// Whether the marker is the current version.
    pub is_latest: bool,
}

/// DeleteObjects response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteObjectsOutput {
    /// Versions removed.
    pub deleted: Vec<ObjectIdentifier>,
    /// Per-key failures.
    pub errors: Vec<DeleteObjectError>,
}

/// Per-key failure of a batch delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteObjectError {
    /// Object key.
    pub key: String,
    /// Version ID.
    pub version_id: Option<String>,
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_collect_versions_and_markers_as_identifiers() {
        let page = ListObjectVersionsOutput {
            versions: vec![ObjectVersion {
                key: "a".into(),
                version_id: "v1".into(),
                is_latest: false,
            }],
            delete_markers: vec![DeleteMarkerEntry {
                key: "a".into(),
                version_id: "m1".into(),
                is_latest: true,
            }],
            ..Default::default()
        };
        let ids = page.identifiers();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[1].version_id.as_deref(), Some("m1"));
    }
}
