//! Pre-flight validation of names and tags.
//!
//! Everything here runs before the first remote call, so a rejected desired
//! state never leaves a half-configured bucket behind.
//!
//! Bucket names follow two regimes. The home region still accepts the legacy
//! naming rules (up to 255 characters, uppercase letters and underscores);
//! every other region enforces DNS-compatible names.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use ruststack_core::AwsRegion;

use crate::error::{ReconcileError, ReconcileResult};
use crate::naming::UNIQUE_ID_SUFFIX_LENGTH;

/// Maximum number of tags on a bucket.
const MAX_TAGS: usize = 50;

/// Maximum length of a tag key in characters.
const MAX_TAG_KEY_LEN: usize = 128;

/// Maximum length of a tag value in characters.
const MAX_TAG_VALUE_LEN: usize = 256;

/// Minimum bucket name length outside the home region.
const MIN_BUCKET_NAME_LEN: usize = 3;

/// Maximum bucket name length outside the home region.
const MAX_BUCKET_NAME_LEN: usize = 63;

/// Maximum bucket name length in the home region.
const MAX_LEGACY_BUCKET_NAME_LEN: usize = 255;

fn is_dns_byte(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.'
}

fn is_legacy_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'.' || b == b'_'
}

fn invalid(name: &str, reason: impl Into<String>) -> ReconcileError {
    ReconcileError::InvalidBucketName {
        name: name.to_owned(),
        reason: reason.into(),
    }
}

/// Validate a bucket name for the region it will be created in.
///
/// # Examples
///
/// ```
/// use ruststack_core::AwsRegion;
/// use ruststack_s3_reconciler::validation::validate_bucket_name;
///
/// let home = AwsRegion::default();
/// let eu = AwsRegion::new("eu-west-1");
/// assert!(validate_bucket_name("Legacy_Bucket", &home).is_ok());
/// assert!(validate_bucket_name("Legacy_Bucket", &eu).is_err());
/// assert!(validate_bucket_name("ab", &eu).is_err());
/// ```
pub fn validate_bucket_name(name: &str, region: &AwsRegion) -> ReconcileResult<()> {
    if region.is_home() {
        if name.is_empty() || name.len() > MAX_LEGACY_BUCKET_NAME_LEN {
            return Err(invalid(
                name,
                format!(
                    "must be between 1 and {MAX_LEGACY_BUCKET_NAME_LEN} characters long in {}",
                    AwsRegion::HOME
                ),
            ));
        }
        if !name.bytes().all(is_legacy_byte) {
            return Err(invalid(
                name,
                "only letters, numbers, hyphens, periods and underscores are allowed",
            ));
        }
        return Ok(());
    }

    let len = name.len();
    if !(MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&len) {
        return Err(invalid(
            name,
            format!(
                "must be between {MIN_BUCKET_NAME_LEN} and {MAX_BUCKET_NAME_LEN} characters long"
            ),
        ));
    }
    if !name.bytes().all(is_dns_byte) {
        return Err(invalid(
            name,
            "only lowercase letters, numbers, hyphens and periods are allowed",
        ));
    }
    if name.parse::<Ipv4Addr>().is_ok() {
        return Err(invalid(name, "must not be formatted as an IP address"));
    }
    if name.starts_with('.') || name.ends_with('.') {
        return Err(invalid(name, "must not start or end with a period"));
    }
    if name.contains("..") {
        return Err(invalid(name, "must not contain two adjacent periods"));
    }

    Ok(())
}

/// Validate a bucket name prefix that a generated suffix will complete.
pub fn validate_bucket_prefix(prefix: &str) -> ReconcileResult<()> {
    let max = MAX_BUCKET_NAME_LEN - UNIQUE_ID_SUFFIX_LENGTH;
    if prefix.len() > max {
        return Err(ReconcileError::validation(
            "bucket_prefix",
            format!("must be at most {max} characters long, got {}", prefix.len()),
        ));
    }
    Ok(())
}

/// Validate a bucket tag set.
pub fn validate_tags(field: &str, tags: &BTreeMap<String, String>) -> ReconcileResult<()> {
    if tags.len() > MAX_TAGS {
        return Err(ReconcileError::validation(
            field,
            format!("at most {MAX_TAGS} tags are allowed, got {}", tags.len()),
        ));
    }
    for (key, value) in tags {
        validate_tag(field, key, value)?;
    }
    Ok(())
}

/// Validate one tag key and value.
pub fn validate_tag(field: &str, key: &str, value: &str) -> ReconcileResult<()> {
    if key.is_empty() {
        return Err(ReconcileError::validation(field, "tag key must not be empty"));
    }
    if key.chars().count() > MAX_TAG_KEY_LEN {
        return Err(ReconcileError::validation(
            field,
            format!("tag key {key:?} exceeds {MAX_TAG_KEY_LEN} characters"),
        ));
    }
    if key.starts_with("aws:") {
        return Err(ReconcileError::validation(
            field,
            format!("tag key {key:?} uses the reserved aws: prefix"),
        ));
    }
    if value.chars().count() > MAX_TAG_VALUE_LEN {
        return Err(ReconcileError::validation(
            field,
            format!("value of tag {key:?} exceeds {MAX_TAG_VALUE_LEN} characters"),
        ));
    }
    Ok(())
}

/// Validate an integer that must be at least `min` when present.
pub fn validate_at_least(
    field: &str,
    what: &str,
    value: Option<i32>,
    min: i32,
) -> ReconcileResult<()> {
    match value {
        Some(v) if v < min => Err(ReconcileError::validation(
            field,
            format!("{what} must be at least {min}, got {v}"),
        )),
        _ => Ok(()),
    }
}
