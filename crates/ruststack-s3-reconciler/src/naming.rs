//! Generated identifiers for buckets and lifecycle rules.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;

/// Prefix of fully generated bucket names.
pub const UNIQUE_ID_PREFIX: &str = "ruststack-";

/// Length of the suffix [`prefixed_unique_id`] appends.
pub const UNIQUE_ID_SUFFIX_LENGTH: usize = 26;

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// A unique ID with the default prefix.
#[must_use]
pub fn unique_id() -> String {
    prefixed_unique_id(UNIQUE_ID_PREFIX)
}

/// `prefix` followed by a 26-character suffix: an 18-digit UTC timestamp
/// with 1/10000 s resolution and an 8-digit hex process counter.
///
/// The suffix only uses lowercase hex digits and decimal digits, so it is
/// valid in bucket names of every region. IDs generated by one process sort
/// in creation order.
#[must_use]
pub fn prefixed_unique_id(prefix: &str) -> String {
    let now = Utc::now();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "{prefix}{}{:04}{counter:08x}",
        now.format("%Y%m%d%H%M%S"),
        now.timestamp_subsec_micros() / 100,
    )
}
