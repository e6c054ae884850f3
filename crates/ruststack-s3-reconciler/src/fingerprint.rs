//! Order-independent digests of nested facet records.
//!
//! Facets such as CORS rules or replication rules are sets: the caller's
//! ordering carries no meaning. Each record type writes its fields into a
//! [`FingerprintBuilder`] in a fixed order, list-valued fields are sorted
//! first, and absent fields write nothing. The CRC-32 of that canonical
//! buffer identifies the record inside one reconciliation run.
//!
//! Fingerprints are never persisted and are not collision resistant; they
//! are only compared against each other.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// CRC-32 digest of a record's canonical encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u32);

impl Fingerprint {
    /// Raw digest value.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// A record with a canonical encoding.
pub trait Fingerprinted {
    /// Write the record's fields, in declared order, into `fp`.
    fn write_fields(&self, fp: &mut FingerprintBuilder);

    /// Digest of the record.
    fn fingerprint(&self) -> Fingerprint {
        let mut builder = FingerprintBuilder::default();
        self.write_fields(&mut builder);
        builder.finish()
    }
}

fn prefixed(item: &str) -> String {
    format!("{}:{item}", item.len())
}

/// Accumulates the canonical encoding of one record.
#[derive(Debug, Default)]
pub struct FingerprintBuilder {
    buf: String,
}

impl FingerprintBuilder {
    /// Values are length-prefixed, so no choice of field contents can make
    /// two different records encode alike.
    fn field(&mut self, name: &str, value: impl fmt::Display) {
        use fmt::Write as _;
        let value = value.to_string();
        // Writing into a String cannot fail.
        let _ = write!(self.buf, "{name}={}:{value};", value.len());
    }

    /// A string field. `None` and the empty string contribute nothing.
    pub fn str(&mut self, name: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            self.field(name, v);
        }
        self
    }

    /// An integer field. `None` contributes nothing.
    pub fn int(&mut self, name: &str, value: Option<i64>) -> &mut Self {
        if let Some(v) = value {
            self.field(name, v);
        }
        self
    }

    /// A flag. `false` contributes nothing.
    pub fn flag(&mut self, name: &str, value: bool) -> &mut Self {
        if value {
            self.field(name, true);
        }
        self
    }

    /// An unordered list of strings.
    pub fn list<I, S>(&mut self, name: &str, items: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut items: Vec<String> = items.into_iter().map(|s| s.as_ref().to_owned()).collect();
        if items.is_empty() {
            return self;
        }
        items.sort_unstable();
        self.field(name, items.iter().map(|i| prefixed(i)).collect::<String>());
        self
    }

    /// A string map, encoded in key order.
    pub fn map(&mut self, name: &str, map: &BTreeMap<String, String>) -> &mut Self {
        if map.is_empty() {
            return self;
        }
        let pairs: String = map
            .iter()
            .map(|(k, v)| format!("{}{}", prefixed(k), prefixed(v)))
            .collect();
        self.field(name, pairs);
        self
    }

    /// A nested record. `None` contributes nothing.
    pub fn nested<T: Fingerprinted>(&mut self, name: &str, value: Option<&T>) -> &mut Self {
        if let Some(v) = value {
            self.field(name, v.fingerprint());
        }
        self
    }

    /// An unordered set of nested records.
    pub fn set<T: Fingerprinted>(&mut self, name: &str, items: &[T]) -> &mut Self {
        let digests = fingerprints(items);
        if digests.is_empty() {
            return self;
        }
        let joined: Vec<String> = digests.iter().map(ToString::to_string).collect();
        self.field(name, joined.join(","));
        self
    }

    /// Digest of everything written so far.
    #[must_use]
    pub fn finish(&self) -> Fingerprint {
        Fingerprint(crc32fast::hash(self.buf.as_bytes()))
    }
}

/// Distinct fingerprints of a slice of records.
#[must_use]
pub fn fingerprints<T: Fingerprinted>(items: &[T]) -> BTreeSet<Fingerprint> {
    items.iter().map(Fingerprinted::fingerprint).collect()
}

/// Whether two slices hold the same set of records.
#[must_use]
pub fn same_set<T: Fingerprinted>(a: &[T], b: &[T]) -> bool {
    fingerprints(a) == fingerprints(b)
}
