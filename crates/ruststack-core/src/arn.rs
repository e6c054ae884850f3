//! Amazon Resource Names.

use std::fmt;

use crate::{Partition, RustStackError, RustStackResult};

/// A parsed ARN of the form `arn:partition:service:region:account:resource`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Arn {
    partition: String,
    service: String,
    region: String,
    account: String,
    resource: String,
}

impl Arn {
    /// Parse an ARN string.
    ///
    /// # Errors
    /// Returns [`RustStackError::InvalidArn`] when the string does not have six
    /// colon-separated sections, does not start with `arn`, or has an empty
    /// partition, service or resource.
    ///
    /// ```
    /// use ruststack_core::Arn;
    ///
    /// let arn = Arn::parse("arn:aws:s3:::my-bucket").unwrap();
    /// assert_eq!(arn.service(), "s3");
    /// assert_eq!(arn.resource(), "my-bucket");
    /// assert!(Arn::parse("my-bucket").is_err());
    /// ```
    pub fn parse(value: &str) -> RustStackResult<Self> {
        let mut parts = value.splitn(6, ':');
        let invalid = || RustStackError::InvalidArn(value.to_owned());

        if parts.next() != Some("arn") {
            return Err(invalid());
        }
        let mut next = || parts.next().map(str::to_owned).ok_or_else(invalid);
        let arn = Self {
            partition: next()?,
            service: next()?,
            region: next()?,
            account: next()?,
            resource: next()?,
        };

        if arn.partition.is_empty() || arn.service.is_empty() || arn.resource.is_empty() {
            return Err(invalid());
        }
        Ok(arn)
    }

    /// ARN of an S3 bucket. Bucket ARNs carry neither region nor account.
    #[must_use]
    pub fn s3_bucket(partition: Partition, bucket: &str) -> Self {
        Self {
            partition: partition.as_str().to_owned(),
            service: "s3".to_owned(),
            region: String::new(),
            account: String::new(),
            resource: bucket.to_owned(),
        }
    }

    /// Partition section.
    #[must_use]
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Service section.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Region section (empty for global resources).
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Account section (empty for S3 buckets).
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Resource section.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account, self.resource
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_format_bucket_arn_per_partition() {
        assert_eq!(
            Arn::s3_bucket(Partition::Aws, "logs").to_string(),
            "arn:aws:s3:::logs"
        );
        assert_eq!(
            Arn::s3_bucket(Partition::AwsCn, "logs").to_string(),
            "arn:aws-cn:s3:::logs"
        );
    }

    #[test]
    fn test_should_keep_colons_inside_resource() {
        let arn = Arn::parse("arn:aws:iam::123456789012:role/replication:x").unwrap();
        assert_eq!(arn.account(), "123456789012");
        assert_eq!(arn.resource(), "role/replication:x");
        assert_eq!(arn.region(), "");
    }

    #[test]
    fn test_should_reject_truncated_arn() {
        assert!(Arn::parse("arn:aws:s3").is_err());
        assert!(Arn::parse("arn::s3:::bucket").is_err());
        assert!(Arn::parse("arn:aws:s3:::").is_err());
    }
}
