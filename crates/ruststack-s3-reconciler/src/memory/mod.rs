//! In-memory S3 control plane.
//!
//! [`InMemoryS3`] implements [`S3ControlPlane`] on top of a `DashMap` of
//! buckets. It answers the way the real endpoint does: unconfigured facets
//! come back as `NoSuch...` errors, replication needs versioning, object lock
//! can only be configured on a bucket created with it, and a non-empty bucket
//! refuses deletion.
//!
//! For exercising the engine's retry and degrade paths it can also
//!
//! - fail an operation once, `n` times, or persistently ([`InMemoryS3::inject_errors`]),
//! - answer an operation with `NotImplemented` ([`InMemoryS3::mark_unsupported`]),
//! - hide freshly created buckets for a number of calls ([`InMemoryS3::set_visibility_lag`]),
//! - record every call it receives ([`InMemoryS3::calls`]).

mod bucket;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::Ref;
use parking_lot::Mutex;
use ruststack_core::AwsRegion;
use ruststack_s3_model::input::{CreateBucketInput, ListObjectVersionsInput};
use ruststack_s3_model::output::{
    DeleteObjectError, DeleteObjectsOutput, HeadBucketOutput, ListObjectVersionsOutput,
};
use ruststack_s3_model::types::{
    BucketAccelerateStatus, BucketCannedAcl, BucketVersioningStatus, CorsRule, LifecycleRule,
    LoggingEnabled, ObjectIdentifier, ObjectLockConfiguration, ObjectLockEnabled, Payer,
    ReplicationConfiguration, ServerSideEncryptionConfiguration, Tag, VersioningConfiguration,
    WebsiteConfiguration,
};
use ruststack_s3_model::{S3Error, S3ErrorCode, s3_error};
use tracing::{debug, info};

use self::bucket::MemoryBucket;
use crate::client::{S3ControlPlane, S3Result};

const REPLICATION_NEEDS_VERSIONING: &str =
    "Versioning must be 'Enabled' on the bucket to apply a replication configuration";

/// One call received by [`InMemoryS3`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// API operation name, e.g. `PutBucketCors`.
    pub operation: &'static str,
    /// Target bucket.
    pub bucket: String,
}

#[derive(Debug)]
struct Fault {
    error: S3Error,
    /// `None` fails forever.
    remaining: Option<u32>,
}

/// Thread-safe in-memory S3 control plane.
pub struct InMemoryS3 {
    buckets: DashMap<String, MemoryBucket>,
    faults: DashMap<String, Fault>,
    unsupported: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
    visibility_lag: AtomicU32,
}

impl std::fmt::Debug for InMemoryS3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryS3")
            .field("bucket_count", &self.buckets.len())
            .field("fault_count", &self.faults.len())
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryS3 {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryS3 {
    /// An empty control plane.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
            faults: DashMap::new(),
            unsupported: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            visibility_lag: AtomicU32::new(0),
        }
    }

    // -- fault injection ------------------------------------------------------

    /// Fail every call of `operation` with `error`.
    pub fn inject_error(&self, operation: &str, error: S3Error) {
        self.faults.insert(
            operation.to_owned(),
            Fault {
                error,
                remaining: None,
            },
        );
    }

    /// Fail the next `times` calls of `operation` with `error`.
    pub fn inject_errors(&self, operation: &str, error: S3Error, times: u32) {
        self.faults.insert(
            operation.to_owned(),
            Fault {
                error,
                remaining: Some(times),
            },
        );
    }

    /// Remove every injected fault.
    pub fn clear_faults(&self) {
        self.faults.clear();
    }

    /// Answer `operation` with `NotImplemented`, as some S3-compatible
    /// endpoints do for facets they lack.
    pub fn mark_unsupported(&self, operation: &str) {
        self.unsupported.lock().insert(operation.to_owned());
    }

    /// Buckets created from now on answer `NoSuchBucket` to their first
    /// `calls` lookups.
    pub fn set_visibility_lag(&self, calls: u32) {
        self.visibility_lag.store(calls, Ordering::Release);
    }

    // -- call log -----------------------------------------------------------

    /// Every call received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// How often `operation` was called.
    #[must_use]
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Forget the call log.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    // -- out-of-band access ---------------------------------------------------

    /// Whether `bucket` exists, ignoring visibility lag.
    #[must_use]
    pub fn bucket_exists(&self, bucket: &str) -> bool {
        self.buckets.contains_key(bucket)
    }

    /// Write an object, returning its version id.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket` if the bucket does not exist.
    pub fn put_object(&self, bucket: &str, key: &str) -> S3Result<String> {
        let b = self.lookup(bucket)?;
        let versioned = b.is_versioned();
        Ok(b.objects.write().push(key, versioned, false))
    }

    /// Delete the current version of an object, leaving a delete marker on a
    /// versioned bucket. Returns the marker's version id.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket` if the bucket does not exist.
    pub fn delete_object(&self, bucket: &str, key: &str) -> S3Result<String> {
        let b = self.lookup(bucket)?;
        let versioned = b.is_versioned();
        Ok(b.objects.write().push(key, versioned, true))
    }

    /// Versions and delete markers stored in `bucket`.
    #[must_use]
    pub fn object_version_count(&self, bucket: &str) -> Option<usize> {
        self.buckets
            .get(bucket)
            .map(|b| b.objects.read().version_count())
    }

    /// Delete a bucket behind the engine's back, contents and all.
    pub fn remove_bucket_out_of_band(&self, bucket: &str) -> bool {
        self.buckets.remove(bucket).is_some()
    }

    // -- internals ------------------------------------------------------------

    /// Log the call and apply injected behaviour.
    fn begin(&self, operation: &'static str, bucket: &str) -> S3Result<()> {
        self.calls.lock().push(Call {
            operation,
            bucket: bucket.to_owned(),
        });
        if let Some(err) = self.take_fault(operation) {
            debug!(operation, bucket, code = %err.code, "injected fault");
            return Err(err);
        }
        if self.unsupported.lock().contains(operation) {
            return Err(S3Error::not_implemented(operation));
        }
        Ok(())
    }

    fn take_fault(&self, operation: &str) -> Option<S3Error> {
        let mut entry = self.faults.get_mut(operation)?;
        let fault = entry.value_mut();
        match &mut fault.remaining {
            None => Some(fault.error.clone()),
            Some(0) => None,
            Some(n) => {
                *n -= 1;
                Some(fault.error.clone())
            }
        }
    }

    fn lookup(&self, bucket: &str) -> S3Result<Ref<'_, String, MemoryBucket>> {
        self.buckets
            .get(bucket)
            .ok_or_else(|| S3Error::no_such_bucket(bucket))
    }

    /// Begin a call on an existing, visible bucket.
    fn enter(
        &self,
        operation: &'static str,
        bucket: &str,
    ) -> S3Result<Ref<'_, String, MemoryBucket>> {
        self.begin(operation, bucket)?;
        let b = self.lookup(bucket)?;
        if b.still_invisible() {
            return Err(S3Error::no_such_bucket(bucket));
        }
        Ok(b)
    }
}

fn not_configured(code: S3ErrorCode, bucket: &str) -> S3Error {
    S3Error::new(code).with_resource(bucket)
}

#[async_trait::async_trait]
impl S3ControlPlane for InMemoryS3 {
    async fn create_bucket(&self, input: CreateBucketInput) -> S3Result<()> {
        self.begin("CreateBucket", &input.bucket)?;
        let location = input
            .create_bucket_configuration
            .map(|c| c.location_constraint)
            .unwrap_or_default();
        if location == AwsRegion::HOME {
            return Err(s3_error!(InvalidLocationConstraint).with_resource(location));
        }

        match self.buckets.entry(input.bucket.clone()) {
            Entry::Occupied(_) => Err(S3Error::bucket_already_owned_by_you(input.bucket)),
            Entry::Vacant(slot) => {
                let bucket = MemoryBucket::new(
                    input.bucket.clone(),
                    location,
                    input.acl.unwrap_or(BucketCannedAcl::Private),
                    self.visibility_lag.load(Ordering::Acquire),
                );
                if input.object_lock_enabled_for_bucket {
                    bucket.versioning.write().status = Some(BucketVersioningStatus::Enabled);
                    *bucket.object_lock.write() = Some(ObjectLockConfiguration {
                        object_lock_enabled: Some(ObjectLockEnabled::Enabled),
                        rule: None,
                    });
                }
                slot.insert(bucket);
                info!(bucket = %input.bucket, "bucket created");
                Ok(())
            }
        }
    }

    async fn head_bucket(&self, bucket: &str) -> S3Result<HeadBucketOutput> {
        let b = self.enter("HeadBucket", bucket)?;
        Ok(HeadBucketOutput {
            bucket_region: Some(AwsRegion::from_location(&b.location).as_str().to_owned()),
        })
    }

    async fn get_bucket_location(&self, bucket: &str) -> S3Result<String> {
        let b = self.enter("GetBucketLocation", bucket)?;
        Ok(b.location.clone())
    }

    async fn delete_bucket(&self, bucket: &str) -> S3Result<()> {
        let b = self.enter("DeleteBucket", bucket)?;
        if !b.objects.read().is_empty() {
            return Err(S3Error::bucket_not_empty(bucket));
        }
        drop(b);
        self.buckets.remove(bucket);
        info!(bucket = %bucket, "bucket deleted");
        Ok(())
    }

    async fn put_bucket_acl(&self, bucket: &str, acl: BucketCannedAcl) -> S3Result<()> {
        let b = self.enter("PutBucketAcl", bucket)?;
        *b.acl.write() = acl;
        Ok(())
    }

    async fn get_bucket_tagging(&self, bucket: &str) -> S3Result<Vec<Tag>> {
        let b = self.enter("GetBucketTagging", bucket)?;
        let tags = b.tags.read().clone();
        if tags.is_empty() {
            return Err(not_configured(S3ErrorCode::NoSuchTagSet, bucket));
        }
        Ok(tags)
    }

    async fn put_bucket_tagging(&self, bucket: &str, tags: Vec<Tag>) -> S3Result<()> {
        let b = self.enter("PutBucketTagging", bucket)?;
        *b.tags.write() = tags;
        Ok(())
    }

    async fn delete_bucket_tagging(&self, bucket: &str) -> S3Result<()> {
        let b = self.enter("DeleteBucketTagging", bucket)?;
        b.tags.write().clear();
        Ok(())
    }

    async fn get_bucket_policy(&self, bucket: &str) -> S3Result<String> {
        let b = self.enter("GetBucketPolicy", bucket)?;
        let policy = b.policy.read().clone();
        policy.ok_or_else(|| not_configured(S3ErrorCode::NoSuchBucketPolicy, bucket))
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: String) -> S3Result<()> {
        let b = self.enter("PutBucketPolicy", bucket)?;
        match serde_json::from_str::<serde_json::Value>(&policy) {
            Ok(serde_json::Value::Object(_)) => {
                *b.policy.write() = Some(policy);
                Ok(())
            }
            Ok(_) => Err(S3Error::malformed_policy("Policies must be valid JSON objects")),
            Err(e) => Err(S3Error::malformed_policy(e.to_string())),
        }
    }

    async fn delete_bucket_policy(&self, bucket: &str) -> S3Result<()> {
        let b = self.enter("DeleteBucketPolicy", bucket)?;
        *b.policy.write() = None;
        Ok(())
    }

    async fn get_bucket_cors(&self, bucket: &str) -> S3Result<Vec<CorsRule>> {
        let b = self.enter("GetBucketCors", bucket)?;
        let cors = b.cors.read().clone();
        cors.ok_or_else(|| not_configured(S3ErrorCode::NoSuchCORSConfiguration, bucket))
    }

    async fn put_bucket_cors(&self, bucket: &str, rules: Vec<CorsRule>) -> S3Result<()> {
        let b = self.enter("PutBucketCors", bucket)?;
        if rules.is_empty() {
            return Err(s3_error!(MalformedXML));
        }
        *b.cors.write() = Some(rules);
        Ok(())
    }

    async fn delete_bucket_cors(&self, bucket: &str) -> S3Result<()> {
        let b = self.enter("DeleteBucketCors", bucket)?;
        *b.cors.write() = None;
        Ok(())
    }

    async fn get_bucket_website(&self, bucket: &str) -> S3Result<WebsiteConfiguration> {
        let b = self.enter("GetBucketWebsite", bucket)?;
        let website = b.website.read().clone();
        website.ok_or_else(|| not_configured(S3ErrorCode::NoSuchWebsiteConfiguration, bucket))
    }

    async fn put_bucket_website(
        &self,
        bucket: &str,
        website: WebsiteConfiguration,
    ) -> S3Result<()> {
        let b = self.enter("PutBucketWebsite", bucket)?;
        *b.website.write() = Some(website);
        Ok(())
    }

    async fn delete_bucket_website(&self, bucket: &str) -> S3Result<()> {
        let b = self.enter("DeleteBucketWebsite", bucket)?;
        *b.website.write() = None;
        Ok(())
    }

    async fn get_bucket_versioning(&self, bucket: &str) -> S3Result<VersioningConfiguration> {
        let b = self.enter("GetBucketVersioning", bucket)?;
        Ok(b.versioning.read().clone())
    }

    async fn put_bucket_versioning(
        &self,
        bucket: &str,
        versioning: VersioningConfiguration,
    ) -> S3Result<()> {
        let b = self.enter("PutBucketVersioning", bucket)?;
        let locked = b.object_lock.read().is_some();
        if locked && versioning.status != Some(BucketVersioningStatus::Enabled) {
            return Err(s3_error!(
                InvalidBucketState,
                "versioning cannot be changed on a bucket with an Object Lock configuration"
            ));
        }
        *b.versioning.write() = versioning;
        Ok(())
    }

    async fn get_bucket_logging(&self, bucket: &str) -> S3Result<Option<LoggingEnabled>> {
        let b = self.enter("GetBucketLogging", bucket)?;
        Ok(b.logging.read().clone())
    }

    async fn put_bucket_logging(
        &self,
        bucket: &str,
        logging: Option<LoggingEnabled>,
    ) -> S3Result<()> {
        let b = self.enter("PutBucketLogging", bucket)?;
        *b.logging.write() = logging;
        Ok(())
    }

    async fn get_bucket_lifecycle_configuration(
        &self,
        bucket: &str,
    ) -> S3Result<Vec<LifecycleRule>> {
        let b = self.enter("GetBucketLifecycleConfiguration", bucket)?;
        let rules = b.lifecycle.read().clone();
        rules.ok_or_else(|| not_configured(S3ErrorCode::NoSuchLifecycleConfiguration, bucket))
    }

    async fn put_bucket_lifecycle_configuration(
        &self,
        bucket: &str,
        rules: Vec<LifecycleRule>,
    ) -> S3Result<()> {
        let b = self.enter("PutBucketLifecycleConfiguration", bucket)?;
        if rules.is_empty() {
            return Err(s3_error!(MalformedXML));
        }
        *b.lifecycle.write() = Some(rules);
        Ok(())
    }

    async fn delete_bucket_lifecycle(&self, bucket: &str) -> S3Result<()> {
        let b = self.enter("DeleteBucketLifecycle", bucket)?;
        *b.lifecycle.write() = None;
        Ok(())
    }

    async fn get_bucket_accelerate_configuration(
        &self,
        bucket: &str,
    ) -> S3Result<Option<BucketAccelerateStatus>> {
        let b = self.enter("GetBucketAccelerateConfiguration", bucket)?;
        Ok(*b.accelerate.read())
    }

    async fn put_bucket_accelerate_configuration(
        &self,
        bucket: &str,
        status: BucketAccelerateStatus,
    ) -> S3Result<()> {
        let b = self.enter("PutBucketAccelerateConfiguration", bucket)?;
        if bucket.contains('.') {
            return Err(S3Error::invalid_request(
                "Transfer Acceleration is not supported for bucket names with periods",
            ));
        }
        *b.accelerate.write() = Some(status);
        Ok(())
    }

    async fn get_bucket_request_payment(&self, bucket: &str) -> S3Result<Payer> {
        let b = self.enter("GetBucketRequestPayment", bucket)?;
        Ok(*b.request_payer.read())
    }

    async fn put_bucket_request_payment(&self, bucket: &str, payer: Payer) -> S3Result<()> {
        let b = self.enter("PutBucketRequestPayment", bucket)?;
        *b.request_payer.write() = payer;
        Ok(())
    }

    async fn get_bucket_replication(&self, bucket: &str) -> S3Result<ReplicationConfiguration> {
        let b = self.enter("GetBucketReplication", bucket)?;
        let replication = b.replication.read().clone();
        replication.ok_or_else(|| {
            not_configured(S3ErrorCode::ReplicationConfigurationNotFoundError, bucket)
        })
    }

    async fn put_bucket_replication(
        &self,
        bucket: &str,
        replication: ReplicationConfiguration,
    ) -> S3Result<()> {
        let b = self.enter("PutBucketReplication", bucket)?;
        if !b.is_versioned() {
            return Err(S3Error::invalid_request(REPLICATION_NEEDS_VERSIONING));
        }
        *b.replication.write() = Some(replication);
        Ok(())
    }

    async fn delete_bucket_replication(&self, bucket: &str) -> S3Result<()> {
        let b = self.enter("DeleteBucketReplication", bucket)?;
        *b.replication.write() = None;
        Ok(())
    }

    async fn get_bucket_encryption(
        &self,
        bucket: &str,
    ) -> S3Result<ServerSideEncryptionConfiguration> {
        let b = self.enter("GetBucketEncryption", bucket)?;
        let encryption = b.encryption.read().clone();
        encryption.ok_or_else(|| {
            not_configured(
                S3ErrorCode::ServerSideEncryptionConfigurationNotFoundError,
                bucket,
            )
        })
    }

    async fn put_bucket_encryption(
        &self,
        bucket: &str,
        encryption: ServerSideEncryptionConfiguration,
    ) -> S3Result<()> {
        let b = self.enter("PutBucketEncryption", bucket)?;
        *b.encryption.write() = Some(encryption);
        Ok(())
    }

    async fn delete_bucket_encryption(&self, bucket: &str) -> S3Result<()> {
        let b = self.enter("DeleteBucketEncryption", bucket)?;
        *b.encryption.write() = None;
        Ok(())
    }

    async fn get_object_lock_configuration(
        &self,
        bucket: &str,
    ) -> S3Result<ObjectLockConfiguration> {
        let b = self.enter("GetObjectLockConfiguration", bucket)?;
        let lock = b.object_lock.read().clone();
        lock.ok_or_else(|| {
            not_configured(S3ErrorCode::ObjectLockConfigurationNotFoundError, bucket)
        })
    }

    async fn put_object_lock_configuration(
        &self,
        bucket: &str,
        configuration: ObjectLockConfiguration,
    ) -> S3Result<()> {
        let b = self.enter("PutObjectLockConfiguration", bucket)?;
        if b.object_lock.read().is_none() {
            return Err(s3_error!(
                InvalidBucketState,
                "Object Lock configuration cannot be enabled on existing buckets"
            ));
        }
        *b.object_lock.write() = Some(configuration);
        Ok(())
    }

    async fn list_object_versions(
        &self,
        input: ListObjectVersionsInput,
    ) -> S3Result<ListObjectVersionsOutput> {
        let b = self.enter("ListObjectVersions", &input.bucket)?;
        let page = b.objects.read().list(
            input.key_marker.as_deref(),
            input.version_id_marker.as_deref(),
            input.max_keys,
        );
        Ok(page)
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        objects: Vec<ObjectIdentifier>,
    ) -> S3Result<DeleteObjectsOutput> {
        let b = self.enter("DeleteObjects", bucket)?;
        let versioned = b.is_versioned();
        let mut store = b.objects.write();
        let mut output = DeleteObjectsOutput::default();
        for id in objects {
            match &id.version_id {
                Some(version_id) if store.remove_version(&id.key, version_id) => {
                    output.deleted.push(id);
                }
                Some(version_id) => output.errors.push(DeleteObjectError {
                    key: id.key.clone(),
                    version_id: Some(version_id.clone()),
                    code: "NoSuchVersion".to_owned(),
                    message: "The specified version does not exist".to_owned(),
                }),
                None => {
                    store.push(&id.key, versioned, true);
                    output.deleted.push(id);
                }
            }
        }
        debug!(
            bucket,
            deleted = output.deleted.len(),
            errors = output.errors.len(),
            "batch delete"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use ruststack_s3_model::input::CreateBucketConfiguration;

    use super::*;

    fn create(name: &str) -> CreateBucketInput {
        CreateBucketInput {
            bucket: name.to_owned(),
            acl: None,
            create_bucket_configuration: None,
            object_lock_enabled_for_bucket: false,
        }
    }

    #[tokio::test]
    async fn test_should_create_and_delete_bucket() {
        let s3 = InMemoryS3::new();
        s3.create_bucket(create("photos")).await.unwrap();
        assert!(s3.bucket_exists("photos"));
        let err = s3.create_bucket(create("photos")).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::BucketAlreadyOwnedByYou);

        s3.delete_bucket("photos").await.unwrap();
        assert!(!s3.bucket_exists("photos"));
        let err = s3.head_bucket("photos").await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::NoSuchBucket);
    }

    #[tokio::test]
    async fn test_should_reject_explicit_home_location() {
        let s3 = InMemoryS3::new();
        let mut input = create("photos");
        input.create_bucket_configuration = Some(CreateBucketConfiguration {
            location_constraint: "us-east-1".into(),
        });
        let err = s3.create_bucket(input).await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InvalidLocationConstraint);
    }

    #[tokio::test]
    async fn test_should_report_region_from_location() {
        let s3 = InMemoryS3::new();
        let mut input = create("photos");
        input.create_bucket_configuration = Some(CreateBucketConfiguration {
            location_constraint: "eu-west-1".into(),
        });
        s3.create_bucket(input).await.unwrap();
        assert_eq!(s3.get_bucket_location("photos").await.unwrap(), "eu-west-1");

        s3.create_bucket(create("home")).await.unwrap();
        assert_eq!(s3.get_bucket_location("home").await.unwrap(), "");
        let head = s3.head_bucket("home").await.unwrap();
        assert_eq!(head.bucket_region.as_deref(), Some("us-east-1"));
    }

    #[tokio::test]
    async fn test_should_report_unconfigured_facets_as_errors() {
        let s3 = InMemoryS3::new();
        s3.create_bucket(create("b")).await.unwrap();
        assert_eq!(
            s3.get_bucket_cors("b").await.unwrap_err().code,
            S3ErrorCode::NoSuchCORSConfiguration
        );
        assert_eq!(
            s3.get_bucket_tagging("b").await.unwrap_err().code,
            S3ErrorCode::NoSuchTagSet
        );
        assert_eq!(
            s3.get_object_lock_configuration("b").await.unwrap_err().code,
            S3ErrorCode::ObjectLockConfigurationNotFoundError
        );
        assert_eq!(s3.get_bucket_request_payment("b").await.unwrap(), Payer::BucketOwner);
        assert!(s3.get_bucket_logging("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_should_require_versioning_for_replication() {
        let s3 = InMemoryS3::new();
        s3.create_bucket(create("src")).await.unwrap();
        let config = ReplicationConfiguration {
            role: "arn:aws:iam::123456789012:role/r".into(),
            rules: Vec::new(),
        };
        let err = s3
            .put_bucket_replication("src", config.clone())
            .await
            .unwrap_err();
        assert!(crate::retry::is_versioning_propagating(&err));

        s3.put_bucket_versioning(
            "src",
            VersioningConfiguration {
                status: Some(BucketVersioningStatus::Enabled),
                mfa_delete: None,
            },
        )
        .await
        .unwrap();
        s3.put_bucket_replication("src", config).await.unwrap();
    }

    #[tokio::test]
    async fn test_should_reject_malformed_policy() {
        let s3 = InMemoryS3::new();
        s3.create_bucket(create("b")).await.unwrap();
        let err = s3
            .put_bucket_policy("b", "not json".into())
            .await
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::MalformedPolicy);
    }

    #[tokio::test]
    async fn test_should_refuse_deleting_non_empty_bucket() {
        let s3 = InMemoryS3::new();
        s3.create_bucket(create("b")).await.unwrap();
        s3.put_object("b", "k").unwrap();
        let err = s3.delete_bucket("b").await.unwrap_err();
        assert_eq!(err.code, S3ErrorCode::BucketNotEmpty);
    }

    #[tokio::test]
    async fn test_should_lock_versioning_of_object_lock_bucket() {
        let s3 = InMemoryS3::new();
        let mut input = create("locked");
        input.object_lock_enabled_for_bucket = true;
        s3.create_bucket(input).await.unwrap();
        let versioning = s3.get_bucket_versioning("locked").await.unwrap();
        assert_eq!(versioning.status, Some(BucketVersioningStatus::Enabled));

        let err = s3
            .put_bucket_versioning(
                "locked",
                VersioningConfiguration {
                    status: Some(BucketVersioningStatus::Suspended),
                    mfa_delete: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InvalidBucketState);

        s3.create_bucket(create("plain")).await.unwrap();
        let err = s3
            .put_object_lock_configuration("plain", ObjectLockConfiguration::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InvalidBucketState);
    }

    #[tokio::test]
    async fn test_should_fail_injected_operation_n_times() {
        let s3 = InMemoryS3::new();
        s3.create_bucket(create("b")).await.unwrap();
        s3.inject_errors("PutBucketTagging", s3_error!(OperationAborted), 2);
        let tags = vec![Tag::new("k", "v")];
        assert!(s3.put_bucket_tagging("b", tags.clone()).await.is_err());
        assert!(s3.put_bucket_tagging("b", tags.clone()).await.is_err());
        s3.put_bucket_tagging("b", tags).await.unwrap();
        assert_eq!(s3.call_count("PutBucketTagging"), 3);
    }

    #[tokio::test]
    async fn test_should_answer_unsupported_operations() {
        let s3 = InMemoryS3::new();
        s3.create_bucket(create("b")).await.unwrap();
        s3.mark_unsupported("GetBucketAccelerateConfiguration");
        let err = s3
            .get_bucket_accelerate_configuration("b")
            .await
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::NotImplemented);
    }

    #[tokio::test]
    async fn test_should_hide_new_bucket_during_visibility_lag() {
        let s3 = InMemoryS3::new();
        s3.set_visibility_lag(1);
        s3.create_bucket(create("b")).await.unwrap();
        assert_eq!(
            s3.head_bucket("b").await.unwrap_err().code,
            S3ErrorCode::NoSuchBucket
        );
        s3.head_bucket("b").await.unwrap();
    }

    #[tokio::test]
    async fn test_should_delete_versions_in_batch() {
        let s3 = InMemoryS3::new();
        s3.create_bucket(create("b")).await.unwrap();
        s3.put_bucket_versioning(
            "b",
            VersioningConfiguration {
                status: Some(BucketVersioningStatus::Enabled),
                mfa_delete: None,
            },
        )
        .await
        .unwrap();
        s3.put_object("b", "a").unwrap();
        s3.put_object("b", "a").unwrap();
        s3.delete_object("b", "a").unwrap();
        assert_eq!(s3.object_version_count("b"), Some(3));

        let page = s3
            .list_object_versions(ListObjectVersionsInput::first_page("b"))
            .await
            .unwrap();
        let mut ids = page.identifiers();
        ids.push(ObjectIdentifier {
            key: "a".into(),
            version_id: Some("missing".into()),
        });
        let out = s3.delete_objects("b", ids).await.unwrap();
        assert_eq!(out.deleted.len(), 3);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(s3.object_version_count("b"), Some(0));
        s3.delete_bucket("b").await.unwrap();
    }
}
