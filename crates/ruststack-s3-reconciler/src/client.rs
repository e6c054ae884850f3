//! The S3 control-plane interface the engine drives.
//!
//! The reconciler never talks HTTP itself. It is handed an implementation of
//! [`S3ControlPlane`]: an SDK-backed client in production, or
//! [`InMemoryS3`](crate::memory::InMemoryS3) in tests and local runs.
//!
//! The trait uses `#[async_trait]` because the engine stores it as
//! `Arc<dyn S3ControlPlane>` and native async trait methods are not
//! object-safe.
//!
//! "Not configured" is reported as an error (`NoSuchCORSConfiguration`,
//! `NoSuchTagSet`, ...) exactly as the real API does; translating those into
//! empty facet values is the synchronizers' job.

use std::fmt;

use ruststack_s3_model::S3Error;
use ruststack_s3_model::input::{CreateBucketInput, ListObjectVersionsInput};
use ruststack_s3_model::output::{DeleteObjectsOutput, HeadBucketOutput, ListObjectVersionsOutput};
use ruststack_s3_model::types::{
    BucketAccelerateStatus, BucketCannedAcl, CorsRule, LifecycleRule, LoggingEnabled,
    ObjectIdentifier, ObjectLockConfiguration, Payer, ReplicationConfiguration,
    ServerSideEncryptionConfiguration, Tag, VersioningConfiguration, WebsiteConfiguration,
};

/// Result of one control-plane call.
pub type S3Result<T> = Result<T, S3Error>;

/// Bucket-level operations of the S3 control plane.
#[async_trait::async_trait]
pub trait S3ControlPlane: fmt::Debug + Send + Sync {
    // -- bucket -------------------------------------------------------------

    /// Create a bucket.
    async fn create_bucket(&self, input: CreateBucketInput) -> S3Result<()>;

    /// Check that a bucket exists and is accessible.
    async fn head_bucket(&self, bucket: &str) -> S3Result<HeadBucketOutput>;

    /// Location constraint of a bucket; empty for the home region.
    async fn get_bucket_location(&self, bucket: &str) -> S3Result<String>;

    /// Delete an empty bucket.
    async fn delete_bucket(&self, bucket: &str) -> S3Result<()>;

    /// Apply a canned ACL.
    async fn put_bucket_acl(&self, bucket: &str, acl: BucketCannedAcl) -> S3Result<()>;

    // -- tagging ------------------------------------------------------------

    /// Read the bucket tag set.
    async fn get_bucket_tagging(&self, bucket: &str) -> S3Result<Vec<Tag>>;

    /// Replace the bucket tag set.
    async fn put_bucket_tagging(&self, bucket: &str, tags: Vec<Tag>) -> S3Result<()>;

    /// Remove the bucket tag set.
    async fn delete_bucket_tagging(&self, bucket: &str) -> S3Result<()>;

    // -- policy -------------------------------------------------------------

    /// Read the bucket policy document.
    async fn get_bucket_policy(&self, bucket: &str) -> S3Result<String>;

    /// Replace the bucket policy document.
    async fn put_bucket_policy(&self, bucket: &str, policy: String) -> S3Result<()>;

    /// Remove the bucket policy.
    async fn delete_bucket_policy(&self, bucket: &str) -> S3Result<()>;

    // -- cors ---------------------------------------------------------------

    /// Read the CORS rules.
    async fn get_bucket_cors(&self, bucket: &str) -> S3Result<Vec<CorsRule>>;

    /// Replace the CORS rules.
    async fn put_bucket_cors(&self, bucket: &str, rules: Vec<CorsRule>) -> S3Result<()>;

    /// Remove the CORS configuration.
    async fn delete_bucket_cors(&self, bucket: &str) -> S3Result<()>;

    // -- website ------------------------------------------------------------

    /// Read the website configuration.
    async fn get_bucket_website(&self, bucket: &str) -> S3Result<WebsiteConfiguration>;

    /// Replace the website configuration.
    async fn put_bucket_website(&self, bucket: &str, website: WebsiteConfiguration)
    -> S3Result<()>;

    /// Remove the website configuration.
    async fn delete_bucket_website(&self, bucket: &str) -> S3Result<()>;

    // -- versioning ---------------------------------------------------------

    /// Read the versioning state.
    async fn get_bucket_versioning(&self, bucket: &str) -> S3Result<VersioningConfiguration>;

    /// Change the versioning state.
    async fn put_bucket_versioning(
        &self,
        bucket: &str,
        versioning: VersioningConfiguration,
    ) -> S3Result<()>;

    // -- logging ------------------------------------------------------------

    /// Read the access-logging target, `None` when logging is off.
    async fn get_bucket_logging(&self, bucket: &str) -> S3Result<Option<LoggingEnabled>>;

    /// Set or clear the access-logging target.
    async fn put_bucket_logging(&self, bucket: &str, logging: Option<LoggingEnabled>)
    -> S3Result<()>;

    // -- lifecycle ----------------------------------------------------------

    /// Read the lifecycle rules.
    async fn get_bucket_lifecycle_configuration(&self, bucket: &str)
    -> S3Result<Vec<LifecycleRule>>;

    /// Replace the lifecycle rules.
    async fn put_bucket_lifecycle_configuration(
        &self,
        bucket: &str,
        rules: Vec<LifecycleRule>,
    ) -> S3Result<()>;

    /// Remove the lifecycle configuration.
    async fn delete_bucket_lifecycle(&self, bucket: &str) -> S3Result<()>;

    // -- acceleration / request payment --------------------------------------

    /// Read the transfer-acceleration status, `None` if it was never set.
    async fn get_bucket_accelerate_configuration(
        &self,
        bucket: &str,
    ) -> S3Result<Option<BucketAccelerateStatus>>;

    /// Set the transfer-acceleration status.
    async fn put_bucket_accelerate_configuration(
        &self,
        bucket: &str,
        status: BucketAccelerateStatus,
    ) -> S3Result<()>;

    /// Read who pays for requests.
    async fn get_bucket_request_payment(&self, bucket: &str) -> S3Result<Payer>;

    /// Set who pays for requests.
    async fn put_bucket_request_payment(&self, bucket: &str, payer: Payer) -> S3Result<()>;

    // -- replication --------------------------------------------------------

    /// Read the replication configuration.
    async fn get_bucket_replication(&self, bucket: &str) -> S3Result<ReplicationConfiguration>;

    /// Replace the replication configuration.
    async fn put_bucket_replication(
        &self,
        bucket: &str,
        replication: ReplicationConfiguration,
    ) -> S3Result<()>;

    /// Remove the replication configuration.
    async fn delete_bucket_replication(&self, bucket: &str) -> S3Result<()>;

    // -- encryption / object lock --------------------------------------------

    /// Read the default encryption configuration.
    async fn get_bucket_encryption(
        &self,
        bucket: &str,
    ) -> S3Result<ServerSideEncryptionConfiguration>;

    /// Replace the default encryption configuration.
    async fn put_bucket_encryption(
        &self,
        bucket: &str,
        encryption: ServerSideEncryptionConfiguration,
    ) -> S3Result<()>;

    /// Remove the default encryption configuration.
    async fn delete_bucket_encryption(&self, bucket: &str) -> S3Result<()>;

    /// Read the object-lock configuration.
    async fn get_object_lock_configuration(
        &self,
        bucket: &str,
    ) -> S3Result<ObjectLockConfiguration>;

    /// Replace the object-lock configuration.
    async fn put_object_lock_configuration(
        &self,
        bucket: &str,
        configuration: ObjectLockConfiguration,
    ) -> S3Result<()>;

    // -- objects (forced destroy only) ---------------------------------------

    /// List one page of object versions and delete markers.
    async fn list_object_versions(
        &self,
        input: ListObjectVersionsInput,
    ) -> S3Result<ListObjectVersionsOutput>;

    /// Delete a batch of object versions.
    async fn delete_objects(
        &self,
        bucket: &str,
        objects: Vec<ObjectIdentifier>,
    ) -> S3Result<DeleteObjectsOutput>;
}
