//! Reconciler error types.
//!
//! Every failure the engine surfaces is a [`ReconcileError`]. Callers that
//! need to decide what to do next (retry later, fix input, force a destroy)
//! look at [`ReconcileError::kind`], which folds variants and remote error
//! codes into the five-way [`ErrorKind`] taxonomy.
//!
//! Remote failures keep the bucket, the facet, the API operation and a JSON
//! rendering of the value that was being written, so an error message alone
//! is enough to see what the engine attempted.

use std::fmt;

use ruststack_s3_model::{S3Error, S3ErrorCode};

use crate::facets::FacetName;
use crate::orchestrator::LifecycleState;

/// Coarse classification of a reconciliation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Resource or sub-configuration absent.
    NotFound,
    /// Eventual-consistency lag or conflicting concurrent operation.
    Transient,
    /// Invalid desired state, rejected before any remote call.
    Validation,
    /// Bucket not empty on delete.
    Conflict,
    /// Anything else: malformed input, permission denial, unsupported feature.
    Permanent,
}

impl ErrorKind {
    /// Classify a remote error code.
    #[must_use]
    pub fn of(err: &S3Error) -> Self {
        match err.code {
            S3ErrorCode::NoSuchBucket
            | S3ErrorCode::NoSuchBucketPolicy
            | S3ErrorCode::NoSuchCORSConfiguration
            | S3ErrorCode::NoSuchLifecycleConfiguration
            | S3ErrorCode::NoSuchTagSet
            | S3ErrorCode::NoSuchWebsiteConfiguration
            | S3ErrorCode::ObjectLockConfigurationNotFoundError
            | S3ErrorCode::ReplicationConfigurationNotFoundError
            | S3ErrorCode::ServerSideEncryptionConfigurationNotFoundError => Self::NotFound,
            S3ErrorCode::OperationAborted
            | S3ErrorCode::SlowDown
            | S3ErrorCode::ServiceUnavailable
            | S3ErrorCode::InternalError => Self::Transient,
            S3ErrorCode::InvalidRequest if crate::retry::is_versioning_propagating(err) => {
                Self::Transient
            }
            S3ErrorCode::BucketNotEmpty
            | S3ErrorCode::BucketAlreadyExists
            | S3ErrorCode::BucketAlreadyOwnedByYou => Self::Conflict,
            _ => Self::Permanent,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "not found",
            Self::Transient => "transient",
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::Permanent => "permanent",
        })
    }
}

/// Reconciler error type.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The bucket name is not valid for the target region.
    #[error("invalid bucket name {name:?}: {reason}")]
    InvalidBucketName {
        /// The rejected name.
        name: String,
        /// Which rule it broke.
        reason: String,
    },

    /// The desired state violates a facet or cross-facet rule.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Facet or attribute at fault.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The bucket is not empty and emptying it was not authorized.
    #[error("bucket {bucket} is not empty: {message}")]
    Conflict {
        /// Bucket name.
        bucket: String,
        /// Detail.
        message: String,
    },

    /// The operation is not possible from the current lifecycle state.
    #[error("cannot {operation} a bucket in state {state}")]
    InvalidTransition {
        /// Requested operation.
        operation: &'static str,
        /// Current state.
        state: LifecycleState,
    },

    /// A control-plane call failed.
    #[error("{operation} on bucket {bucket}{} failed: {source}{}", facet_suffix(.facet), attempted_suffix(.attempted))]
    Remote {
        /// Bucket name.
        bucket: String,
        /// Facet being synchronized, if any.
        facet: Option<FacetName>,
        /// API operation name.
        operation: &'static str,
        /// JSON rendering of the value sent, if any.
        attempted: Option<String>,
        /// The remote error.
        #[source]
        source: S3Error,
    },

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn facet_suffix(facet: &Option<FacetName>) -> String {
    facet.map(|f| format!(" ({f})")).unwrap_or_default()
}

fn attempted_suffix(attempted: &Option<String>) -> String {
    attempted
        .as_ref()
        .map(|a| format!(" (attempted: {a})"))
        .unwrap_or_default()
}

impl ReconcileError {
    /// Build a validation error.
    pub fn validation(field: impl fmt::Display, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Wrap a remote error that is not tied to a facet.
    #[must_use]
    pub fn remote(bucket: &str, operation: &'static str, source: S3Error) -> Self {
        Self::Remote {
            bucket: bucket.to_owned(),
            facet: None,
            operation,
            attempted: None,
            source,
        }
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBucketName { .. }
            | Self::Validation { .. }
            | Self::InvalidTransition { .. } => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Remote { source, .. } => ErrorKind::of(source),
            Self::Internal(_) => ErrorKind::Permanent,
        }
    }

    /// The underlying remote error, if this is one.
    #[must_use]
    pub fn remote_source(&self) -> Option<&S3Error> {
        match self {
            Self::Remote { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience result type for reconciler operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use ruststack_s3_model::s3_error;

    use super::*;

    #[test]
    fn test_should_classify_remote_codes() {
        assert_eq!(ErrorKind::of(&s3_error!(NoSuchBucket)), ErrorKind::NotFound);
        assert_eq!(
            ErrorKind::of(&s3_error!(OperationAborted)),
            ErrorKind::Transient
        );
        assert_eq!(ErrorKind::of(&s3_error!(BucketNotEmpty)), ErrorKind::Conflict);
        assert_eq!(ErrorKind::of(&s3_error!(AccessDenied)), ErrorKind::Permanent);
        assert_eq!(
            ErrorKind::of(&S3Error::invalid_request(
                "Versioning must be 'Enabled' on the bucket to apply a replication configuration"
            )),
            ErrorKind::Transient
        );
        assert_eq!(
            ErrorKind::of(&S3Error::invalid_request("something else")),
            ErrorKind::Permanent
        );
    }

    #[test]
    fn test_should_render_remote_error_with_context() {
        let err = ReconcileError::Remote {
            bucket: "photos".into(),
            facet: Some(FacetName::Cors),
            operation: "PutBucketCors",
            attempted: Some("[]".into()),
            source: s3_error!(AccessDenied),
        };
        let msg = err.to_string();
        assert!(msg.contains("PutBucketCors on bucket photos (cors) failed"));
        assert!(msg.contains("attempted: []"));
        assert_eq!(err.kind(), ErrorKind::Permanent);
    }

    #[test]
    fn test_should_classify_validation_errors() {
        let err = ReconcileError::validation(FacetName::Replication, "versioning required");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "invalid replication: versioning required");
    }
}
