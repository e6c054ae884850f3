//! Error types for the RustStack core.

/// Core error type for shared AWS value types.
#[derive(Debug, thiserror::Error)]
pub enum RustStackError {
    /// Invalid AWS account ID format.
    #[error("invalid AWS account ID: {0} (must be 12-digit numeric string)")]
    InvalidAccountId(String),

    /// Malformed Amazon Resource Name.
    #[error("invalid ARN: {0}")]
    InvalidArn(String),
}

/// Convenience result type for RustStack operations.
pub type RustStackResult<T> = Result<T, RustStackError>;
