//! Wire model of the S3 bucket-configuration control plane.
//!
//! Plain data shapes for every bucket facet the reconciler manages, plus the
//! error codes the control plane reports. No behaviour lives here; the
//! reconciler translates its typed desired state into these shapes and back.

pub mod error;
pub mod input;
pub mod output;
pub mod types;

pub use error::{S3Error, S3ErrorCode};
