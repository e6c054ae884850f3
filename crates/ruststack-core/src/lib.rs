//! Core types shared by the RustStack reconciler crates.
//!
//! This crate provides the AWS value types every other crate speaks in:
//! regions and their partitions, account IDs, and ARNs.

mod arn;
mod error;
mod types;

pub use arn::Arn;
pub use error::{RustStackError, RustStackResult};
pub use types::{AccountId, AwsRegion, Partition};
