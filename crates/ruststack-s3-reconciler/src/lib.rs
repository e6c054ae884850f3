//! Declarative reconciliation of S3 bucket configuration for RustStack.
//!
//! Given a desired state for one bucket, made of independently configurable
//! facets (ACL, policy, CORS, website, versioning, logging, lifecycle,
//! acceleration, request payment, replication, encryption, object lock and
//! tags), the engine drives the remote bucket to match through idempotent
//! put-or-delete calls, tolerating eventual consistency and transient
//! failures of the control plane.
//!
//! # Architecture
//!
//! ```text
//! DesiredState
//!      |
//!      v
//! BucketReconciler (create / update / refresh / import / delete)
//!      |                                  |
//!      v                                  v
//! changed_facets (diff)            RecursiveDestroyer
//!      |
//!      v
//! FacetSynchronizer x 13  ── RetryPolicy ──▶ S3ControlPlane
//!      |                                        (SDK client or InMemoryS3)
//!      v
//! read pass ──▶ Arc<RecordedState>
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod destroy;
pub mod diff;
pub mod endpoints;
pub mod error;
pub mod facets;
pub mod fingerprint;
pub mod memory;
pub mod naming;
pub mod orchestrator;
pub mod retry;
pub mod state;
pub mod validation;

pub use client::S3ControlPlane;
pub use config::ReconcilerConfig;
pub use context::RunContext;
pub use error::{ErrorKind, ReconcileError, ReconcileResult};
pub use memory::InMemoryS3;
pub use orchestrator::{BucketReconciler, LifecycleState};
pub use state::{DesiredState, RecordedState};
