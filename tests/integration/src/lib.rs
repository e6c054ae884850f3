//! End-to-end tests for the S3 bucket reconciler.
//!
//! Every test drives a [`BucketReconciler`] against a fresh [`InMemoryS3`]
//! control plane, so no server or credentials are needed:
//!
//! ```text
//! cargo test -p ruststack-s3-reconciler-integration
//! ```

use std::sync::{Arc, Once};

use ruststack_s3_reconciler::{BucketReconciler, DesiredState, InMemoryS3, ReconcilerConfig};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Reconciler settings with short timeouts and backoff.
#[must_use]
pub fn fast_config() -> ReconcilerConfig {
    ReconcilerConfig::builder()
        .create_timeout_secs(10)
        .update_timeout_secs(10)
        .read_timeout_secs(10)
        .retry_initial_delay_ms(10)
        .retry_max_delay_ms(200)
        .destroy_max_passes(20)
        .build()
}

/// A fresh in-memory control plane and a reconciler bound to it.
#[must_use]
pub fn reconciler() -> (Arc<InMemoryS3>, BucketReconciler) {
    init_tracing();
    let api = Arc::new(InMemoryS3::new());
    let reconciler = BucketReconciler::new(api.clone(), fast_config());
    (api, reconciler)
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Parse a desired state from JSON, panicking on malformed test input.
#[must_use]
pub fn desired(json: serde_json::Value) -> DesiredState {
    serde_json::from_value(json).unwrap_or_else(|e| panic!("invalid desired state: {e}"))
}

mod test_destroy;
mod test_facets;
mod test_lifecycle;
mod test_plan;
