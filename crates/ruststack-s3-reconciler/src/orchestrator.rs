//! The bucket lifecycle state machine.
//!
//! ```text
//!   Absent ──create──▶ Creating ──▶ SyncingFacets ──▶ Ready
//!     ▲                                   ▲             │
//!     │                                   └───update────┘
//!     │
//!     └──────────── Deleting ◀──delete── Creating | SyncingFacets | Ready
//! ```
//!
//! A [`BucketReconciler`] drives one bucket. Every create, update and import
//! ends with a read pass whose result replaces the recorded state wholesale.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use ruststack_core::{Arn, AwsRegion};
use ruststack_s3_model::S3ErrorCode;
use ruststack_s3_model::input::{CreateBucketConfiguration, CreateBucketInput};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::S3ControlPlane;
use crate::config::ReconcilerConfig;
use crate::context::RunContext;
use crate::destroy::RecursiveDestroyer;
use crate::diff::changed_facets;
use crate::endpoints;
use crate::error::{ReconcileError, ReconcileResult};
use crate::facets::{
    BucketConfig, FacetName, FacetValue, SyncContext, SyncPass, object_lock, synchronizer,
};
use crate::retry;
use crate::state::{BucketNaming, DesiredState, RecordedState};
use crate::validation::validate_bucket_name;

/// Lifecycle state of the managed bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// No bucket is managed.
    Absent,
    /// The create call is in flight.
    Creating,
    /// Facets are being applied. A reconciler stays here when a pass fails.
    SyncingFacets,
    /// The recorded state reflects the remote bucket.
    Ready,
    /// The bucket is being destroyed.
    Deleting,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absent => "absent",
            Self::Creating => "creating",
            Self::SyncingFacets => "syncing-facets",
            Self::Ready => "ready",
            Self::Deleting => "deleting",
        })
    }
}

/// Error codes of a read that the endpoint does not offer.
const UNSUPPORTED_READ: [S3ErrorCode; 3] = [
    S3ErrorCode::NotImplemented,
    S3ErrorCode::MethodNotAllowed,
    S3ErrorCode::UnsupportedArgument,
];

/// What a sync pass would do, computed without remote calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Bucket name; `None` until a generated name is drawn at creation.
    pub bucket: Option<String>,
    /// Target region.
    pub region: AwsRegion,
    /// Pass that would run.
    pub pass: SyncPass,
    /// Facets that would be applied, in apply order.
    pub changed: BTreeSet<FacetName>,
}

/// The bucket being managed.
#[derive(Debug, Clone)]
struct Managed {
    bucket: String,
    /// Last desired state handed to create or update.
    desired: DesiredState,
}

/// Reconciles one bucket against successive desired states.
///
/// ```
/// use std::sync::Arc;
///
/// use ruststack_s3_reconciler::config::ReconcilerConfig;
/// use ruststack_s3_reconciler::context::RunContext;
/// use ruststack_s3_reconciler::facets::{BucketConfig, Versioning};
/// use ruststack_s3_reconciler::memory::InMemoryS3;
/// use ruststack_s3_reconciler::orchestrator::{BucketReconciler, LifecycleState};
/// use ruststack_s3_reconciler::state::DesiredState;
///
/// # tokio_test::block_on(async {
/// let mut reconciler = BucketReconciler::new(Arc::new(InMemoryS3::new()), ReconcilerConfig::default());
/// let config = BucketConfig {
///     versioning: Some(Versioning { enabled: true, mfa_delete: false }),
///     ..BucketConfig::default()
/// };
/// let recorded = reconciler
///     .create(&RunContext::new(), DesiredState::named("photos", config))
///     .await
///     .unwrap();
/// assert_eq!(recorded.arn, "arn:aws:s3:::photos");
/// assert_eq!(reconciler.state(), LifecycleState::Ready);
/// # });
/// ```
#[derive(Debug)]
pub struct BucketReconciler {
    api: Arc<dyn S3ControlPlane>,
    config: ReconcilerConfig,
    state: LifecycleState,
    managed: Option<Managed>,
    recorded: Option<Arc<RecordedState>>,
}

impl BucketReconciler {
    /// A reconciler managing no bucket yet.
    #[must_use]
    pub fn new(api: Arc<dyn S3ControlPlane>, config: ReconcilerConfig) -> Self {
        Self {
            api,
            config,
            state: LifecycleState::Absent,
            managed: None,
            recorded: None,
        }
    }

    /// A reconciler picking up a bucket whose state was recorded earlier.
    ///
    /// The recorded configuration stands in for the last desired state until
    /// the next update.
    #[must_use]
    pub fn resume(
        api: Arc<dyn S3ControlPlane>,
        config: ReconcilerConfig,
        recorded: RecordedState,
    ) -> Self {
        let desired = DesiredState {
            bucket: Some(recorded.bucket.clone()),
            region: Some(recorded.region.clone()),
            force_destroy: recorded.force_destroy,
            config: recorded.config.clone(),
            ..DesiredState::default()
        };
        Self {
            api,
            config,
            state: LifecycleState::Ready,
            managed: Some(Managed {
                bucket: recorded.bucket.clone(),
                desired,
            }),
            recorded: Some(Arc::new(recorded)),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Name of the managed bucket.
    #[must_use]
    pub fn bucket(&self) -> Option<&str> {
        self.managed.as_ref().map(|m| m.bucket.as_str())
    }

    /// Result of the last successful read pass.
    #[must_use]
    pub fn recorded(&self) -> Option<Arc<RecordedState>> {
        self.recorded.clone()
    }

    /// Validate `desired` and report the facets the next pass would apply.
    ///
    /// # Errors
    ///
    /// The same validation errors [`create`](Self::create) or
    /// [`update`](Self::update) would return before their first remote call.
    pub fn plan(&self, desired: &DesiredState) -> ReconcileResult<Plan> {
        let (bucket, region, pass) = match &self.managed {
            None => {
                let bucket = match desired.naming()? {
                    BucketNaming::Named(name) => Some(name),
                    BucketNaming::Prefixed(_) | BucketNaming::Generated => None,
                };
                let region = self.region_of(desired);
                if let Some(name) = &bucket {
                    validate_bucket_name(name, &region)?;
                }
                (bucket, region, SyncPass::Create)
            }
            Some(managed) => {
                let region = self
                    .recorded
                    .as_ref()
                    .map_or_else(|| self.region_of(&managed.desired), |r| r.region.clone());
                (Some(managed.bucket.clone()), region, SyncPass::Update)
            }
        };
        let prior = self.recorded.as_ref().map(|r| &r.config);
        let name = bucket.as_deref().unwrap_or_default();
        self.validate_facets(name, &desired.config, prior, pass)?;
        Ok(Plan {
            changed: changed_facets(prior, &desired.config, pass),
            bucket,
            region,
            pass,
        })
    }

    /// Create the bucket described by `desired` and bring every facet in line.
    ///
    /// # Errors
    ///
    /// Validation errors before any remote call; the create error if the
    /// bucket could not be created (the reconciler stays
    /// [`LifecycleState::Absent`]); the first facet error otherwise, leaving
    /// the reconciler in [`LifecycleState::SyncingFacets`].
    pub async fn create(
        &mut self,
        cx: &RunContext,
        desired: DesiredState,
    ) -> ReconcileResult<Arc<RecordedState>> {
        self.expect_state("create", &[LifecycleState::Absent])?;

        let bucket = desired.naming()?.resolve();
        let region = self.region_of(&desired);
        validate_bucket_name(&bucket, &region)?;
        self.validate_facets(&bucket, &desired.config, None, SyncPass::Create)?;

        self.state = LifecycleState::Creating;
        info!(bucket = %bucket, region = %region, "creating bucket");
        let input = CreateBucketInput {
            bucket: bucket.clone(),
            acl: desired.config.acl,
            create_bucket_configuration: (!region.is_home()).then(|| CreateBucketConfiguration {
                location_constraint: region.as_str().to_owned(),
            }),
            object_lock_enabled_for_bucket: object_lock::is_enabled(&desired.config),
        };
        let api = self.api.as_ref();
        let created = self
            .config
            .create_retry()
            .run(cx, "CreateBucket", retry::is_operation_aborted, || {
                api.create_bucket(input.clone())
            })
            .await;
        if let Err(err) = created {
            self.state = LifecycleState::Absent;
            return Err(ReconcileError::remote(&bucket, "CreateBucket", err));
        }

        self.managed = Some(Managed {
            bucket: bucket.clone(),
            desired,
        });
        self.recorded = None;
        self.sync(cx, SyncPass::Create).await
    }

    /// Bring the bucket in line with a new desired state.
    ///
    /// Also resumes a pass that failed earlier.
    ///
    /// # Errors
    ///
    /// [`ReconcileError::InvalidTransition`] when no bucket is managed,
    /// validation errors, or the first facet error of the pass.
    pub async fn update(
        &mut self,
        cx: &RunContext,
        desired: DesiredState,
    ) -> ReconcileResult<Arc<RecordedState>> {
        self.expect_state(
            "update",
            &[LifecycleState::Ready, LifecycleState::SyncingFacets],
        )?;
        let managed = self.managed_mut("update")?;
        if let Some(name) = &desired.bucket
            && *name != managed.bucket
        {
            return Err(ReconcileError::validation(
                "bucket",
                format!(
                    "cannot rename {} to {name}; delete and recreate instead",
                    managed.bucket
                ),
            ));
        }
        managed.desired = desired;
        self.sync(cx, SyncPass::Update).await
    }

    /// Re-read the bucket and replace the recorded state.
    ///
    /// A bucket deleted behind the engine's back moves the reconciler to
    /// [`LifecycleState::Absent`].
    ///
    /// # Errors
    ///
    /// [`ReconcileError::InvalidTransition`] when no bucket is managed, or any
    /// read failure other than an unsupported facet.
    pub async fn refresh(&mut self, cx: &RunContext) -> ReconcileResult<Arc<RecordedState>> {
        self.expect_state(
            "refresh",
            &[LifecycleState::Ready, LifecycleState::SyncingFacets],
        )?;
        self.read_pass(cx).await
    }

    /// Adopt an existing bucket by name.
    ///
    /// # Errors
    ///
    /// [`ReconcileError::InvalidTransition`] when a bucket is already
    /// managed, or the read failure (not found if the bucket does not exist).
    pub async fn import(
        &mut self,
        cx: &RunContext,
        bucket: &str,
    ) -> ReconcileResult<Arc<RecordedState>> {
        self.expect_state("import", &[LifecycleState::Absent])?;
        info!(bucket, "importing bucket");
        self.managed = Some(Managed {
            bucket: bucket.to_owned(),
            desired: DesiredState::named(bucket, BucketConfig::default()),
        });
        self.state = LifecycleState::Ready;
        self.read_pass(cx).await
    }

    /// Delete the bucket, emptying it first if the desired state set
    /// `force_destroy`.
    ///
    /// # Errors
    ///
    /// [`ReconcileError::Conflict`] if the bucket is not empty and may not be
    /// emptied; the reconciler then keeps its previous state.
    pub async fn delete(&mut self, cx: &RunContext) -> ReconcileResult<()> {
        let previous = self.expect_state(
            "delete",
            &[
                LifecycleState::Creating,
                LifecycleState::SyncingFacets,
                LifecycleState::Ready,
            ],
        )?;
        let managed = self.managed_mut("delete")?;
        let bucket = managed.bucket.clone();
        let force = managed.desired.force_destroy;

        self.state = LifecycleState::Deleting;
        info!(bucket = %bucket, force, "deleting bucket");
        let destroyer = RecursiveDestroyer::new(self.api.as_ref(), self.config.destroy_max_passes);
        match destroyer.destroy(cx, &bucket, force).await {
            Ok(()) => {
                self.forget();
                Ok(())
            }
            Err(err) => {
                warn!(bucket = %bucket, error = %err, "delete failed");
                self.state = previous;
                Err(err)
            }
        }
    }

    // -- passes -------------------------------------------------------------

    /// Validate and apply every changed facet, then read back.
    async fn sync(
        &mut self,
        cx: &RunContext,
        pass: SyncPass,
    ) -> ReconcileResult<Arc<RecordedState>> {
        self.state = LifecycleState::SyncingFacets;
        let managed = self.managed_mut("sync")?.clone();
        let prior = self.recorded.as_ref().map(|r| &r.config);
        let desired = &managed.desired.config;

        let changed = changed_facets(prior, desired, pass);
        self.validate_facets(&managed.bucket, desired, prior, pass)?;
        let sync_cx = SyncContext {
            api: self.api.as_ref(),
            bucket: &managed.bucket,
            desired,
            prior,
            pass,
        };
        debug!(bucket = %managed.bucket, ?pass, changed = changed.len(), "sync pass");

        let policy = self.config.update_retry();
        for facet in changed {
            let sync = synchronizer(facet);
            info!(bucket = %managed.bucket, facet = %facet, "applying facet");
            let retryable =
                |err: &ReconcileError| err.remote_source().is_some_and(|e| sync.is_retryable(e));
            policy
                .run(cx, facet.as_str(), retryable, || sync.apply(&sync_cx))
                .await?;
        }

        self.read_pass(cx).await
    }

    /// Rebuild the recorded state from remote reads.
    async fn read_pass(&mut self, cx: &RunContext) -> ReconcileResult<Arc<RecordedState>> {
        let managed = self.managed_mut("read")?.clone();
        let bucket = managed.bucket.as_str();
        let api = self.api.as_ref();

        let head = self
            .config
            .read_retry()
            .run(cx, "HeadBucket", retry::is_not_yet_visible, || api.head_bucket(bucket))
            .await;
        if let Err(err) = head {
            if err.is(S3ErrorCode::NoSuchBucket) {
                warn!(bucket, "bucket no longer exists");
                self.forget();
            }
            return Err(ReconcileError::remote(bucket, "HeadBucket", err));
        }

        let location = api
            .get_bucket_location(bucket)
            .await
            .map_err(|e| ReconcileError::remote(bucket, "GetBucketLocation", e))?;
        let region = AwsRegion::from_location(&location);

        let sync_cx = SyncContext {
            api,
            bucket,
            desired: &managed.desired.config,
            prior: None,
            pass: SyncPass::Update,
        };
        let mut config = BucketConfig::default();
        for facet in FacetName::ALL {
            config.set(read_facet(&sync_cx, facet).await?);
        }

        let website = config.website.is_some();
        let recorded = Arc::new(RecordedState {
            bucket: bucket.to_owned(),
            arn: Arn::s3_bucket(region.partition(), bucket).to_string(),
            bucket_domain_name: endpoints::bucket_domain_name(bucket),
            bucket_regional_domain_name: endpoints::bucket_regional_domain_name(bucket, &region),
            hosted_zone_id: endpoints::hosted_zone_id(&region).map(str::to_owned),
            website_endpoint: website.then(|| endpoints::website_endpoint(bucket, &region)),
            website_domain: website.then(|| endpoints::website_domain(&region)),
            region,
            force_destroy: managed.desired.force_destroy,
            config,
        });
        debug!(bucket, region = %recorded.region, "read pass complete");

        self.recorded = Some(Arc::clone(&recorded));
        self.state = LifecycleState::Ready;
        Ok(recorded)
    }

    // -- helpers ------------------------------------------------------------

    /// Cross-facet rules span facets that did not change, so every facet is
    /// checked on every pass.
    fn validate_facets(
        &self,
        bucket: &str,
        desired: &BucketConfig,
        prior: Option<&BucketConfig>,
        pass: SyncPass,
    ) -> ReconcileResult<()> {
        let cx = SyncContext {
            api: self.api.as_ref(),
            bucket,
            desired,
            prior,
            pass,
        };
        FacetName::ALL
            .into_iter()
            .try_for_each(|facet| synchronizer(facet).validate(&cx))
    }

    fn region_of(&self, desired: &DesiredState) -> AwsRegion {
        desired
            .region
            .clone()
            .unwrap_or_else(|| AwsRegion::new(self.config.default_region.clone()))
    }

    fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[LifecycleState],
    ) -> ReconcileResult<LifecycleState> {
        if allowed.contains(&self.state) {
            Ok(self.state)
        } else {
            Err(ReconcileError::InvalidTransition {
                operation,
                state: self.state,
            })
        }
    }

    fn managed_mut(&mut self, operation: &'static str) -> ReconcileResult<&mut Managed> {
        let state = self.state;
        self.managed
            .as_mut()
            .ok_or(ReconcileError::InvalidTransition { operation, state })
    }

    fn forget(&mut self) {
        self.managed = None;
        self.recorded = None;
        self.state = LifecycleState::Absent;
    }
}

/// Read one facet, degrading an unsupported read to the facet's default.
async fn read_facet(cx: &SyncContext<'_>, facet: FacetName) -> ReconcileResult<FacetValue> {
    match synchronizer(facet).read(cx).await {
        Err(err)
            if err
                .remote_source()
                .is_some_and(|e| UNSUPPORTED_READ.contains(&e.code)) =>
        {
            debug!(
                bucket = cx.bucket,
                facet = %facet,
                error = %err,
                "read unsupported, using default"
            );
            Ok(FacetValue::empty(facet))
        }
        other => other,
    }
}
