//! RustStack S3 plan - offline check of a bucket desired state.
//!
//! Reads a desired-state JSON document, validates it the way the reconciler
//! would before its first remote call, and prints the facets the next sync
//! pass would apply. Given the JSON of a previously recorded state, the plan
//! is computed as an update against it.
//!
//! With `--simulate` the desired state is instead created on an in-memory
//! control plane and the resulting recorded state is printed.
//!
//! # Usage
//!
//! ```text
//! ruststack-s3-plan [--simulate] <desired.json> [recorded.json]
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DEFAULT_REGION` | `us-east-1` | Region of desired states that name none |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use ruststack_s3_reconciler::{
    BucketReconciler, DesiredState, InMemoryS3, RecordedState, ReconcilerConfig, RunContext,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: ruststack-s3-plan [--simulate] <desired.json> [recorded.json]";

/// Initialize the tracing subscriber on stderr.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    Ok(())
}

#[derive(Debug)]
struct Args {
    simulate: bool,
    desired: PathBuf,
    recorded: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut simulate = false;
    let mut paths = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--simulate" => simulate = true,
            "-h" | "--help" => bail!(USAGE),
            flag if flag.starts_with('-') => bail!("unknown flag {flag}\n{USAGE}"),
            _ => paths.push(PathBuf::from(arg)),
        }
    }

    let mut paths = paths.into_iter();
    let Some(desired) = paths.next() else {
        bail!(USAGE);
    };
    let recorded = paths.next();
    if paths.next().is_some() {
        bail!(USAGE);
    }
    if simulate && recorded.is_some() {
        bail!("--simulate always starts from an empty control plane; drop the recorded state");
    }
    Ok(Args {
        simulate,
        desired,
        recorded,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = ReconcilerConfig::from_env();
    init_tracing(&config.log_level)?;

    let args = parse_args()?;
    debug!(?args, "parsed arguments");
    let desired: DesiredState = read_json(&args.desired)?;
    let api = Arc::new(InMemoryS3::new());

    let output = if args.simulate {
        let mut reconciler = BucketReconciler::new(api.clone(), config);
        let recorded = reconciler
            .create(&RunContext::new(), desired)
            .await
            .context("simulated create failed")?;
        info!(bucket = %recorded.bucket, calls = api.calls().len(), "simulation complete");
        serde_json::to_string_pretty(&*recorded)?
    } else {
        let reconciler = match &args.recorded {
            Some(path) => {
                let recorded: RecordedState = read_json(path)?;
                BucketReconciler::resume(api, config, recorded)
            }
            None => BucketReconciler::new(api, config),
        };
        let plan = reconciler.plan(&desired).context("desired state rejected")?;
        info!(pass = ?plan.pass, changed = plan.changed.len(), "plan computed");
        serde_json::to_string_pretty(&plan)?
    };

    println!("{output}");
    Ok(())
}
