//! Veriviz scenario runner entry point
//!
//! Loads YAML scenarios, runs each against the target application in a
//! fresh browser session, writes artifacts and JSON reports, and exits
//! 0 when every scenario passed, 1 on scenario failures, 2 on harness
//! errors (launch, navigation, invalid scenarios).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use veriviz_harness::capture::ArtifactStore;
use veriviz_harness::chromium::ChromiumFactory;
use veriviz_harness::scenario::Scenario;
use veriviz_harness::session::SessionOptions;
use veriviz_harness::{EngineOptions, ScenarioEngine};

#[derive(Parser, Debug)]
#[command(name = "veriviz")]
#[command(about = "Scenario-driven visual verification for the weather visualization app")]
struct Args {
    /// Path to the scenarios directory (or a single scenario file)
    #[arg(short, long, default_value = "scenarios")]
    scenarios: PathBuf,

    /// Base URL of the running application
    #[arg(short, long, default_value = "http://127.0.0.1:5173")]
    url: String,

    /// Run only scenarios matching this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only a specific scenario by name
    #[arg(short, long)]
    name: Option<String>,

    /// Output directory for reports
    #[arg(short, long, default_value = "verification-results")]
    output: PathBuf,

    /// Artifact directory (defaults to <output>/artifacts)
    #[arg(long)]
    artifacts: Option<PathBuf>,

    /// Navigation timeout in milliseconds
    #[arg(long, default_value = "30000")]
    nav_timeout_ms: u64,

    /// Run the browser with a visible window
    #[arg(long)]
    headed: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create runtime: {e}");
            std::process::exit(2);
        }
    };

    match rt.block_on(run(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let mut scenarios = if args.scenarios.is_file() {
        vec![Scenario::from_file(&args.scenarios)
            .with_context(|| format!("loading {}", args.scenarios.display()))?]
    } else {
        Scenario::load_all(&args.scenarios)
            .with_context(|| format!("loading scenarios under {}", args.scenarios.display()))?
    };

    if let Some(name) = &args.name {
        scenarios.retain(|s| &s.name == name);
    }
    if let Some(tag) = &args.tag {
        scenarios.retain(|s| s.tags.iter().any(|t| t == tag));
    }
    if scenarios.is_empty() {
        info!("no scenarios matched the filters");
        return Ok(true);
    }
    info!(count = scenarios.len(), url = %args.url, "running scenarios");

    let artifacts_dir = args
        .artifacts
        .clone()
        .unwrap_or_else(|| args.output.join("artifacts"));
    let factory = Arc::new(ChromiumFactory::new());
    let mut all_passed = true;

    for scenario in &scenarios {
        let store = ArtifactStore::new(artifacts_dir.join(&scenario.name))?;
        let options = EngineOptions {
            base_url: args.url.clone(),
            session: SessionOptions {
                headless: !args.headed,
                navigation_timeout: Duration::from_millis(args.nav_timeout_ms),
                ..SessionOptions::default()
            },
        };
        let engine = ScenarioEngine::new(factory.clone(), store, options);

        let report = engine.run(scenario).await?;
        report.write_json(&args.output)?;

        if report.passed() {
            info!(scenario = %scenario.name, "PASS ({} ms)", report.duration_ms);
        } else {
            all_passed = false;
            error!(scenario = %scenario.name, "FAIL ({} ms)", report.duration_ms);
            for line in report.failures() {
                error!("  {line}");
            }
        }
    }

    Ok(all_passed)
}
