//! tmplsync-worker: polls the upstream template service and publishes new
//! templates onto the bus.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use tmplsync_bus::{open_sink, TemplatePublisher};
use tmplsync_core::config::{self, Config};
use tmplsync_source::SourceClient;
use tmplsync_worker::Scheduler;

// ── CLI ─────────────────────────────────────────────────────────────

/// Template sync worker.
#[derive(Parser, Debug)]
#[command(name = "tmplsync-worker", version, about)]
struct Cli {
    /// Configuration profile; keys resolve as `{PROFILE}_{KEY}` first.
    #[arg(long, env = "TMPLSYNC_PROFILE", default_value = "")]
    profile: String,

    /// Override the poll interval in seconds.
    #[arg(long, env = "TMPLSYNC_POLL_INTERVAL")]
    poll_interval: Option<u64>,

    /// Override the epoch reset interval in seconds.
    #[arg(long, env = "TMPLSYNC_RESET_INTERVAL")]
    reset_interval: Option<u64>,

    /// Skip loading `.env` from the working directory.
    #[arg(long)]
    no_dotenv: bool,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::for_profile(&cli.profile);
    if let Some(secs) = cli.poll_interval {
        config.scheduler.poll_interval_secs = secs;
    }
    if let Some(secs) = cli.reset_interval {
        config.scheduler.reset_interval_secs = secs;
    }
    config.validate()?;
    config.log_summary();

    let sink = open_sink(&config.bus)
        .await
        .with_context(|| format!("opening bus at {}", config.bus.endpoint))?;
    let publisher = TemplatePublisher::from_config(sink, &config.bus);
    let source = SourceClient::from_config(&config).context("building upstream client")?;
    info!(mock = source.is_mock(), "upstream client ready");

    let scheduler = Scheduler::new(Arc::new(source), publisher, config.scheduler.clone());

    tokio::select! {
        result = scheduler.run() => result.context("sync loop stopped"),
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
            Ok(())
        }
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // `.env` has to be loaded before clap reads its env fallbacks.
    if !std::env::args_os().any(|arg| arg == "--no-dotenv") {
        config::load_dotenv();
    }
    let cli = Cli::parse();

    info!(dotenv = !cli.no_dotenv, "tmplsync-worker starting");
    if let Err(e) = run(cli).await {
        error!(error = %format!("{e:#}"), "fatal error, exiting");
        std::process::exit(1);
    }
}
