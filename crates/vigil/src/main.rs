//! vigil - cluster event watch agent.
//!
//! Watches the control plane's event feed over a long-lived HTTP
//! connection, suppresses duplicate notifications, and forwards the rest
//! to a console or remote log sink. Runs unattended: dropped connections
//! are re-established transparently, forever.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

use vigil_config::{AgentConfig, KeySource, ResolvedSink, load_config};
use vigil_sink::{ConsoleSink, RemoteConfig, RemoteSink};
use vigil_stream::{
    DedupCache, KeyMode, Orchestrator, SharedSink, WatchClient, WatchConfig,
};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// vigil - cluster event watch agent
#[derive(Parser)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (default: ./vigil.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the API server
    #[arg(long, env = "VIGIL_API_URL")]
    api_url: Option<String>,

    /// Bearer token for the watch request
    #[arg(long, env = "VIGIL_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "vigil=debug,vigil_stream=debug,vigil_sink=debug,vigil_config=debug,info"
    } else {
        "vigil=info,vigil_stream=info,vigil_sink=info,warn"
    };
    tracing_subscriber::fmt()
        .with_target(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    apply_cli_overrides(&mut config, &cli);
    let resolved = config.resolve().context("Invalid configuration")?;

    // Signal path: decoupled from the streaming path, shares only the
    // shutdown flag.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let sink: SharedSink = match &resolved.sink {
        ResolvedSink::Console => Arc::new(ConsoleSink::new()),
        ResolvedSink::Remote { url, tag } => {
            let mut remote_config = RemoteConfig::new(url.clone());
            if let Some(tag) = tag {
                remote_config = remote_config.with_tag(tag.clone());
            }
            Arc::new(RemoteSink::new(remote_config).context("Failed to build remote sink")?)
        }
    };

    let watch_config = WatchConfig::new(&resolved.api_url, &resolved.token)
        .with_insecure_tls(resolved.insecure_tls)
        .with_connect_timeout(resolved.connect_timeout);
    let connector = WatchClient::new(watch_config).context("Failed to build watch client")?;

    let key_mode = match resolved.key_source {
        KeySource::ObjectName => KeyMode::ObjectName,
        KeySource::InvolvedObject => KeyMode::InvolvedObject,
    };

    info!(
        api_url = %resolved.api_url,
        sink = sink.name(),
        ttl_secs = resolved.dedup_ttl.as_secs(),
        "Starting watch loop"
    );

    let mut orchestrator = Orchestrator::new(
        connector,
        sink,
        DedupCache::new(resolved.dedup_ttl),
        shutdown_rx,
    )
    .with_key_mode(key_mode)
    .with_retry_interval(resolved.retry_interval)
    .with_cleanup_interval(resolved.cleanup_interval);

    orchestrator.run().await;
    Ok(())
}

/// CLI flags take precedence over file and environment settings.
fn apply_cli_overrides(config: &mut AgentConfig, cli: &Cli) {
    if let Some(url) = &cli.api_url {
        config.watch.api_url = Some(url.clone());
    }
    if let Some(token) = &cli.token {
        config.watch.token = Some(token.clone());
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
