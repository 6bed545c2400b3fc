//! Tracehound daemon binary entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tracehound_core::{DetectorConfig, EvictionMode, WindowMatcher};
use tracehound_daemon::{feed, AlertRouter, ChannelSink, DetectorInput, DetectorRuntime};

/// Tracehound - temporal pattern detection over a security event stream.
#[derive(Parser, Debug)]
#[command(name = "tracehound", version, about)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, default_value = "~/.config/tracehound/config.toml")]
    config: String,

    /// Treat stdin as a replay of historical events: buffer eviction follows
    /// event timestamps instead of the wall clock.
    #[arg(long)]
    replay: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = expand_tilde(&args.config);
    let mut config = DetectorConfig::load(&config_path).context("loading configuration")?;
    if args.replay {
        config.eviction = EvictionMode::EventTime;
    }

    // TRACEHOUND_LOG env var wins over the config's log_filter.
    let env_filter = EnvFilter::try_from_env("TRACEHOUND_LOG").unwrap_or_else(|_| {
        match &config.log_filter {
            Some(filter) => EnvFilter::new(filter),
            None => EnvFilter::from_default_env(),
        }
    });
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!(
        config = %config_path.display(),
        replay = args.replay,
        "tracehound starting"
    );

    let (alert_tx, alert_rx) = mpsc::channel(256);
    let (input_tx, input_rx) = mpsc::channel(1024);

    let matcher = WindowMatcher::from_config(&config)
        .context("building window matcher")?
        .with_sink(Arc::new(ChannelSink::new(alert_tx)));
    info!(
        patterns = matcher.pattern_count(),
        threshold_ms = config.time_threshold_ms,
        eviction = ?config.eviction,
        "window matcher ready"
    );

    let router = AlertRouter::run(alert_rx);
    let detector = DetectorRuntime::new(matcher).run(input_rx);

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = feed::run_feed(stdin, input_tx.clone()) => {
            result.context("event feed")?;
            info!("event feed reached EOF");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received, shutting down");
        }
    }

    // Drain: stop the detector, which drops the alert sender and lets the
    // router run dry.
    let _ = input_tx.send(DetectorInput::Shutdown).await;
    drop(input_tx);
    detector.await.context("joining detector task")?;
    router.await.context("joining alert router")?;

    Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
