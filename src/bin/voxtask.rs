//! voxtask service binary.
//!
//! Loads configuration, starts the reminder scheduler and keep-alive loops,
//! and serves the HTTP gateway until Ctrl-C.
//!
//! Usage: `voxtask [--config <path>]`. Without `--config` the path comes from
//! `$VOXTASK_CONFIG` or the platform config directory.

use std::path::PathBuf;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use voxtask::{App, AppConfig};

fn config_path_from_args() -> anyhow::Result<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let path = args.next().context("--config needs a path")?;
            return Ok(PathBuf::from(path));
        }
        anyhow::bail!("unknown argument: {arg}");
    }
    Ok(AppConfig::default_config_path())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = config_path_from_args()?;
    let config = AppConfig::load_or_default(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.logging.filter))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!(config = %config_path.display(), users = config.users.len(), "voxtask starting");

    let mut app = App::from_config(&config).context("failed to initialise services")?;
    let cancel = CancellationToken::new();
    let background = app.spawn_background(&cancel);

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("cannot listen for Ctrl-C: {e}");
            return;
        }
        tracing::info!("shutdown requested");
        shutdown.cancel();
    });

    let served = voxtask::server::serve(&config.server, app.assistant.clone(), cancel.clone()).await;
    cancel.cancel();
    for handle in background {
        if let Err(e) = handle.await {
            tracing::warn!("background task ended abnormally: {e}");
        }
    }

    served.map_err(|e| {
        tracing::error!(error = %e, "voxtask exited with error");
        e
    })?;
    tracing::info!("voxtask shut down cleanly");
    Ok(())
}
