use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use portal::config::Config;
use portal::server::{self, ShutdownController};

/// WiFi setup captive portal.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "PORTAL_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let args = Args::parse();
    let cfg = Config::load(args.config.as_deref())?;
    tracing::info!(
        name = %cfg.portal.name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting portal"
    );

    let shutdown = Arc::new(ShutdownController::new());

    tokio::select! {
        res = server::listener::run(&cfg, shutdown.clone()) => {
            res?;
        }

        _ = shutdown.wait() => {
            tracing::info!("WiFi configured, shutting down");
        }

        _ = terminate() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

/// Ctrl-C everywhere; SIGTERM and SIGQUIT as well on Unix.
async fn terminate() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (Ok(mut term), Ok(mut quit)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::quit()),
        ) else {
            let _ = tokio::signal::ctrl_c().await;
            return;
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
            _ = quit.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
