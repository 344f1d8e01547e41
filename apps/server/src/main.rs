//! PullDeck server binary

use anyhow::{Context, Result};
use clap::Parser;
use pulldeck_core::{MemorySessionStore, PullDeckCore};
use pulldeck_server::{config::Cli, router, AppState};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How long running transfers get to flush after shutdown is requested
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let (password, defaulted) = cli.password();
    if defaulted {
        tracing::warn!("No password configured, falling back to the default. Set PULLDECK_PASSWORD");
    }

    let config = cli.config();
    let core = PullDeckCore::new(&config.engine).context("Failed to initialise download engine")?;
    let sessions = Arc::new(MemorySessionStore::new(&config.session));

    let purger = Arc::clone(&sessions);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = purger.purge_expired();
            if purged > 0 {
                tracing::debug!("Purged {} expired sessions", purged);
            }
        }
    });

    let state = AppState::new(core.clone(), sessions, password);
    let app = router(state);

    let addr = cli.addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("PullDeck listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    core.shutdown();
    drain(&core).await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

/// Give cancelled workers a moment to flush their files
async fn drain(core: &PullDeckCore) {
    let deadline = Instant::now() + DRAIN_TIMEOUT;
    while core.registry().running_count() > 0 {
        if Instant::now() >= deadline {
            tracing::warn!(
                "{} transfers still running at exit",
                core.registry().running_count()
            );
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
