use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use marquee::cli::Cli;
use marquee::config::AppConfig;
use marquee::http::{AppState, HttpServer};
use marquee::logging;
use marquee::movies::SqliteMovieStore;
use marquee::ratelimit::{spawn_sweeper, RateLimiter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration: defaults, file, environment, then flags
    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    if cli.print_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    logging::init(&config.logging)?;

    info!("Starting Marquee movie API");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        addr = %config.server.addr,
        environment = %config.server.environment,
        "Configuration loaded"
    );

    let movies = Arc::new(SqliteMovieStore::open(&config.database.path)?);

    // Initialize the rate limiter
    let limiter = Arc::new(RateLimiter::new(&config.limiter));
    info!(
        enabled = config.limiter.enabled,
        rps = config.limiter.rps,
        burst = config.limiter.burst,
        "Rate limiter initialized"
    );

    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(
        limiter.clone(),
        config.limiter.sweep_interval(),
        shutdown.clone(),
    );

    let state = AppState::new(&config, limiter, movies);
    let server = HttpServer::bind(config.server.addr, state).await?;

    // Run the server with graceful shutdown on Ctrl+C
    server.serve_with_shutdown(shutdown_signal()).await?;

    shutdown.cancel();
    sweeper.await?;

    info!("Marquee movie API stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
