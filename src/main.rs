//! Main entry point for the Cafe Hop service
//!
//! Loads configuration, initializes logging and serves the HTTP API until a
//! shutdown signal arrives.

use anyhow::{Context, Result};
use cafe_hop::config::AppConfig;
use cafe_hop::service::{create_router, AppState};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Cafe Hop - cafe catalog with pairwise Elo ratings
#[derive(Parser)]
#[command(name = "cafe-hop", version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file; environment variables are used otherwise
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Override HTTP server port
    #[arg(long, value_name = "PORT")]
    http_port: Option<u16>,

    /// Precomputed GTFS JSON for subway lookups
    #[arg(long, value_name = "FILE")]
    gtfs_path: Option<PathBuf>,

    /// Shorthand for `--log-level debug`
    #[arg(short, long)]
    debug: bool,

    /// Validate configuration and exit without starting the server
    #[arg(long)]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("☕ Cafe Hop Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Listening on: {}", config.bind_address());
    info!("   Allowed origin: {}", config.service.allowed_origin);
    info!(
        "   Elo: k_new={}, k_first_time={}, k_veteran={}, cap={}",
        config.rating.elo.k_new,
        config.rating.elo.k_existing_first_time,
        config.rating.elo.k_existing_veteran,
        config.rating.elo.max_existing_delta
    );
    info!(
        "   Stars: {} -> 1, {} -> {}",
        config.rating.display.rating_floor,
        config.rating.display.rating_ceiling,
        config.rating.display.scale_max
    );
    match &config.geo.gtfs_path {
        Some(path) => info!("   Transit data: {}", path.display()),
        None => info!("   Transit data: none"),
    }
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(http_port) = args.http_port {
        config.service.http_port = http_port;
    }

    if let Some(gtfs_path) = &args.gtfs_path {
        config.geo.gtfs_path = Some(gtfs_path.clone());
    }

    cafe_hop::config::validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    info!("Initializing service components...");
    let app_state = match AppState::new(config.clone()) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    app_state.start().await;
    info!("HTTP server listening on http://{}", address);
    info!("Press Ctrl+C to shutdown gracefully...");

    let router = create_router(app_state.clone());
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(wait_for_shutdown_signal())
            .await
    });

    match server.await {
        Ok(Ok(())) => info!("🛑 Shutdown signal received, HTTP server drained"),
        Ok(Err(e)) => error!("HTTP server error: {}", e),
        Err(e) => error!("HTTP server task failed: {}", e),
    }

    match tokio::time::timeout(config.shutdown_timeout(), app_state.shutdown()).await {
        Ok(()) => info!("✅ Graceful shutdown completed successfully"),
        Err(_) => warn!("⚠️  Shutdown timeout exceeded, forcing exit"),
    }

    info!("🛑 Cafe Hop service stopped");
    Ok(())
}
