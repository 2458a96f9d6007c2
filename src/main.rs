//! Clearinghouse - Main Entry Point
//!
//! Loads configuration, connects to the brokerage (or the local in-memory
//! one) and serves the HTTP API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use clearinghouse::api::{build_router, AppState};
use clearinghouse::config::{load_config, AppConfig};
use clearinghouse::schwab::{LocalBrokerage, SchwabClient};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Address to listen on, overrides the configuration file
    #[arg(long, env = "CLEARINGHOUSE_BIND")]
    bind: Option<String>,

    /// Serve sample data instead of connecting to Schwab
    #[arg(long)]
    local: bool,

    /// Refuse every order submission
    #[arg(long)]
    read_only: bool,
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn build_state(config: &AppConfig) -> Result<AppState> {
    let status_ttl = Duration::from_secs(config.settings.account_status_ttl_seconds);
    let read_only = config.brokerage.read_only_mode;

    if config.brokerage.local_mode {
        warn!("Local mode: serving sample data, no orders leave this process");
        let brokerage = Arc::new(LocalBrokerage::with_sample_data().read_only(read_only));
        return Ok(AppState::new(brokerage, config.safety.clone(), read_only, status_ttl));
    }

    let timeout = Duration::from_secs(config.settings.request_timeout_seconds);
    let client = SchwabClient::connect(&config.brokerage, timeout)
        .await
        .context("failed to connect to Schwab")?;
    Ok(AppState::new(
        Arc::new(client),
        config.safety.clone(),
        read_only,
        status_ttl,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(Some(&args.config)).context("failed to load configuration")?;
    if args.local {
        config.brokerage.local_mode = true;
    }
    if args.read_only {
        config.brokerage.read_only_mode = true;
    }
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.settings.log_level.clone());
    init_tracing(&level, args.json_logs);

    info!("Starting Clearinghouse");
    info!("Configuration file: {}", args.config);

    let state = Arc::new(build_state(&config).await?);
    info!(
        brokerage = state.brokerage.brokerage_name(),
        account = %state.brokerage.default_account(),
        read_only = state.read_only,
        "Brokerage ready"
    );

    let app = build_router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    info!("Clearinghouse listening on http://{}", config.server.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal, cleaning up...");
        })
        .await
        .context("server crashed")?;

    Ok(())
}
