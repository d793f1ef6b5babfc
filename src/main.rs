// src/main.rs

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use std::net::SocketAddr;
use tracing::info;

use vanguard_recon::{api, app::AppState, config::Config, logging};

#[derive(Parser)]
#[command(name = "vanguard-recon")]
#[command(version, about = "Streaming subdomain reconnaissance server.")]
struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level for this crate when neither RUST_LOG nor VANGUARD_RECON_LOGLEVEL is set
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    logging::initialize_logging(args.log_level.as_deref())?;

    let mut config = Config::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        dns_servers = ?config.dns.servers,
        concurrency = config.dns.concurrency,
        rps = config.rate_limit.requests_per_second,
        "Starting reconnaissance server."
    );

    let state = AppState::new(config)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, "Listening.");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received.");
    }
}
