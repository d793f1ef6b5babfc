// src/logging.rs

use color_eyre::eyre::Result;
use directories::ProjectDirs;
use lazy_static::lazy_static;
use std::path::PathBuf;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref LOG_ENV: String = format!("{}_LOGLEVEL", PROJECT_NAME.clone());
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "vanguard-rs", env!("CARGO_PKG_NAME"))
}

pub fn get_data_dir() -> PathBuf {
    if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

/// Filter directive in effect: `RUST_LOG`, then `VANGUARD_RECON_LOGLEVEL`,
/// then the command-line override, then `vanguard_recon=info`.
pub fn log_directive(cli_level: Option<&str>) -> String {
    resolve_directive(
        std::env::var("RUST_LOG").ok(),
        std::env::var(LOG_ENV.as_str()).ok(),
        cli_level,
    )
}

fn resolve_directive(rust_log: Option<String>, project_env: Option<String>, cli_level: Option<&str>) -> String {
    rust_log
        .filter(|v| !v.trim().is_empty())
        .or_else(|| project_env.filter(|v| !v.trim().is_empty()))
        .or_else(|| cli_level.map(|level| format!("{}={}", env!("CARGO_CRATE_NAME"), level)))
        .unwrap_or_else(|| format!("{}=info", env!("CARGO_CRATE_NAME")))
}

/// Installs the global subscriber: a console layer on stderr and a plain
/// file layer in the data directory, both behind the same filter.
pub fn initialize_logging(cli_level: Option<&str>) -> Result<()> {
    let directory = get_data_dir();
    std::fs::create_dir_all(&directory)?;
    let log_path = directory.join(LOG_FILE.clone());
    let log_file = std::fs::File::create(&log_path)?;

    let directive = log_directive(cli_level);

    let console_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTime::rfc_3339())
        .with_target(false)
        .with_filter(EnvFilter::new(&directive));

    let file_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_timer(LocalTime::rfc_3339())
        .with_target(false)
        .with_ansi(false)
        .with_filter(EnvFilter::new(&directive));

    tracing_subscriber::registry()
        .with(console_subscriber)
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .init();

    tracing::debug!(path = %log_path.display(), filter = %directive, "Logging initialized.");
    Ok(())
}
