//! Logging system configuration and initialization
//!
//! This module provides the logging setup shared by both binaries:
//! - Console output through `tracing_subscriber::fmt`
//! - Optional daily rolling file output (plain or JSON)
//! - Configuration based log level with noisy dependencies quietened
//! - `RUST_LOG` always wins when it is set

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use tracing::info;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

// Re-export LoggingConfig from config module
pub use crate::infrastructure::config::LoggingConfig;
use crate::infrastructure::config::ConfigManager;

/// Keeps the non-blocking file writer alive for the lifetime of the process
static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

const LOG_FILE_PREFIX: &str = "pc-power-catalog.log";

/// Dependencies that drown application logs unless TRACE is requested
const QUIET_TARGETS: &[(&str, &str)] = &[
    ("sqlx", "warn"),
    ("hyper", "warn"),
    ("h2", "warn"),
    ("reqwest", "info"),
    ("actix_server", "warn"),
    ("headless_chrome", "warn"),
    ("tungstenite", "warn"),
];

/// Resolve the log directory: configured, else `<app data>/logs`
pub fn get_log_directory(config: &LoggingConfig) -> PathBuf {
    config.log_dir.clone().unwrap_or_else(|| {
        ConfigManager::get_app_data_dir()
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_default())
            .join("logs")
    })
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Build the filter used when `RUST_LOG` is absent.
///
/// Dependencies listed in `QUIET_TARGETS` are capped unless the level is `trace`;
/// `module_filters` from the config are applied last so they override both.
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("Invalid log level: {}", config.level))?;

    if !config.level.to_lowercase().contains("trace") {
        for (target, level) in QUIET_TARGETS {
            filter = filter.add_directive(format!("{target}={level}").parse()?);
        }
    }

    for (module, level) in &config.module_filters {
        let directive = format!("{module}={level}")
            .parse()
            .with_context(|| format!("Invalid module filter {module}={level}"))?;
        filter = filter.add_directive(directive);
    }

    Ok(filter)
}

/// Initialize logging with custom configuration
///
/// Can only succeed once per process; later calls return an error from the global
/// subscriber registration.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    if !config.file_output && !config.console_output {
        return Err(anyhow!("No logging output configured"));
    }

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_env_filter(config)?,
    };

    let console_layer = config.console_output.then(|| {
        fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_target(false)
            .boxed()
    });

    let log_dir = get_log_directory(config);
    let file_layer = if config.file_output {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;

        let (writer, guard) = non_blocking(rolling::daily(&log_dir, LOG_FILE_PREFIX));
        // A second initialisation keeps the first guard; the new writer is dropped with it.
        let _ = LOG_GUARD.set(guard);

        let layer = if config.json_format {
            fmt::Layer::new()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .boxed()
        } else {
            fmt::Layer::new()
                .with_writer(writer)
                .with_target(false)
                .with_ansi(false)
                .boxed()
        };
        Some(layer)
    } else {
        None
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install global tracing subscriber")?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if config.file_output {
        info!("Log directory: {:?} (json: {})", log_dir, config.json_format);
    }

    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== PC Power Catalog System Information ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);
    info!("Browser fallback compiled in: {}", cfg!(feature = "browser"));
    info!("============================================");
}
