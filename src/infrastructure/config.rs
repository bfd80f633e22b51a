//! Configuration infrastructure
//!
//! Contains configuration loading and management for the component catalog.
//!
//! Configuration is resolved once, at startup, from three layers:
//! 1. Built-in defaults (`defaults` and `sources` modules)
//! 2. `config.json` in the user config directory (optional)
//! 3. `PCPOWER_*` environment variables, plus the legacy `HEADLESS` / `BROWSER_PATH` pair
//!
//! The resolved [`AppConfig`] is then passed explicitly to every subsystem.

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

use crate::domain::component::ComponentKind;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP API bind settings
    pub server: ServerConfig,

    /// SQLite storage settings
    pub database: DatabaseConfig,

    /// Scrape pipeline settings (HTTP client, sources, render fallback)
    pub scraping: ScrapingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP API bind settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// SQLite storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite:///home/me/.local/share/pc-power-catalog/components.db`
    pub url: String,

    /// Pool size
    pub max_connections: u32,
}

/// Scrape pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Concurrent page fetches per source (clamped to 8..=20 by the pager)
    pub page_workers: usize,

    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Retry attempts on transient status codes
    pub max_retries: u32,

    /// Base of the exponential retry backoff in milliseconds
    pub retry_backoff_base_ms: u64,

    /// Client-side rate limit shared by all workers of one fetch
    pub requests_per_second: u32,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Trigger a background run at startup when the refresh interval has elapsed
    pub run_on_startup: bool,

    /// Refresh interval in days
    pub update_interval_days: i64,

    /// Location of the last-successful-run marker file
    pub update_tracker_path: PathBuf,

    /// Headless browser fallback tier
    pub render: RenderConfig,

    /// Catalog sources
    pub sources: SourcesConfig,
}

/// Headless browser fallback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Try the headless render tier at all
    pub enabled: bool,

    /// Run the browser without a visible window
    pub headless: bool,

    /// Explicit browser executable; auto-detected when absent
    pub browser_path: Option<PathBuf>,

    /// How long to wait for the results selector on each page
    pub wait_timeout_seconds: u64,

    /// Treat the range as exhausted after this many empty pages in a row; 0 never stops
    pub max_consecutive_empty: u32,
}

/// The three scraped catalogs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub cpu: SourceConfig,
    pub gpu: SourceConfig,
    pub psu: SourceConfig,
}

/// One catalog site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Listing URL without the page parameter
    pub base_url: String,

    /// First page (inclusive)
    pub start_page: u32,

    /// Last page (inclusive)
    pub end_page: u32,

    /// Additional fixed query parameters
    #[serde(default)]
    pub query: BTreeMap<String, String>,

    /// CSS selector the render tier waits for
    pub render_selector: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable daily rolling file output
    pub file_output: bool,

    /// Directory for log files; defaults to `<app data>/logs`
    pub log_dir: Option<PathBuf>,

    /// Module-specific log level filters (e.g., "sqlx": "warn", "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let db_path = ConfigManager::get_app_data_dir()
            .map(|dir| dir.join(defaults::DATABASE_FILE))
            .unwrap_or_else(|_| PathBuf::from(defaults::DATABASE_FILE));
        Self {
            url: utils::sqlite_url(&db_path),
            max_connections: defaults::DATABASE_MAX_CONNECTIONS,
        }
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        let tracker_path = ConfigManager::get_app_data_dir()
            .map(|dir| dir.join(defaults::UPDATE_TRACKER_FILE))
            .unwrap_or_else(|_| PathBuf::from(defaults::UPDATE_TRACKER_FILE));
        Self {
            page_workers: defaults::PAGE_WORKERS,
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_retries: defaults::MAX_RETRIES,
            retry_backoff_base_ms: defaults::RETRY_BACKOFF_BASE_MS,
            requests_per_second: defaults::REQUESTS_PER_SECOND,
            user_agent: defaults::USER_AGENT.to_string(),
            run_on_startup: true,
            update_interval_days: defaults::UPDATE_INTERVAL_DAYS,
            update_tracker_path: tracker_path,
            render: RenderConfig::default(),
            sources: SourcesConfig::default(),
        }
    }
}

impl ScrapingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Source settings for a scraped component kind; `None` for CRUD-only kinds
    pub fn source(&self, kind: ComponentKind) -> Option<&SourceConfig> {
        match kind {
            ComponentKind::Cpu => Some(&self.sources.cpu),
            ComponentKind::Gpu => Some(&self.sources.gpu),
            ComponentKind::Psu => Some(&self.sources.psu),
            _ => None,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            headless: true,
            browser_path: None,
            wait_timeout_seconds: defaults::RENDER_WAIT_TIMEOUT_SECONDS,
            max_consecutive_empty: defaults::RENDER_MAX_CONSECUTIVE_EMPTY,
        }
    }
}

impl RenderConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_seconds)
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            cpu: SourceConfig {
                base_url: sources::CPU_SEARCH_URL.to_string(),
                start_page: sources::FIRST_PAGE,
                end_page: sources::LAST_PAGE,
                query: sources::cpu_query(),
                render_selector: sources::TABLE_SELECTOR.to_string(),
            },
            gpu: SourceConfig {
                base_url: sources::GPU_SEARCH_URL.to_string(),
                start_page: sources::FIRST_PAGE,
                end_page: sources::LAST_PAGE,
                query: sources::gpu_query(),
                render_selector: sources::TABLE_SELECTOR.to_string(),
            },
            psu: SourceConfig {
                base_url: sources::PSU_DATABASE_URL.to_string(),
                start_page: sources::FIRST_PAGE,
                end_page: sources::LAST_PAGE,
                query: BTreeMap::new(),
                render_selector: sources::PSU_TABLE_SELECTOR.to_string(),
            },
        }
    }
}

impl SourceConfig {
    /// Inclusive page range; empty when `end_page < start_page`
    pub fn pages(&self) -> std::ops::RangeInclusive<u32> {
        self.start_page..=self.end_page
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            log_dir: None,
            module_filters: HashMap::new(),
        }
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Get application data directory (database, tracker file, logs)
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(data_dir)
    }

    /// Create a manager for the default `config.json` location
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join(defaults::CONFIG_FILE);
        Ok(Self { config_path })
    }

    /// Create a manager for an explicit config file
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self { config_path: config_path.into() }
    }

    /// Write the default configuration when no config file exists yet, then load.
    ///
    /// Runs before logging is initialised, so load warnings come back for the caller to log.
    pub async fn initialize_on_first_run(&self) -> Result<LoadedConfig> {
        if !self.config_path.exists() {
            self.save_config(&AppConfig::default()).await?;
        }

        self.load_config_deferred()
    }

    /// Resolve configuration and log any warnings right away
    pub fn load_config(&self) -> Result<AppConfig> {
        let loaded = self.load_config_deferred()?;
        loaded.log_warnings();
        Ok(loaded.config)
    }

    /// Resolve configuration from the file, `PCPOWER_*` variables and legacy overrides
    pub fn load_config_deferred(&self) -> Result<LoadedConfig> {
        let defaults = config::Config::try_from(&AppConfig::default())
            .context("Failed to build default configuration")?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(
                config::File::from(self.config_path.as_path())
                    .format(config::FileFormat::Json)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {:?}", self.config_path))?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;

        let warnings = apply_legacy_overrides(&mut config, |key| std::env::var(key).ok());

        Ok(LoadedConfig {
            config,
            source: self.config_path.clone(),
            warnings,
        })
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(config)
            .context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// Resolved configuration and the warnings produced while resolving it
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub source: PathBuf,
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    pub fn log_warnings(&self) {
        info!("Loaded configuration from: {:?}", self.source);
        for warning in &self.warnings {
            warn!("{}", warning);
        }
    }
}

/// Apply the `HEADLESS` and `BROWSER_PATH` variables the render tier historically read.
///
/// `lookup` is the environment; tests pass a closure over a map. Rejected values are
/// returned as warnings.
pub fn apply_legacy_overrides<F>(config: &mut AppConfig, lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut warnings = Vec::new();

    if let Some(raw) = lookup(defaults::LEGACY_HEADLESS_VAR) {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => config.scraping.render.headless = true,
            "false" | "0" | "no" => config.scraping.render.headless = false,
            other => warnings.push(format!(
                "Ignoring unrecognised {} value: {}",
                defaults::LEGACY_HEADLESS_VAR,
                other
            )),
        }
    }

    if let Some(path) = lookup(defaults::LEGACY_BROWSER_PATH_VAR) {
        let path = path.trim();
        if !path.is_empty() {
            config.scraping.render.browser_path = Some(PathBuf::from(path));
        }
    }

    warnings
}

/// Catalog URLs and per-site constants
pub mod sources {
    use std::collections::BTreeMap;

    /// CPU catalog search listing
    pub const CPU_SEARCH_URL: &str = "https://cpus.axiomgaming.net/search";

    /// GPU catalog search listing
    pub const GPU_SEARCH_URL: &str = "https://gpus.axiomgaming.net/search";

    /// PSU performance database (already carries its own query string)
    pub const PSU_DATABASE_URL: &str =
        "https://www.cybenetics.com/index.php?option=psu-performance-database";

    pub const FIRST_PAGE: u32 = 1;
    pub const LAST_PAGE: u32 = 120;

    /// Results table on the axiomgaming listings
    pub const TABLE_SELECTOR: &str = "table";

    /// Results table on the cybenetics database
    pub const PSU_TABLE_SELECTOR: &str = "table.mytable";

    /// `q` and `sort` sent with every CPU listing request
    pub fn cpu_query() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("q".to_string(), String::new()),
            ("sort".to_string(), "name".to_string()),
        ])
    }

    /// GPU listing uses the CPU parameters plus empty facet filters
    pub fn gpu_query() -> BTreeMap<String, String> {
        let mut query = cpu_query();
        for facet in [
            "manufacturer",
            "architecture",
            "generation",
            "memory_type",
            "bus_interface",
            "directx_version",
        ] {
            query.insert(facet.to_string(), String::new());
        }
        query
    }
}

/// Default configuration values
pub mod defaults {
    /// Directory name under the platform config/data dirs
    pub const APP_DIR_NAME: &str = "pc-power-catalog";

    pub const CONFIG_FILE: &str = "config.json";
    pub const DATABASE_FILE: &str = "components.db";
    pub const UPDATE_TRACKER_FILE: &str = ".last_update.json";

    /// Prefix for environment overrides, e.g. `PCPOWER_SERVER__PORT=9000`
    pub const ENV_PREFIX: &str = "PCPOWER";
    pub const LEGACY_HEADLESS_VAR: &str = "HEADLESS";
    pub const LEGACY_BROWSER_PATH_VAR: &str = "BROWSER_PATH";

    pub const SERVER_HOST: &str = "127.0.0.1";
    pub const SERVER_PORT: u16 = 8000;

    pub const DATABASE_MAX_CONNECTIONS: u32 = 5;

    /// Default page workers per source
    pub const PAGE_WORKERS: usize = 12;

    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 15;

    /// Default retry attempts on 429/5xx
    pub const MAX_RETRIES: u32 = 3;

    /// Backoff base: 300ms, 600ms, 1200ms...
    pub const RETRY_BACKOFF_BASE_MS: u64 = 300;

    pub const REQUESTS_PER_SECOND: u32 = 20;

    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

    pub const RENDER_WAIT_TIMEOUT_SECONDS: u64 = 30;
    pub const RENDER_MAX_CONSECUTIVE_EMPTY: u32 = 3;

    /// Days between automatic refreshes
    pub const UPDATE_INTERVAL_DAYS: i64 = 180;

    pub const LOG_LEVEL: &str = "info";
}

/// Helper functions for configuration values
pub mod utils {
    use std::path::Path;

    /// sqlx SQLite URL for a file path
    pub fn sqlite_url(path: &Path) -> String {
        format!("sqlite://{}", path.display())
    }
}
