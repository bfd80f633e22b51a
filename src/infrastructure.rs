//! Infrastructure layer for storage, HTTP, parsing and source fetching
//!
//! This module provides the SQLite connection and repository, the rate-limited HTTP
//! client, table parsing, the tiered source fetchers, configuration and logging.

pub mod component_repository;
pub mod config; // Configuration constants and helpers
pub mod database_connection;
pub mod fetching; // Tiered source fetchers
pub mod http_client;
pub mod loader;
pub mod logging; // Logging infrastructure
pub mod parsing; // Table and field extraction
pub mod update_tracker;

// Re-export commonly used items
pub use component_repository::SqliteComponentRepository;
pub use config::{AppConfig, ConfigManager, LoadedConfig};
pub use database_connection::DatabaseConnection;
pub use fetching::{FetchTier, SourceFetcher, SourceReport, SourceSpec};
pub use http_client::{FetchError, HttpClient, HttpClientConfig};
pub use loader::{ComponentLoader, LoadError, LoadReport};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use update_tracker::UpdateTracker;
