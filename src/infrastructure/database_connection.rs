// Database connection and pool management
// This module handles SQLite database connections using sqlx

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::infrastructure::config::DatabaseConfig;

/// Component tables, created idempotently at startup
const SCHEMA: [&str; 6] = [
    r"
    CREATE TABLE IF NOT EXISTS cpus (
        name TEXT PRIMARY KEY,
        consumption TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS gpus (
        name TEXT PRIMARY KEY,
        consumption TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS psus (
        name TEXT PRIMARY KEY,
        wattage INTEGER NOT NULL CHECK (wattage BETWEEN 300 AND 2000)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS ram (
        name TEXT PRIMARY KEY,
        consumption TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS storages (
        name TEXT PRIMARY KEY,
        consumption TEXT NOT NULL,
        type TEXT NOT NULL DEFAULT ''
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS cooling (
        name TEXT PRIMARY KEY,
        size TEXT NOT NULL,
        has_led INTEGER NOT NULL DEFAULT 0
    )
    ",
];

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_max_connections(database_url, 10).await
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::with_max_connections(&config.url, config.max_connections).await
    }

    async fn with_max_connections(database_url: &str, max_connections: u32) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");

        if !in_memory {
            // Create database file directory if it doesn't exist
            let db_path = database_url
                .strip_prefix("sqlite://")
                .or_else(|| database_url.strip_prefix("sqlite:"))
                .unwrap_or(database_url);
            if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL {database_url}"))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections.max(1));
        if in_memory {
            // every in-memory connection would be its own database
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {database_url}"))?;

        info!("🗄️ Database opened: {}", database_url);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the component tables when absent
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to create component table")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::component::ComponentKind;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_database_connection() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("nested").join("test.db");
        let database_url = format!("sqlite://{}", db_path.display());

        let db = DatabaseConnection::new(&database_url).await?;

        assert!(!db.pool().is_closed());
        assert!(db_path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_database_migration() -> Result<()> {
        let temp_dir = tempdir()?;
        let database_url = format!("sqlite:{}", temp_dir.path().join("test_migration.db").display());

        let db = DatabaseConnection::new(&database_url).await?;
        db.migrate().await?;
        // idempotent
        db.migrate().await?;

        for kind in ComponentKind::ALL {
            let result = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name=?")
                .bind(kind.table())
                .fetch_optional(db.pool())
                .await?;
            assert!(result.is_some(), "missing table {}", kind.table());
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_psu_wattage_check_constraint() -> Result<()> {
        let db = DatabaseConnection::new("sqlite::memory:").await?;
        db.migrate().await?;

        let rejected = sqlx::query("INSERT INTO psus (name, wattage) VALUES ('tiny', 150)")
            .execute(db.pool())
            .await;

        assert!(rejected.is_err());
        Ok(())
    }
}
