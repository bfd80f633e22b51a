//! Shared application state
//!
//! Holds the repository used by the API and the scrape pipeline, and makes sure only one
//! run is active at a time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{info, warn};

use crate::application::pipeline::{RunSummary, ScrapePipeline};
use crate::domain::repositories::ComponentRepository;
use crate::infrastructure::component_repository::SqliteComponentRepository;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::database_connection::DatabaseConnection;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerError {
    #[error("An update is already running")]
    AlreadyRunning,
}

/// Read-only view of the refresh bookkeeping
#[derive(Debug, Clone, Serialize)]
pub struct UpdateStatus {
    pub last_update: Option<DateTime<Utc>>,
    pub should_update: bool,
    pub update_interval_days: i64,
    pub running: bool,
}

/// Clears the running flag when the run ends, however it ends
struct RunGuard(Arc<AtomicBool>);

impl RunGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Global application state shared by the HTTP handlers
pub struct AppState {
    pub config: AppConfig,
    pub repository: Arc<dyn ComponentRepository>,
    pipeline: ScrapePipeline,
    running: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: AppConfig, repository: Arc<dyn ComponentRepository>, pipeline: ScrapePipeline) -> Self {
        Self {
            config,
            repository,
            pipeline,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Open and migrate the database, then wire the repository and pipeline
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let db = DatabaseConnection::from_config(&config.database).await?;
        db.migrate().await?;

        let pool = db.pool().clone();
        let pipeline = ScrapePipeline::from_config(&config.scraping, pool.clone())?;
        let repository = Arc::new(SqliteComponentRepository::new(pool));

        Ok(Self::new(config, repository, pipeline))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run the full pipeline and wait for its summary.
    ///
    /// The run keeps the running flag until it finishes, even when this future is dropped.
    pub async fn force_update(&self) -> Result<RunSummary, TriggerError> {
        let guard = RunGuard::acquire(&self.running).ok_or(TriggerError::AlreadyRunning)?;
        Ok(self.pipeline.run_holding(guard).await)
    }

    /// Start a run in the background; `false` when one is already active
    pub fn spawn_update(&self) -> bool {
        let Some(guard) = RunGuard::acquire(&self.running) else {
            return false;
        };
        let pipeline = self.pipeline.clone();
        tokio::spawn(async move {
            let summary = pipeline.run_holding(guard).await;
            if !summary.success {
                warn!("Background update failed: {}", summary.message);
            }
        });
        true
    }

    /// Spawn a background run when enabled and the refresh interval has elapsed
    pub async fn update_on_startup(&self) -> bool {
        let scraping = &self.config.scraping;
        if !scraping.run_on_startup {
            return false;
        }
        if !self.pipeline.tracker().should_update(scraping.update_interval_days).await {
            info!("Catalog is fresh, no startup update needed");
            return false;
        }
        info!("🔄 Catalog is stale, starting background update");
        self.spawn_update()
    }

    pub async fn update_status(&self) -> UpdateStatus {
        let tracker = self.pipeline.tracker();
        let interval = self.config.scraping.update_interval_days;
        UpdateStatus {
            last_update: tracker.last_update().await,
            should_update: tracker.should_update(interval).await,
            update_interval_days: interval,
            running: self.is_running(),
        }
    }

    /// Forget the last successful run; `true` when a marker was removed
    pub async fn reset_update(&self) -> anyhow::Result<bool> {
        self.pipeline.tracker().reset().await
    }
}
