//! Last-successful-run marker
//!
//! A small JSON file, `{"last_update": "<RFC 3339>"}`, decides whether a refresh is due.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize)]
struct TrackerFile {
    last_update: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UpdateTracker {
    path: PathBuf,
}

impl UpdateTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when no run has succeeded yet or the file is unreadable
    pub async fn last_update(&self) -> Option<DateTime<Utc>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Cannot read update tracker {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<TrackerFile>(&content) {
            Ok(file) => Some(file.last_update),
            Err(e) => {
                warn!("Ignoring malformed update tracker {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub async fn record_success(&self) -> Result<DateTime<Utc>> {
        self.record_at(Utc::now()).await
    }

    pub async fn record_at(&self, when: DateTime<Utc>) -> Result<DateTime<Utc>> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(&TrackerFile { last_update: when })?;
        fs::write(&self.path, content)
            .await
            .with_context(|| format!("Failed to write update tracker {}", self.path.display()))?;
        info!("Recorded successful update at {}", when.to_rfc3339());
        Ok(when)
    }

    /// True when nothing was recorded or the last success is at least `interval_days` old
    pub async fn should_update(&self, interval_days: i64) -> bool {
        self.should_update_at(interval_days, Utc::now()).await
    }

    pub async fn should_update_at(&self, interval_days: i64, now: DateTime<Utc>) -> bool {
        match self.last_update().await {
            Some(last) => now - last >= Duration::days(interval_days),
            None => true,
        }
    }

    /// Forget the last run so the next check triggers a refresh
    pub async fn reset(&self) -> Result<bool> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Update tracker reset");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_means_update_due() {
        let dir = tempdir().unwrap();
        let tracker = UpdateTracker::new(dir.path().join(".last_update.json"));

        assert!(tracker.last_update().await.is_none());
        assert!(tracker.should_update(180).await);
        assert!(!tracker.reset().await.unwrap());
    }

    #[tokio::test]
    async fn test_interval_threshold() {
        let dir = tempdir().unwrap();
        let tracker = UpdateTracker::new(dir.path().join("state").join("tracker.json"));
        let recorded = Utc::now() - Duration::days(10);
        tracker.record_at(recorded).await.unwrap();

        assert_eq!(tracker.last_update().await, Some(recorded));
        assert!(!tracker.should_update(180).await);
        assert!(tracker.should_update(10).await);
        assert!(
            tracker
                .should_update_at(180, recorded + Duration::days(180))
                .await
        );
    }

    #[tokio::test]
    async fn test_reset_and_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tracker.json");
        let tracker = UpdateTracker::new(&path);

        tracker.record_success().await.unwrap();
        assert!(tracker.reset().await.unwrap());
        assert!(tracker.last_update().await.is_none());

        std::fs::write(&path, "not json").unwrap();
        assert!(tracker.last_update().await.is_none());
        assert!(tracker.should_update(180).await);
    }
}
