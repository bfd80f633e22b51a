//! Idempotent batch loader
//!
//! One transaction per component kind. A row is inserted only when its name is absent;
//! existing rows are never updated.

use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::component::{ComponentKind, ComponentRecord};
use crate::infrastructure::component_repository::{insert_record, name_exists};

/// Counts for one loaded batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub kind: ComponentKind,
    pub added: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl LoadReport {
    fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            added: 0,
            skipped: 0,
            errored: 0,
        }
    }
}

/// Transaction-level failures; the whole batch for the kind is rolled back
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to begin {kind} transaction: {source}")]
    Begin {
        kind: ComponentKind,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to commit {kind} batch: {source}")]
    Commit {
        kind: ComponentKind,
        #[source]
        source: sqlx::Error,
    },
}

#[derive(Clone)]
pub struct ComponentLoader {
    pool: SqlitePool,
}

impl ComponentLoader {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert every record whose name is not yet present in `kind`'s table
    pub async fn load(&self, kind: ComponentKind, records: &[ComponentRecord]) -> Result<LoadReport, LoadError> {
        let mut report = LoadReport::new(kind);
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|source| LoadError::Begin { kind, source })?;

        for record in records {
            let name = record.name();
            if name.trim().is_empty() {
                debug!("Skipping {} row with empty name", kind);
                report.skipped += 1;
                continue;
            }
            if record.kind() != kind {
                warn!("{} row {:?} staged into {} batch", record.kind(), name, kind);
                report.errored += 1;
                continue;
            }

            match name_exists(&mut *tx, kind, name).await {
                Ok(true) => {
                    report.skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Lookup of {} {:?} failed: {}", kind, name, e);
                    report.errored += 1;
                    continue;
                }
            }

            match insert_record(&mut *tx, record).await {
                Ok(()) => report.added += 1,
                Err(e) => {
                    warn!("Insert of {} {:?} failed: {}", kind, name, e);
                    report.errored += 1;
                }
            }
        }

        tx.commit()
            .await
            .map_err(|source| LoadError::Commit { kind, source })?;

        info!(
            "💾 {} loaded: {} added, {} skipped, {} errored",
            kind, report.added, report.skipped, report.errored
        );
        Ok(report)
    }
}
