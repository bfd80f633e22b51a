//! Scrape pipeline orchestration
//!
//! One run walks the sources in load order (CPU, GPU, PSU): fetch, extract, resolve PSU
//! wattage, load. Source failures are folded into the run summary; nothing below this
//! layer can fail the whole run except a load that did not commit.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::runtime::Handle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::component::{ComponentKind, ComponentRecord, RawComponentRow};
use crate::domain::wattage::resolve_psus;
use crate::infrastructure::config::ScrapingConfig;
use crate::infrastructure::fetching::{FetchTier, SourceFetcher, SourceSpec};
use crate::infrastructure::loader::{ComponentLoader, LoadReport};
use crate::infrastructure::update_tracker::UpdateTracker;

/// Per-source part of a run summary
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub kind: ComponentKind,
    pub tier: Option<FetchTier>,
    /// Distinct rows the fetcher produced
    pub fetched: usize,
    /// Rows rejected by the field extractor
    pub extraction_dropped: usize,
    pub duplicates: usize,
    /// PSU rows without an in-band wattage
    pub resolver_dropped: usize,
    pub failed_pages: Vec<u32>,
    pub load: Option<LoadReport>,
    /// Load failure, when the batch was rolled back
    pub error: Option<String>,
}

impl SourceSummary {
    pub fn added(&self) -> usize {
        self.load.map_or(0, |report| report.added)
    }
}

/// Outcome of one full run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub message: String,
    pub sources: Vec<SourceSummary>,
}

impl RunSummary {
    fn failed(run_id: Uuid, started_at: DateTime<Utc>, message: String) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            success: false,
            message,
            sources: Vec::new(),
        }
    }

    pub fn total_added(&self) -> usize {
        self.sources.iter().map(SourceSummary::added).sum()
    }
}

/// Typed records for a kind, plus the number of rows the wattage resolver rejected
pub fn to_records(kind: ComponentKind, rows: Vec<RawComponentRow>) -> (Vec<ComponentRecord>, usize) {
    if kind == ComponentKind::Psu {
        let (psus, dropped) = resolve_psus(rows);
        return (psus.into_iter().map(ComponentRecord::from).collect(), dropped);
    }
    let records = rows
        .into_iter()
        .filter_map(|row| ComponentRecord::power(kind, row.into_power_record()))
        .collect();
    (records, 0)
}

#[derive(Clone)]
pub struct ScrapePipeline {
    fetcher: SourceFetcher,
    loader: ComponentLoader,
    sources: Vec<SourceSpec>,
    tracker: UpdateTracker,
    /// Runtime the runs are spawned on; HTTP workers trigger runs from their own runtimes
    runtime: Handle,
}

impl ScrapePipeline {
    pub fn new(
        fetcher: SourceFetcher,
        loader: ComponentLoader,
        sources: Vec<SourceSpec>,
        tracker: UpdateTracker,
        runtime: Handle,
    ) -> Self {
        Self {
            fetcher,
            loader,
            sources,
            tracker,
            runtime,
        }
    }

    /// Must be called from within the runtime that should execute the runs
    pub fn from_config(config: &ScrapingConfig, pool: SqlitePool) -> anyhow::Result<Self> {
        let runtime = Handle::try_current().context("Scrape pipeline needs a Tokio runtime")?;
        Ok(Self::new(
            SourceFetcher::from_scraping_config(config)?,
            ComponentLoader::new(pool),
            SourceSpec::all(config),
            UpdateTracker::new(config.update_tracker_path.clone()),
            runtime,
        ))
    }

    pub fn tracker(&self) -> &UpdateTracker {
        &self.tracker
    }

    /// Run on a background task and wait for its summary
    pub async fn run(&self) -> RunSummary {
        self.run_holding(()).await
    }

    /// Like [`run`](Self::run), but `held` moves into the background task and is dropped
    /// only when the run ends, even if the caller stops waiting first.
    pub async fn run_holding<G: Send + 'static>(&self, held: G) -> RunSummary {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let pipeline = self.clone();

        let task = self.runtime.spawn(async move {
            let _held = held;
            pipeline.execute(run_id, started_at).await
        });
        match task.await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Run {} aborted: {}", run_id, e);
                RunSummary::failed(run_id, started_at, format!("Update aborted: {e}"))
            }
        }
    }

    async fn execute(&self, run_id: Uuid, started_at: DateTime<Utc>) -> RunSummary {
        info!("🚀 Run {} started ({} sources)", run_id, self.sources.len());
        let mut sources = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            sources.push(self.run_source(source).await);
        }

        let load_failures: Vec<ComponentKind> = sources
            .iter()
            .filter(|s| s.error.is_some())
            .map(|s| s.kind)
            .collect();
        let produced_rows = sources.iter().any(|s| s.fetched > 0);
        let success = load_failures.is_empty() && produced_rows;

        let message = if success {
            let added: usize = sources.iter().map(SourceSummary::added).sum();
            format!("Update completed: {added} new components")
        } else if !load_failures.is_empty() {
            let kinds: Vec<String> = load_failures.iter().map(ToString::to_string).collect();
            format!("Update failed: could not store {}", kinds.join(", "))
        } else {
            "Update failed: no source produced any rows".to_string()
        };

        if success {
            if let Err(e) = self.tracker.record_success().await {
                warn!("Run succeeded but the tracker was not updated: {:#}", e);
            }
        }

        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            success,
            message,
            sources,
        };
        info!(
            "🏁 Run {} finished: success={} ({})",
            run_id, summary.success, summary.message
        );
        summary
    }

    async fn run_source(&self, source: &SourceSpec) -> SourceSummary {
        let report = self.fetcher.fetch(source).await;
        let fetched = report.rows.len();
        let (records, resolver_dropped) = to_records(source.kind, report.rows);
        if resolver_dropped > 0 {
            info!("{}: {} rows without an in-band wattage dropped", source.kind, resolver_dropped);
        }

        let mut summary = SourceSummary {
            kind: source.kind,
            tier: report.tier,
            fetched,
            extraction_dropped: report.dropped,
            duplicates: report.duplicates,
            resolver_dropped,
            failed_pages: report.failed_pages,
            load: None,
            error: None,
        };

        if records.is_empty() {
            warn!("{}: nothing to load", source.kind);
            return summary;
        }

        match self.loader.load(source.kind, &records).await {
            Ok(load) => summary.load = Some(load),
            Err(e) => {
                error!("{}: {}", source.kind, e);
                summary.error = Some(e.to_string());
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_rows_keep_raw_text() {
        let (records, dropped) = to_records(
            ComponentKind::Cpu,
            vec![RawComponentRow::new("Ryzen 5 5600X", "65 W")],
        );

        assert_eq!(dropped, 0);
        assert_eq!(records.len(), 1);
        assert!(matches!(&records[0], ComponentRecord::Cpu(r) if r.consumption == "65 W"));
    }

    #[test]
    fn test_psu_rows_are_resolved() {
        let (records, dropped) = to_records(
            ComponentKind::Psu,
            vec![
                RawComponentRow::new("Corsair RM750x", ""),
                RawComponentRow::new("EVGA SuperNOVA G2", "80+ Gold"),
            ],
        );

        assert_eq!(dropped, 1);
        assert!(matches!(&records[..], [ComponentRecord::Psu(r)] if r.wattage == 750));
    }
}
