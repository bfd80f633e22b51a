//! Tiered source fetching
//!
//! Walks [`FetchTier::CHAIN`] until a tier produces rows. A source that exhausts the chain
//! is a soft failure: the report comes back with no tier and no rows.

use serde::Serialize;
use tracing::{info, warn};

use super::api_discovery::discover_api;
use super::headless_render::render_source;
use super::source::SourceSpec;
use super::static_html::fetch_static;
use super::tier::{FetchTier, TierOutcome};
use crate::domain::component::{ComponentKind, RawComponentRow, dedupe_by_name};
use crate::infrastructure::config::{RenderConfig, ScrapingConfig};
use crate::infrastructure::http_client::HttpClient;

/// What one source produced
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub kind: ComponentKind,
    /// Tier that produced the rows; `None` when every tier came up empty
    pub tier: Option<FetchTier>,
    #[serde(skip)]
    pub rows: Vec<RawComponentRow>,
    /// Rows rejected by the field extractor
    pub dropped: usize,
    /// Rows collapsed because an earlier row had the same name
    pub duplicates: usize,
    pub failed_pages: Vec<u32>,
}

impl SourceReport {
    fn empty(kind: ComponentKind) -> Self {
        Self {
            kind,
            tier: None,
            rows: Vec::new(),
            dropped: 0,
            duplicates: 0,
            failed_pages: Vec::new(),
        }
    }

    pub fn is_soft_failure(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Runs the tier chain for a source with a shared HTTP client
#[derive(Clone)]
pub struct SourceFetcher {
    client: HttpClient,
    page_workers: usize,
    render: RenderConfig,
}

impl SourceFetcher {
    pub fn new(client: HttpClient, page_workers: usize, render: RenderConfig) -> Self {
        Self {
            client,
            page_workers,
            render,
        }
    }

    pub fn from_scraping_config(config: &ScrapingConfig) -> anyhow::Result<Self> {
        let client = HttpClient::from_scraping_config(config)?;
        Ok(Self::new(client, config.page_workers, config.render.clone()))
    }

    pub async fn fetch(&self, source: &SourceSpec) -> SourceReport {
        let mut report = SourceReport::empty(source.kind);
        let mut start_body: Option<String> = None;

        for tier in FetchTier::CHAIN {
            let outcome = match tier {
                FetchTier::StaticHtml => {
                    let attempt = fetch_static(&self.client, source, self.page_workers).await;
                    start_body = attempt.start_body;
                    attempt.outcome
                }
                FetchTier::ApiDiscovery => {
                    discover_api(&self.client, source, start_body.as_deref(), self.page_workers).await
                }
                FetchTier::HeadlessRender => render_source(source, &self.render).await,
            };

            match outcome {
                TierOutcome::Rows(harvest) if !harvest.is_empty() => {
                    let fetched = harvest.rows.len();
                    report.tier = Some(tier);
                    report.rows = dedupe_by_name(harvest.rows);
                    report.duplicates = fetched - report.rows.len();
                    report.dropped = harvest.dropped;
                    report.failed_pages = harvest.failed_pages;
                    info!(
                        "✅ {} via {}: {} rows ({} dropped, {} duplicates, {} failed pages)",
                        source.kind,
                        tier,
                        report.rows.len(),
                        report.dropped,
                        report.duplicates,
                        report.failed_pages.len()
                    );
                    return report;
                }
                TierOutcome::Rows(harvest) => {
                    info!("{} tier {} yielded no rows", source.kind, tier);
                    report.failed_pages = harvest.failed_pages;
                }
                TierOutcome::TryNext(reason) => {
                    info!("{} tier {} passed: {}", source.kind, tier, reason);
                }
            }
        }

        warn!("⚠️ {}: no tier produced rows", source.kind);
        report
    }
}
