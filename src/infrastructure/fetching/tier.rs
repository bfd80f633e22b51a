//! Fallback tiers and their outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::component::RawComponentRow;

/// The three acquisition strategies, tried in [`FetchTier::CHAIN`] order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchTier {
    StaticHtml,
    ApiDiscovery,
    HeadlessRender,
}

impl FetchTier {
    pub const CHAIN: [FetchTier; 3] = [
        FetchTier::StaticHtml,
        FetchTier::ApiDiscovery,
        FetchTier::HeadlessRender,
    ];
}

impl fmt::Display for FetchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchTier::StaticHtml => "static HTML",
            FetchTier::ApiDiscovery => "API discovery",
            FetchTier::HeadlessRender => "headless render",
        };
        f.write_str(name)
    }
}

/// Rows gathered by one tier across the page range
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierRows {
    pub rows: Vec<RawComponentRow>,
    /// Rows rejected by the field extractor
    pub dropped: usize,
    pub failed_pages: Vec<u32>,
}

impl TierRows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// What a tier hands back to the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    Rows(TierRows),
    TryNext(String),
}

impl TierOutcome {
    pub fn try_next(reason: impl Into<String>) -> Self {
        TierOutcome::TryNext(reason.into())
    }
}
