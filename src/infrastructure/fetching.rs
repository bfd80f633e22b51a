//! Catalog source fetching
//!
//! Each source is fetched by walking an ordered chain of tiers (static HTML, embedded
//! API discovery, headless render) until one yields rows.

pub mod api_discovery;
pub mod headless_render;
pub mod pager;
pub mod source;
pub mod source_fetcher;
pub mod static_html;
pub mod tier;

pub use headless_render::PageRenderer;
pub use pager::{MAX_PAGE_WORKERS, MIN_PAGE_WORKERS, PageHarvest, clamp_workers, fetch_pages};
pub use source::SourceSpec;
pub use source_fetcher::{SourceFetcher, SourceReport};
pub use tier::{FetchTier, TierOutcome, TierRows};
