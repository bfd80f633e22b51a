//! Application layer module
//!
//! This module orchestrates scrape runs and holds the state shared with the HTTP API.

pub mod pipeline;
pub mod state;

pub use pipeline::{RunSummary, ScrapePipeline, SourceSummary};
pub use state::{AppState, TriggerError, UpdateStatus};
