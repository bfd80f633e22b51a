//! Parsing error types for scraped tables and payloads
//!
//! Every variant describes one page or payload that yielded nothing usable; callers count
//! them as failed pages and carry on with the rest of the source.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Payload is not valid JSON: {reason}")]
    InvalidJson { reason: String },

    #[error("Unexpected JSON shape: {detail}")]
    UnexpectedJsonShape { detail: String },

    #[error("No table found in document (selector '{selector}')")]
    NoTableFound { selector: String },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolutionFailed {
        url: String,
        reason: String,
        base_url: Option<String>,
    },
}

impl ParsingError {
    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_json(reason: impl ToString) -> Self {
        Self::InvalidJson {
            reason: reason.to_string(),
        }
    }

    pub fn unexpected_json_shape(detail: &str) -> Self {
        Self::UnexpectedJsonShape {
            detail: detail.to_string(),
        }
    }

    pub fn url_resolution_failed(url: &str, reason: impl ToString, base_url: Option<&str>) -> Self {
        Self::UrlResolutionFailed {
            url: url.to_string(),
            reason: reason.to_string(),
            base_url: base_url.map(str::to_string),
        }
    }

    /// Whether a different tier could still succeed on the same page.
    ///
    /// A missing table may just mean the page is client-rendered; a bad selector or URL
    /// will fail the same way everywhere.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidSelector { .. } | Self::UrlResolutionFailed { .. } => false,
            Self::InvalidJson { .. } | Self::UnexpectedJsonShape { .. } | Self::NoTableFound { .. } => true,
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
