//! Static HTML tier: plain GETs over the page range

use std::sync::Arc;
use tracing::{debug, info};

use super::pager::{fetch_pages, parse_blocking};
use super::source::SourceSpec;
use super::tier::{TierOutcome, TierRows};
use crate::infrastructure::http_client::{FetchError, HttpClient};
use crate::infrastructure::parsing::{extract_from_html, script_probe};

/// Static tier result; the start page body is kept for API discovery
#[derive(Debug)]
pub struct StaticAttempt {
    pub outcome: TierOutcome,
    pub start_body: Option<String>,
}

pub async fn fetch_static(client: &HttpClient, source: &SourceSpec, workers: usize) -> StaticAttempt {
    let start_url = match source.page_url(source.start_page) {
        Ok(url) => url,
        Err(e) => {
            return StaticAttempt {
                outcome: TierOutcome::try_next(e.to_string()),
                start_body: None,
            };
        }
    };

    let body = match client.fetch_text(&start_url).await {
        Ok(body) => body,
        Err(e) => {
            return StaticAttempt {
                outcome: TierOutcome::try_next(format!("start page unavailable: {e}")),
                start_body: None,
            };
        }
    };

    if script_probe::is_js_gated(&body) {
        return StaticAttempt {
            outcome: TierOutcome::try_next("start page requires JavaScript"),
            start_body: Some(body),
        };
    }

    let rules = source.rules;
    let start_html = body.clone();
    let first = match parse_blocking(move || extract_from_html(&start_html, &rules)).await {
        Ok(first) => first,
        Err(e) => {
            return StaticAttempt {
                outcome: TierOutcome::try_next(e.to_string()),
                start_body: Some(body),
            };
        }
    };
    if first.is_empty() {
        return StaticAttempt {
            outcome: TierOutcome::try_next("no usable table on the start page"),
            start_body: Some(body),
        };
    }
    info!(
        "📄 {} start page: {} rows, fetching pages {}..={}",
        source.kind,
        first.rows.len(),
        source.start_page.saturating_add(1),
        source.end_page
    );

    let shared = Arc::new(source.clone());
    let rest = fetch_pages(source.remaining_pages(), workers, |page| {
        let client = client.clone();
        let source = Arc::clone(&shared);
        async move {
            let url = source.page_url(page)?;
            let html = client.fetch_text(&url).await?;
            let rules = source.rules;
            let extraction = parse_blocking(move || extract_from_html(&html, &rules)).await?;
            if extraction.is_empty() {
                debug!("{} page {} has no rows", source.kind, page);
            }
            Ok::<_, FetchError>(extraction)
        }
    })
    .await;

    let mut rows = first.rows;
    rows.extend(rest.rows);
    StaticAttempt {
        outcome: TierOutcome::Rows(TierRows {
            rows,
            dropped: first.dropped + rest.dropped,
            failed_pages: rest.failed_pages,
        }),
        start_body: Some(body),
    }
}
