//! Embedded API discovery tier
//!
//! Probes the URL literals found in the start page's inline scripts. The first one that
//! answers with rows becomes a page template replicated over the whole range.

use tracing::{debug, info};
use url::Url;

use super::pager::{fetch_pages, parse_blocking};
use super::source::SourceSpec;
use super::tier::{TierOutcome, TierRows};
use crate::infrastructure::http_client::{FetchError, HttpClient};
use crate::infrastructure::parsing::{Extraction, extract_from_json, script_probe};

pub async fn discover_api(
    client: &HttpClient,
    source: &SourceSpec,
    start_body: Option<&str>,
    workers: usize,
) -> TierOutcome {
    let Some(body) = start_body else {
        return TierOutcome::try_next("no start page to scan for endpoints");
    };
    let base = match source.page_url(source.start_page) {
        Ok(url) => url,
        Err(e) => return TierOutcome::try_next(e.to_string()),
    };

    let candidates = script_probe::discover_endpoints(body, &base);
    if candidates.is_empty() {
        return TierOutcome::try_next("no endpoint literals in inline scripts");
    }
    debug!("{} endpoint candidates for {}", candidates.len(), source.kind);

    for endpoint in candidates {
        let Some(probe) = probe_endpoint(client, source, &endpoint).await else {
            continue;
        };
        info!("🔎 {} JSON endpoint found: {} ({} rows)", source.kind, endpoint, probe.rows.len());

        let rules = source.rules;
        let replicated = fetch_pages(source.pages(), workers, |page| {
            let url = script_probe::with_page(&endpoint, page);
            let client = client.clone();
            async move {
                let body = client.fetch_text(&url).await?;
                Ok::<_, FetchError>(parse_blocking(move || extract_from_json(&body, &rules)).await??)
            }
        })
        .await;

        if replicated.is_empty() {
            debug!("Replicated fetch of {} yielded nothing, keeping probe rows", endpoint);
            return TierOutcome::Rows(TierRows {
                rows: probe.rows,
                dropped: probe.dropped,
                failed_pages: replicated.failed_pages,
            });
        }
        return TierOutcome::Rows(replicated);
    }

    TierOutcome::try_next("no endpoint candidate returned rows")
}

/// `Some` when the endpoint answers 200 with a JSON body that yields rows
async fn probe_endpoint(client: &HttpClient, source: &SourceSpec, endpoint: &Url) -> Option<Extraction> {
    let page = match client.fetch(endpoint).await {
        Ok(page) => page,
        Err(e) => {
            debug!("Probe {} failed: {}", endpoint, e);
            return None;
        }
    };
    if page.status != reqwest::StatusCode::OK
        || !script_probe::looks_like_json(page.content_type.as_deref(), &page.body)
    {
        debug!("Probe {} is not a JSON endpoint", endpoint);
        return None;
    }

    match extract_from_json(&page.body, &source.rules) {
        Ok(extraction) if !extraction.is_empty() => Some(extraction),
        Ok(_) => {
            debug!("Probe {} returned no rows", endpoint);
            None
        }
        Err(e) => {
            debug!("Probe {} payload rejected: {}", endpoint, e);
            None
        }
    }
}
