//! Bounded concurrent page fetching
//!
//! Every page runs on its own task: a failed or panicked page is logged and recorded, and
//! the remaining pages carry on. Parsing is moved onto the blocking pool with
//! [`parse_blocking`].

use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::{debug, warn};

use super::tier::TierRows;
use crate::infrastructure::http_client::FetchError;
use crate::infrastructure::parsing::Extraction;

pub const MIN_PAGE_WORKERS: usize = 8;
pub const MAX_PAGE_WORKERS: usize = 20;

/// Clamp a configured worker count into `MIN_PAGE_WORKERS..=MAX_PAGE_WORKERS`
pub fn clamp_workers(requested: usize) -> usize {
    requested.clamp(MIN_PAGE_WORKERS, MAX_PAGE_WORKERS)
}

/// Result of fetching a page range
pub type PageHarvest = TierRows;

/// Run a CPU-bound parse on the blocking pool
pub async fn parse_blocking<T, F>(parse: F) -> Result<T, FetchError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(parse)
        .await
        .map_err(|e| FetchError::Join(e.to_string()))
}

/// Run `fetch_one` for every page, each on a spawned task, with at most `concurrency`
/// (clamped) in flight.
///
/// Rows are merged in page order regardless of completion order.
pub async fn fetch_pages<P, F, Fut>(pages: P, concurrency: usize, fetch_one: F) -> PageHarvest
where
    P: IntoIterator<Item = u32>,
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<Extraction, FetchError>> + Send + 'static,
{
    let workers = clamp_workers(concurrency);

    let mut results: Vec<(u32, Result<Extraction, FetchError>)> = stream::iter(pages)
        .map(|page| {
            let task = tokio::spawn(fetch_one(page));
            async move {
                let result = task
                    .await
                    .unwrap_or_else(|e| Err(FetchError::Join(e.to_string())));
                (page, result)
            }
        })
        .buffer_unordered(workers)
        .collect()
        .await;
    results.sort_by_key(|(page, _)| *page);

    let mut harvest = PageHarvest::default();
    for (page, result) in results {
        match result {
            Ok(extraction) => {
                debug!("Page {}: {} rows, {} dropped", page, extraction.rows.len(), extraction.dropped);
                harvest.rows.extend(extraction.rows);
                harvest.dropped += extraction.dropped;
            }
            Err(e) => {
                warn!("Page {} failed: {}", page, e);
                harvest.failed_pages.push(page);
            }
        }
    }
    harvest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::component::RawComponentRow;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_clamp_workers() {
        assert_eq!(clamp_workers(1), 8);
        assert_eq!(clamp_workers(12), 12);
        assert_eq!(clamp_workers(64), 20);
    }

    #[tokio::test]
    async fn test_rows_merged_in_page_order() {
        let harvest = fetch_pages(1..=5, 8, |page| async move {
            // later pages finish first
            tokio::time::sleep(Duration::from_millis(u64::from(10 * (6 - page)))).await;
            Ok(Extraction {
                rows: vec![RawComponentRow::new(format!("part {page}"), "10 W")],
                dropped: 1,
            })
        })
        .await;

        let names: Vec<_> = harvest.rows.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, vec!["part 1", "part 2", "part 3", "part 4", "part 5"]);
        assert_eq!(harvest.dropped, 5);
        assert!(harvest.failed_pages.is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        fetch_pages(1..=40, 100, |_| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(Extraction::default())
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= MAX_PAGE_WORKERS);
    }

    #[tokio::test]
    async fn test_failed_page_does_not_abort_others() {
        let harvest = fetch_pages(1..=10, 8, |page| async move {
            if page == 3 {
                return Err(FetchError::Join("connection reset".into()));
            }
            Ok(Extraction {
                rows: vec![RawComponentRow::new(format!("part {page}"), "10 W")],
                dropped: 0,
            })
        })
        .await;

        assert_eq!(harvest.rows.len(), 9);
        assert!(!harvest.rows.iter().any(|row| row.name == "part 3"));
        assert_eq!(harvest.failed_pages, vec![3]);
    }

    #[tokio::test]
    async fn test_panicked_page_is_recorded_as_failed() {
        let harvest = fetch_pages(1..=4, 8, |page| async move {
            if page == 2 {
                panic!("parser blew up");
            }
            Ok::<_, FetchError>(Extraction {
                rows: vec![RawComponentRow::new(format!("part {page}"), "10 W")],
                dropped: 0,
            })
        })
        .await;

        assert_eq!(harvest.rows.len(), 3);
        assert_eq!(harvest.failed_pages, vec![2]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pages_run_in_parallel_on_worker_threads() {
        let threads = Arc::new(std::sync::Mutex::new(std::collections::HashSet::new()));

        fetch_pages(1..=16, 8, |_| {
            let threads = threads.clone();
            async move {
                // blocks its worker thread; only spawned tasks can overlap this
                std::thread::sleep(Duration::from_millis(20));
                threads.lock().unwrap().insert(std::thread::current().id());
                Ok::<_, FetchError>(Extraction::default())
            }
        })
        .await;

        assert!(threads.lock().unwrap().len() > 1);
    }

    #[tokio::test]
    async fn test_parse_blocking_returns_value() {
        let parsed = parse_blocking(|| "<table>".len()).await.unwrap();
        assert_eq!(parsed, 7);
    }
}
