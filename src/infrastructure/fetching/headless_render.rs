//! Headless browser tier
//!
//! A synchronous subsystem: pages are rendered one after another in a single tab. Async
//! callers only reach it through [`render_source`], which moves the whole job onto the
//! blocking pool.

use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::source::SourceSpec;
use super::tier::{TierOutcome, TierRows};
use crate::infrastructure::config::RenderConfig;
use crate::infrastructure::http_client::FetchError;
use crate::infrastructure::parsing::{extract_best, tables_matching};

/// Loads a page and returns the outer HTML of the first element matching `selector`
pub trait PageRenderer {
    fn render(&mut self, url: &Url, selector: &str, timeout: Duration) -> Result<String, FetchError>;
}

/// Render every page of `source` with `renderer`.
///
/// A page that fails to render is recorded and skipped. The range ends early only after
/// `max_consecutive_empty` rendered pages in a row came back without rows.
pub fn render_pages<R: PageRenderer>(renderer: &mut R, source: &SourceSpec, config: &RenderConfig) -> TierRows {
    let mut harvest = TierRows::default();
    let mut consecutive_empty = 0u32;

    for page in source.pages() {
        if config.max_consecutive_empty > 0 && consecutive_empty >= config.max_consecutive_empty {
            info!(
                "{} render stopped at page {} after {} empty pages",
                source.kind, page, consecutive_empty
            );
            break;
        }

        let rendered = source.page_url(page).and_then(|url| {
            let html = renderer.render(&url, &source.render_selector, config.wait_timeout())?;
            Ok(tables_matching(&html, &source.render_selector)?)
        });

        match rendered {
            Ok(tables) => {
                let extraction = extract_best(&tables, &source.rules);
                if extraction.is_empty() {
                    debug!("{} rendered page {} has no rows", source.kind, page);
                    consecutive_empty += 1;
                } else {
                    consecutive_empty = 0;
                }
                harvest.dropped += extraction.dropped;
                harvest.rows.extend(extraction.rows);
            }
            Err(e) => {
                warn!("{} render of page {} failed: {}", source.kind, page, e);
                harvest.failed_pages.push(page);
            }
        }
    }

    harvest
}

/// Run the render tier for one source off the async runtime
pub async fn render_source(source: &SourceSpec, config: &RenderConfig) -> TierOutcome {
    if !config.enabled {
        return TierOutcome::try_next("headless rendering disabled");
    }

    let source = source.clone();
    let config = config.clone();
    match tokio::task::spawn_blocking(move || render_blocking(&source, &config)).await {
        Ok(outcome) => outcome,
        Err(e) => TierOutcome::try_next(FetchError::Join(e.to_string()).to_string()),
    }
}

#[cfg(feature = "browser")]
fn render_blocking(source: &SourceSpec, config: &RenderConfig) -> TierOutcome {
    let mut renderer = match chrome::ChromeRenderer::launch(config) {
        Ok(renderer) => renderer,
        Err(e) => return TierOutcome::try_next(format!("browser unavailable: {e}")),
    };
    info!("🖥️ Rendering {} pages {}..={}", source.kind, source.start_page, source.end_page);
    TierOutcome::Rows(render_pages(&mut renderer, source, config))
}

#[cfg(not(feature = "browser"))]
fn render_blocking(source: &SourceSpec, _config: &RenderConfig) -> TierOutcome {
    info!("{} render skipped: built without the browser feature", source.kind);
    TierOutcome::try_next("built without headless browser support")
}

#[cfg(feature = "browser")]
mod chrome {
    use headless_chrome::{Browser, LaunchOptions, Tab};
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;

    use super::PageRenderer;
    use crate::infrastructure::config::RenderConfig;
    use crate::infrastructure::http_client::FetchError;

    const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(300);

    pub struct ChromeRenderer {
        // keeps the browser process alive for the tab
        _browser: Browser,
        tab: Arc<Tab>,
    }

    impl ChromeRenderer {
        pub fn launch(config: &RenderConfig) -> Result<Self, FetchError> {
            let launch_error = |reason: String| FetchError::Render {
                url: String::new(),
                reason,
            };

            let options = LaunchOptions::default_builder()
                .headless(config.headless)
                .sandbox(false)
                .path(config.browser_path.clone())
                .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
                .build()
                .map_err(|e| launch_error(e.to_string()))?;
            let browser = Browser::new(options).map_err(|e| launch_error(e.to_string()))?;
            let tab = browser.new_tab().map_err(|e| launch_error(e.to_string()))?;

            Ok(Self { _browser: browser, tab })
        }
    }

    impl PageRenderer for ChromeRenderer {
        fn render(&mut self, url: &Url, selector: &str, timeout: Duration) -> Result<String, FetchError> {
            let render_error = |e: anyhow::Error| FetchError::Render {
                url: url.to_string(),
                reason: e.to_string(),
            };

            self.tab.navigate_to(url.as_str()).map_err(render_error)?;
            let element = self
                .tab
                .wait_for_element_with_custom_timeout(selector, timeout)
                .map_err(render_error)?;
            element.get_content().map_err(render_error)
        }
    }
}
