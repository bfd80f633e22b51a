//! Client-rendered page detection and embedded API discovery
//!
//! Catalog pages that render their table with JavaScript usually fetch it from a JSON
//! endpoint whose URL sits in an inline script. Those literals are the candidates the
//! discovery tier probes.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// Body fragments that mark a page as unusable without JavaScript
pub const JS_MARKERS: [&str; 3] = [
    "This site requires JavaScript",
    "doesn't work properly without JavaScript",
    "Please enable JavaScript",
];

static SCRIPT: Lazy<Selector> = Lazy::new(|| Selector::parse("script").unwrap());

/// `fetch('..')`, `axios.get('..')`, `xhr.open('GET', '..')`, `$.getJSON('..')`
static CALL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"fetch\(\s*['"]([^'"]+)['"]"#,
        r#"axios\.get\(\s*['"]([^'"]+)['"]"#,
        r#"(?i:xhr)\.open\(\s*['"]GET['"]\s*,\s*['"]([^'"]+)['"]"#,
        r#"\$\.getJSON\(\s*['"]([^'"]+)['"]"#,
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

pub fn is_js_gated(body: &str) -> bool {
    JS_MARKERS.iter().any(|marker| body.contains(marker))
}

/// Concatenated text of every inline `<script>`
pub fn inline_script_text(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .select(&SCRIPT)
        .flat_map(|script| script.text())
        .collect::<Vec<_>>()
        .join("\n")
}

/// URL literals passed to network calls, in order of appearance, without duplicates
pub fn candidate_literals(script_text: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = CALL_PATTERNS
        .iter()
        .flat_map(|pattern| {
            pattern.captures_iter(script_text).filter_map(|caps| {
                let literal = caps.get(1)?;
                Some((literal.start(), literal.as_str().to_string()))
            })
        })
        .collect();
    found.sort_by_key(|(position, _)| *position);

    let mut literals: Vec<String> = Vec::with_capacity(found.len());
    for (_, literal) in found {
        if !literals.contains(&literal) {
            literals.push(literal);
        }
    }
    literals
}

/// Candidate endpoints from a page body, resolved against the page URL
pub fn discover_endpoints(html: &str, base: &Url) -> Vec<Url> {
    candidate_literals(&inline_script_text(html))
        .into_iter()
        .filter_map(|literal| match base.join(&literal) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
            Ok(url) => {
                debug!("Skipping non-HTTP endpoint candidate {}", url);
                None
            }
            Err(e) => {
                debug!("Cannot resolve endpoint candidate {:?}: {}", literal, e);
                None
            }
        })
        .collect()
}

/// Same URL with its `page` parameter set to `page` (appended when absent)
pub fn with_page(url: &Url, page: u32) -> Url {
    let mut replaced = false;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            if key == "page" {
                replaced = true;
                (key.into_owned(), page.to_string())
            } else {
                (key.into_owned(), value.into_owned())
            }
        })
        .collect();

    let mut paged = url.clone();
    {
        let mut query = paged.query_pairs_mut();
        query.clear();
        query.extend_pairs(pairs);
        if !replaced {
            query.append_pair("page", &page.to_string());
        }
    }
    paged
}

/// Whether a probe response looks like JSON
pub fn looks_like_json(content_type: Option<&str>, body: &str) -> bool {
    let declared = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
    let trimmed = body.trim_start();
    declared || trimmed.starts_with('{') || trimmed.starts_with('[')
}
