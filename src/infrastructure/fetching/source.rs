//! One catalog source resolved from configuration

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use url::Url;

use crate::domain::component::ComponentKind;
use crate::infrastructure::config::{ScrapingConfig, SourceConfig};
use crate::infrastructure::http_client::{FetchError, build_url};
use crate::infrastructure::parsing::ExtractionRules;

/// Everything a fetcher needs to know about one site
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub kind: ComponentKind,
    pub base_url: String,
    pub start_page: u32,
    pub end_page: u32,
    pub query: BTreeMap<String, String>,
    pub render_selector: String,
    pub rules: ExtractionRules,
}

impl SourceSpec {
    pub fn new(kind: ComponentKind, config: &SourceConfig, rules: ExtractionRules) -> Self {
        Self {
            kind,
            base_url: config.base_url.clone(),
            start_page: config.start_page,
            end_page: config.end_page,
            query: config.query.clone(),
            render_selector: config.render_selector.clone(),
            rules,
        }
    }

    /// Spec for a scraped kind; `None` for CRUD-only kinds
    pub fn for_kind(kind: ComponentKind, config: &ScrapingConfig) -> Option<Self> {
        let source = config.source(kind)?;
        let rules = ExtractionRules::for_kind(kind)?;
        Some(Self::new(kind, source, rules))
    }

    /// All configured sources in load order (CPU, GPU, PSU)
    pub fn all(config: &ScrapingConfig) -> Vec<Self> {
        ComponentKind::SCRAPED
            .into_iter()
            .filter_map(|kind| Self::for_kind(kind, config))
            .collect()
    }

    pub fn pages(&self) -> RangeInclusive<u32> {
        self.start_page..=self.end_page
    }

    /// Pages after the start page
    pub fn remaining_pages(&self) -> RangeInclusive<u32> {
        self.start_page.saturating_add(1)..=self.end_page
    }

    /// Listing URL for one page: `page` first, then the fixed query parameters
    pub fn page_url(&self, page: u32) -> Result<Url, FetchError> {
        let params = std::iter::once(("page", page.to_string())).chain(
            self.query
                .iter()
                .map(|(key, value)| (key.as_str(), value.clone())),
        );
        build_url(&self.base_url, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::parsing::{CPU_RULES, PSU_RULES};

    fn source(base_url: &str, query: &[(&str, &str)]) -> SourceConfig {
        SourceConfig {
            base_url: base_url.to_string(),
            start_page: 1,
            end_page: 4,
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            render_selector: "table".to_string(),
        }
    }

    #[test]
    fn test_page_url_puts_page_first() {
        let spec = SourceSpec::new(
            ComponentKind::Cpu,
            &source("https://cpus.example.net/search", &[("q", ""), ("sort", "name")]),
            CPU_RULES,
        );

        let url = spec.page_url(3).unwrap();

        assert_eq!(url.as_str(), "https://cpus.example.net/search?page=3&q=&sort=name");
    }

    #[test]
    fn test_page_url_keeps_base_query() {
        let spec = SourceSpec::new(
            ComponentKind::Psu,
            &source("https://psu.example.net/index.php?option=psu-performance-database", &[]),
            PSU_RULES,
        );

        let url = spec.page_url(2).unwrap();

        assert_eq!(
            url.as_str(),
            "https://psu.example.net/index.php?option=psu-performance-database&page=2"
        );
    }

    #[test]
    fn test_page_ranges() {
        let spec = SourceSpec::new(ComponentKind::Cpu, &source("https://x.test/", &[]), CPU_RULES);
        assert_eq!(spec.pages().count(), 4);
        assert_eq!(spec.remaining_pages().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_default_sources_in_load_order() {
        let kinds: Vec<_> = SourceSpec::all(&ScrapingConfig::default())
            .into_iter()
            .map(|spec| spec.kind)
            .collect();
        assert_eq!(kinds, ComponentKind::SCRAPED.to_vec());
        assert!(SourceSpec::for_kind(ComponentKind::Ram, &ScrapingConfig::default()).is_none());
    }
}
