//! Source Extractor: supplemental documentation links for an answer.
//!
//! The vector store remembers which corpus file each chunk came from
//! (`data\github\en\fork-a-repo.md`). The file stem makes a good web search
//! query, and the links found for it are offered to the reader next to the
//! answer.

use futures::StreamExt;
use gitbuddy_config::{SearchConfig, SourcesConfig};
use gitbuddy_core::retrieval::{RetrievedDocument, SearchEngine, format_results};
use regex_lite::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, warn};

/// Enterprise Server docs have free-version twins at the same path minus
/// this segment.
pub const ENTERPRISE_DOCS_FRAGMENT: &str = "/enterprise-server@3.6";

/// A search result that keeps coming back and no longer resolves.
pub const DEAD_LINK: &str = "https://playrusvulkan.org/tortoise-git-quick-guide";

/// A path segment between a backslash and the next dot.
static SOURCE_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([^\\.]*)\.").expect("source fragment regex"));

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://[^\]]+").expect("url regex"));

/// The `source` metadata of each document. Documents without one are skipped.
pub fn get_sources(docs: &[RetrievedDocument]) -> Vec<String> {
    docs.iter()
        .filter_map(|d| d.source())
        .map(str::to_string)
        .collect()
}

/// Search queries derived from source paths, deduplicated and sorted.
///
/// `data\github\en\fork-a-repo.md` yields `fork-a-repo`.
pub fn get_search_query(sources: &[String]) -> Vec<String> {
    sources
        .iter()
        .flat_map(|s| {
            SOURCE_FRAGMENT
                .captures_iter(s)
                .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                .collect::<Vec<_>>()
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Every `https://` URL in `text`, each running up to the next `]`.
pub fn parse_urls(text: &str) -> Vec<String> {
    URL.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Remove `fragment` from every element of every list.
pub fn remove_specific_string_from_list(nested: &[Vec<String>], fragment: &str) -> Vec<Vec<String>> {
    if fragment.is_empty() {
        return nested.to_vec();
    }
    nested
        .iter()
        .map(|list| list.iter().map(|e| e.replace(fragment, "")).collect())
        .collect()
}

/// Drop every element equal to `element`, keeping order.
pub fn remove_specific_element_from_list(nested: &[Vec<String>], element: &str) -> Vec<Vec<String>> {
    nested
        .iter()
        .map(|list| list.iter().filter(|e| *e != element).cloned().collect())
        .collect()
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Substring removed from every link.
    pub strip_fragment: String,
    /// Links never offered.
    pub dead_links: Vec<String>,
    /// Most searches run per answer.
    pub max_lookups: usize,
    /// Most searches in flight at once.
    pub concurrency: usize,
    pub lookup_timeout: Duration,
    /// Hits requested per search.
    pub max_results: usize,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            strip_fragment: ENTERPRISE_DOCS_FRAGMENT.into(),
            dead_links: vec![DEAD_LINK.into()],
            max_lookups: 5,
            concurrency: 3,
            lookup_timeout: Duration::from_secs(10),
            max_results: 4,
        }
    }
}

impl SourceSettings {
    pub fn from_config(sources: &SourcesConfig, search: &SearchConfig) -> Self {
        Self {
            strip_fragment: sources.strip_fragment.clone(),
            dead_links: sources.dead_links.clone(),
            max_lookups: sources.max_lookups,
            concurrency: sources.concurrency,
            lookup_timeout: Duration::from_secs(sources.lookup_timeout_secs),
            max_results: search.max_results,
        }
    }
}

/// Turns retrieved documents into a cleaned list of web links.
pub struct SourceExtractor {
    engine: Arc<dyn SearchEngine>,
    settings: SourceSettings,
}

impl SourceExtractor {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self {
            engine,
            settings: SourceSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SourceSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    /// Links for the documents' sources, deduplicated in first-seen order.
    ///
    /// Lookups that fail or time out contribute nothing.
    pub async fn resolve(&self, docs: &[RetrievedDocument]) -> Vec<String> {
        let mut queries = get_search_query(&get_sources(docs));
        if queries.len() > self.settings.max_lookups {
            debug!(
                queries = queries.len(),
                max = self.settings.max_lookups,
                "Capping source lookups"
            );
            queries.truncate(self.settings.max_lookups);
        }

        let lookups: Vec<_> = queries.iter().map(|q| self.lookup(q)).collect();
        let found: Vec<Vec<String>> = futures::stream::iter(lookups)
            .buffered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let mut cleaned = remove_specific_string_from_list(&found, &self.settings.strip_fragment);
        for dead in &self.settings.dead_links {
            cleaned = remove_specific_element_from_list(&cleaned, dead);
        }

        let mut seen = HashSet::new();
        let links: Vec<String> = cleaned
            .into_iter()
            .flatten()
            .filter(|link| seen.insert(link.clone()))
            .collect();

        debug!(lookups = queries.len(), links = links.len(), "Resolved source links");
        links
    }

    async fn lookup(&self, query: &str) -> Vec<String> {
        let search = self.engine.search(query, self.settings.max_results);
        match tokio::time::timeout(self.settings.lookup_timeout, search).await {
            Ok(Ok(hits)) => parse_urls(&format_results(&hits)),
            Ok(Err(e)) => {
                warn!(query, error = %e, "Source lookup failed");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    query,
                    timeout_secs = self.settings.lookup_timeout.as_secs(),
                    "Source lookup timed out"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::test_helpers::MockSearchEngine;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sources_come_from_metadata() {
        let mut bare = RetrievedDocument::new("no source", "x", 0.1);
        bare.metadata.clear();
        let docs = vec![
            RetrievedDocument::new("a", "data\\progit\\branching.pdf", 0.9),
            bare,
            RetrievedDocument::new("b", "data\\github\\en\\fork.md", 0.8),
        ];
        assert_eq!(
            get_sources(&docs),
            strings(&["data\\progit\\branching.pdf", "data\\github\\en\\fork.md"])
        );
    }

    #[test]
    fn search_query_takes_file_stems() {
        let sources = strings(&[
            "data\\github\\en\\fork-a-repo.md",
            "data\\progit\\branching.pdf",
            "data\\github\\en\\fork-a-repo.md",
        ]);
        assert_eq!(get_search_query(&sources), strings(&["branching", "fork-a-repo"]));
    }

    #[test]
    fn search_query_ignores_paths_without_backslash_and_dot() {
        assert!(get_search_query(&strings(&["plain.md", "data\\noext"])).is_empty());
    }

    #[test]
    fn urls_run_to_closing_bracket() {
        let text = "[snippet: s, title: t, link: https://git-scm.com/docs/git-stash], \
                    [snippet: u, title: v, link: https://docs.github.com/en/get-started]";
        assert_eq!(
            parse_urls(text),
            strings(&[
                "https://git-scm.com/docs/git-stash",
                "https://docs.github.com/en/get-started"
            ])
        );
        assert!(parse_urls("no links http://insecure.example]").is_empty());
    }

    #[test]
    fn removes_substring_from_every_element() {
        let nested = vec![
            strings(&["https://docs.github.com/en/enterprise-server@3.6/repos"]),
            strings(&["https://git-scm.com"]),
        ];
        let out = remove_specific_string_from_list(&nested, ENTERPRISE_DOCS_FRAGMENT);
        assert_eq!(out[0], strings(&["https://docs.github.com/en/repos"]));
        assert_eq!(out[1], strings(&["https://git-scm.com"]));
        // input untouched
        assert!(nested[0][0].contains("enterprise"));
    }

    #[test]
    fn removes_matching_elements_keeping_order() {
        let nested = vec![strings(&["a", DEAD_LINK, "b", DEAD_LINK]), strings(&[DEAD_LINK])];
        let out = remove_specific_element_from_list(&nested, DEAD_LINK);
        assert_eq!(out, vec![strings(&["a", "b"]), Vec::<String>::new()]);
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let nested = vec![
            strings(&[
                "https://git-scm.com/docs",
                "https://docs.github.com/en/enterprise-server@3.6/repos",
                DEAD_LINK,
                "https://tortoisegit.org/docs",
            ]),
            strings(&["https://docs.github.com/en/get-started", DEAD_LINK]),
        ];

        let stripped = remove_specific_string_from_list(&nested, ENTERPRISE_DOCS_FRAGMENT);
        assert_eq!(
            remove_specific_string_from_list(&stripped, ENTERPRISE_DOCS_FRAGMENT),
            stripped
        );

        let filtered = remove_specific_element_from_list(&stripped, DEAD_LINK);
        assert_eq!(remove_specific_element_from_list(&filtered, DEAD_LINK), filtered);
        assert_eq!(
            filtered,
            vec![
                strings(&[
                    "https://git-scm.com/docs",
                    "https://docs.github.com/en/repos",
                    "https://tortoisegit.org/docs",
                ]),
                strings(&["https://docs.github.com/en/get-started"]),
            ]
        );
    }

    fn docs() -> Vec<RetrievedDocument> {
        vec![
            RetrievedDocument::new("c1", "data\\tortoisegit\\quick-guide.md", 0.9),
            RetrievedDocument::new("c2", "data\\github\\en\\about-forks.md", 0.8),
        ]
    }

    #[tokio::test]
    async fn resolve_filters_and_deduplicates() {
        let engine = Arc::new(
            MockSearchEngine::new()
                .with_links(
                    "about-forks",
                    &[
                        "https://docs.github.com/en/enterprise-server@3.6/pull-requests/about-forks",
                        "https://git-scm.com/book",
                    ],
                )
                .with_links("quick-guide", &[DEAD_LINK, "https://git-scm.com/book"]),
        );
        let links = SourceExtractor::new(engine.clone()).resolve(&docs()).await;

        assert_eq!(
            links,
            strings(&[
                "https://docs.github.com/en/pull-requests/about-forks",
                "https://git-scm.com/book"
            ])
        );
        assert_eq!(engine.queries(), strings(&["about-forks", "quick-guide"]));
    }

    #[tokio::test]
    async fn failed_lookup_contributes_nothing() {
        let engine = Arc::new(
            MockSearchEngine::new()
                .with_links("about-forks", &["https://docs.github.com/en/forks"])
                .failing("quick-guide"),
        );
        let links = SourceExtractor::new(engine).resolve(&docs()).await;
        assert_eq!(links, strings(&["https://docs.github.com/en/forks"]));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_lookup_times_out() {
        let engine = Arc::new(
            MockSearchEngine::new()
                .with_links("about-forks", &["https://docs.github.com/en/forks"])
                .with_delay(Duration::from_secs(60)),
        );
        let extractor = SourceExtractor::new(engine).with_settings(SourceSettings {
            lookup_timeout: Duration::from_secs(1),
            ..SourceSettings::default()
        });
        assert!(extractor.resolve(&docs()).await.is_empty());
    }

    #[tokio::test]
    async fn lookups_are_capped() {
        let engine = Arc::new(MockSearchEngine::new());
        let many: Vec<RetrievedDocument> = (0..8)
            .map(|i| RetrievedDocument::new("c", format!("data\\doc{i}.md"), 0.5))
            .collect();
        let extractor = SourceExtractor::new(engine.clone()).with_settings(SourceSettings {
            max_lookups: 2,
            ..SourceSettings::default()
        });
        extractor.resolve(&many).await;
        assert_eq!(engine.queries(), strings(&["doc0", "doc1"]));
    }

    #[tokio::test]
    async fn no_sources_means_no_lookups() {
        let engine = Arc::new(MockSearchEngine::new());
        let links = SourceExtractor::new(engine.clone()).resolve(&[]).await;
        assert!(links.is_empty());
        assert!(engine.queries().is_empty());
    }
}
