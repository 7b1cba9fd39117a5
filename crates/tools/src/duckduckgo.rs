//! DuckDuckGo web search over the HTML endpoint.
//!
//! No API key is needed. Results are read from the `result__a` title
//! links and `result__snippet` blocks of the HTML results page.

use async_trait::async_trait;
use gitbuddy_core::error::ToolError;
use gitbuddy_core::retrieval::{SearchEngine, SearchHit};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

/// The HTML results endpoint.
pub const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com/html/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = concat!("gitbuddy/", env!("CARGO_PKG_VERSION"));

/// Title links and snippets, in document order.
static RESULT_PART: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a.result__a, .result__snippet").expect("result selector")
});

pub struct DuckDuckGoSearch {
    base_url: String,
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ToolError::SearchFailed(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl SearchEngine for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError> {
        let url = reqwest::Url::parse_with_params(&self.base_url, &[("q", query)])
            .map_err(|e| ToolError::SearchFailed(format!("Invalid search URL: {e}")))?;

        debug!(query, "Searching DuckDuckGo");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolError::SearchFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::SearchFailed(format!(
                "DuckDuckGo returned {}",
                status.as_u16()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ToolError::SearchFailed(e.to_string()))?;

        let mut hits = parse_results(&html);
        hits.truncate(max_results);
        Ok(hits)
    }
}

/// Extract hits from a results page, in page order.
///
/// Each title link takes the first snippet that follows it before the next
/// title. Sponsored results are skipped along with their snippets.
pub fn parse_results(html: &str) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let mut hits: Vec<SearchHit> = Vec::new();
    let mut awaiting_snippet = false;

    for element in document.select(&RESULT_PART) {
        if element.value().classes().any(|c| c == "result__a") {
            let link = element
                .value()
                .attr("href")
                .map(decode_link)
                .unwrap_or_default();
            awaiting_snippet = !link.is_empty() && !link.contains("duckduckgo.com/y.js");
            if awaiting_snippet {
                hits.push(SearchHit {
                    title: element_text(element),
                    link,
                    snippet: String::new(),
                });
            }
        } else if awaiting_snippet {
            if let Some(hit) = hits.last_mut() {
                hit.snippet = element_text(element);
            }
            awaiting_snippet = false;
        }
    }

    hits
}

/// Resolve DuckDuckGo redirect links (`//duckduckgo.com/l/?uddg=...`) to
/// their target URL.
fn decode_link(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    match reqwest::Url::parse(&absolute) {
        Ok(url) if url.path().starts_with("/l/") => url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
            .unwrap_or(absolute),
        _ => absolute,
    }
}

/// Text content of an element with whitespace collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
