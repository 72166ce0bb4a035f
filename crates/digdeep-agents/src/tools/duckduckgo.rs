//! DuckDuckGo search backend
//!
//! DuckDuckGo has no free web search API, so results are scraped from the
//! HTML endpoint. Needs no API key, which makes it the fallback when
//! `TAVILY_API_KEY` is absent.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::search::{SearchHit, SearchResponse, WebSearch};

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Pause before each request to stay under the scraper rate limit
const REQUEST_DELAY_MS: u64 = 500;

/// Typed errors for DuckDuckGo scraping
#[derive(Debug, thiserror::Error)]
pub enum DuckDuckGoError {
    #[error("Rate limited by search provider, please wait")]
    RateLimited,

    #[error("HTTP {0}")]
    Http(u16),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// DuckDuckGo HTML search client
pub struct DuckDuckGoSearch {
    client: Client,
    base_url: String,
    request_delay: Duration,
}

impl DuckDuckGoSearch {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_delay: Duration::from_millis(REQUEST_DELAY_MS),
        }
    }

    /// Point at a different endpoint (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Search, surfacing typed errors
    pub async fn try_search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, DuckDuckGoError> {
        tokio::time::sleep(self.request_delay).await;

        let url = format!("{}/html/?q={}", self.base_url, urlencoding::encode(query));
        debug!(url = %url, "Fetching search results");

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DuckDuckGoError::RateLimited);
        }
        if !status.is_success() {
            return Err(DuckDuckGoError::Http(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(parse_html(&body, max_results))
    }
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> SearchResponse {
        match self.try_search(query, max_results).await {
            Ok(results) => {
                if results.is_empty() {
                    warn!(query, "No search results found");
                } else {
                    info!(query, count = results.len(), "Search completed");
                }
                SearchResponse::ok(results)
            }
            Err(e) => {
                warn!(query, error = %e, "DuckDuckGo search failed");
                SearchResponse::failed(format!("Search failed: {}", e))
            }
        }
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}

/// Pull result links out of a DuckDuckGo HTML page
///
/// Redirect links (`uddg=`) are preferred; visible `result__url` anchors
/// fill in when there are too few of them. Snippets come from the
/// `result__snippet` blocks in page order.
fn parse_html(html: &str, max_results: usize) -> Vec<SearchHit> {
    let mut urls = Vec::new();
    let mut seen = HashSet::new();

    for segment in html.split("uddg=").skip(1) {
        if urls.len() >= max_results {
            break;
        }
        let Some(end) = segment.find(['&', '"', '\'']) else {
            continue;
        };
        let Ok(decoded) = urlencoding::decode(&segment[..end]) else {
            continue;
        };
        let url = decoded.into_owned();
        if url.starts_with("http") && !url.contains("duckduckgo.com") && seen.insert(url.clone()) {
            urls.push(url);
        }
    }

    if urls.len() < max_results {
        for segment in html.split("result__url").skip(1) {
            if urls.len() >= max_results {
                break;
            }
            let Some(href_start) = segment.find("href=\"") else {
                continue;
            };
            let after_href = &segment[href_start + 6..];
            let Some(href_end) = after_href.find('"') else {
                continue;
            };
            let href = &after_href[..href_end];
            let url = if href.starts_with("//") {
                format!("https:{}", href)
            } else if href.starts_with("http") {
                href.to_string()
            } else {
                continue;
            };
            if !url.contains("duckduckgo.com") && seen.insert(url.clone()) {
                urls.push(url);
            }
        }
    }

    let snippets = extract_snippets(html);

    urls.into_iter()
        .enumerate()
        .map(|(i, url)| {
            let title = extract_domain(&url).unwrap_or_else(|| "Result".to_string());
            let content = snippets
                .get(i)
                .cloned()
                .unwrap_or_else(|| "Search result from DuckDuckGo".to_string());
            SearchHit::new(title, url, content)
        })
        .collect()
}

/// Text of each `result__snippet` element with tags stripped
fn extract_snippets(html: &str) -> Vec<String> {
    html.split("result__snippet")
        .skip(1)
        .filter_map(|segment| {
            let start = segment.find('>')? + 1;
            let body = &segment[start..];
            let end = body.find("</a>").or_else(|| body.find("</div>"))?;
            let text = strip_tags(&body[..end]);
            (!text.is_empty()).then_some(text)
        })
        .collect()
}

fn strip_tags(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract the domain name from a URL
fn extract_domain(url: &str) -> Option<String> {
    url.split("//")
        .nth(1)?
        .split('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
