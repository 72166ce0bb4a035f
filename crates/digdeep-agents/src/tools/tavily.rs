//! Tavily web search backend
//!
//! Requests go to `POST {base_url}/search` with a bearer key. Transient
//! failures (timeouts, refused connections, 429 and 5xx) are retried with
//! doubling delays; everything else fails on the first attempt.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::search::{SearchHit, SearchResponse, WebSearch};
use crate::error::AgentError;

const TAVILY_API_URL: &str = "https://api.tavily.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound Tavily accepts for max_results
const MAX_RESULTS_LIMIT: usize = 20;

/// How much effort Tavily spends per query
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

/// Corpus Tavily searches
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    #[default]
    General,
    News,
}

#[derive(Debug, thiserror::Error)]
pub enum TavilyError {
    #[error("Tavily did not answer in time")]
    TimedOut,

    #[error("Could not reach Tavily: {0}")]
    Unreachable(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Unauthorized: Tavily rejected the API key")]
    InvalidKey,

    #[error("Rate limited by Tavily")]
    Throttled,

    #[error("Tavily rejected the query: {0}")]
    Rejected(String),

    #[error("Tavily server failure (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Unexpected status {status}: {body}")]
    Unexpected { status: u16, body: String },

    #[error("Malformed Tavily response: {0}")]
    Decode(String),
}

impl TavilyError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TimedOut | Self::Unreachable(_) | Self::Throttled | Self::Upstream { .. }
        )
    }

    fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::TimedOut
        } else if e.is_connect() {
            Self::Unreachable(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }

    fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::InvalidKey,
            StatusCode::TOO_MANY_REQUESTS => Self::Throttled,
            StatusCode::BAD_REQUEST => Self::Rejected(body),
            s if s.is_server_error() => Self::Upstream {
                status: s.as_u16(),
                body,
            },
            s => Self::Unexpected {
                status: s.as_u16(),
                body,
            },
        }
    }
}

impl From<TavilyError> for AgentError {
    fn from(e: TavilyError) -> Self {
        AgentError::Search(format!("tavily: {}", e))
    }
}

/// Retry budget: `retries` extra attempts, delays `base`, `2*base`, `4*base`...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Backoff {
    retries: u32,
    base: Duration,
}

impl Backoff {
    fn delay(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(1 << attempt.min(16))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            retries: 3,
            base: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: SearchDepth,
    topic: Topic,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct SearchReply {
    #[serde(default)]
    results: Vec<ReplyHit>,
}

#[derive(Debug, Deserialize)]
struct ReplyHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// Tavily web search client
///
/// ```ignore
/// let search = TavilySearch::from_env()?.with_topic(Topic::News);
/// let response = search.search("Nairobi coffee shops", 5).await;
/// ```
pub struct TavilySearch {
    api_key: String,
    client: Client,
    base_url: String,
    timeout: Duration,
    backoff: Backoff,
    search_depth: SearchDepth,
    topic: Topic,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: TAVILY_API_URL.to_string(),
            timeout: REQUEST_TIMEOUT,
            backoff: Backoff::default(),
            search_depth: SearchDepth::default(),
            topic: Topic::default(),
        }
    }

    /// Reads the key from `TAVILY_API_KEY`
    pub fn from_env() -> Result<Self, AgentError> {
        std::env::var("TAVILY_API_KEY")
            .map(Self::new)
            .map_err(|_| AgentError::Config("TAVILY_API_KEY is not set".into()))
    }

    /// Point at a different endpoint (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extra attempts after a transient failure; 0 disables retrying
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.backoff.retries = retries;
        self
    }

    /// First backoff delay; each later retry doubles it
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.backoff.base = delay;
        self
    }

    pub fn with_search_depth(mut self, depth: SearchDepth) -> Self {
        self.search_depth = depth;
        self
    }

    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.topic = topic;
        self
    }

    /// Search, surfacing typed errors
    pub async fn try_search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, TavilyError> {
        let body = SearchBody {
            query,
            max_results: max_results.clamp(1, MAX_RESULTS_LIMIT),
            search_depth: self.search_depth,
            topic: self.topic,
            include_answer: false,
        };

        let mut attempt = 0;
        let reply = loop {
            match self.post(&body).await {
                Ok(reply) => break reply,
                Err(e) if e.is_retryable() && attempt < self.backoff.retries => {
                    let delay = self.backoff.delay(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Tavily request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        Ok(reply
            .results
            .into_iter()
            .map(|hit| SearchHit::new(hit.title, hit.url, hit.content))
            .collect())
    }

    async fn post(&self, body: &SearchBody<'_>) -> Result<SearchReply, TavilyError> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(TavilyError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TavilyError::from_status(status, text));
        }

        response
            .json::<SearchReply>()
            .await
            .map_err(|e| TavilyError::Decode(e.to_string()))
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, query: &str, max_results: usize) -> SearchResponse {
        debug!(query, max_results, "tavily search");

        match self.try_search(query, max_results).await {
            Ok(hits) => {
                info!(query, count = hits.len(), "Tavily search completed");
                SearchResponse::ok(hits)
            }
            Err(e) => {
                warn!(query, error = %e, "Tavily search failed");
                SearchResponse::failed(format!("Search failed: {}", e))
            }
        }
    }

    fn name(&self) -> &str {
        "tavily"
    }
}
