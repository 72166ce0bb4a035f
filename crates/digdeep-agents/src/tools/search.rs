//! Web search abstraction
//!
//! Search backends never fail the caller: transport and API errors are
//! reported inside [`SearchResponse::error`] so a research step can record
//! the failure and move on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Maximum characters of result content kept in a formatted snippet
pub const SNIPPET_CONTENT_CHARS: usize = 200;

/// Text used when a search produced nothing usable
pub const NO_RESULTS: &str = "No results found or search failed.";

/// One ranked search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
        }
    }
}

/// Outcome of a search call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub error: Option<String>,
}

impl SearchResponse {
    pub fn ok(results: Vec<SearchHit>) -> Self {
        Self {
            results,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// URL of the top-ranked result
    pub fn first_url(&self) -> Option<&str> {
        self.results.first().map(|r| r.url.as_str())
    }

    /// Render results as a numbered text blob for prompts and snippets
    pub fn format(&self, query: &str) -> String {
        if self.error.is_some() || self.results.is_empty() {
            return NO_RESULTS.to_string();
        }

        let mut out = format!("Search results for '{}':\n\n", query);
        for (i, hit) in self.results.iter().enumerate() {
            let content: String = hit.content.chars().take(SNIPPET_CONTENT_CHARS).collect();
            out.push_str(&format!(
                "{}. {}\n   URL: {}\n   Content: {}...\n\n",
                i + 1,
                hit.title,
                hit.url,
                content
            ));
        }
        out
    }
}

/// A web search backend
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Return up to `max_results` ranked results for `query`
    async fn search(&self, query: &str, max_results: usize) -> SearchResponse;

    /// Backend name for logging
    fn name(&self) -> &str;
}
