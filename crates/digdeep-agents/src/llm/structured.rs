//! Schema-conforming completions
//!
//! Models are asked to answer in JSON but tend to wrap it in prose or code
//! fences. The helpers here locate the JSON payload in free text and
//! deserialize it into the requested type.

use serde::de::DeserializeOwned;
use tracing::debug;

use super::config::LLMConfig;
use super::provider::LLMProvider;
use crate::error::AgentError;
use crate::state::Message;

/// Locate the JSON payload inside model text
///
/// Tries, in order: the whole trimmed text, the first fenced code block,
/// the outermost `{...}` span, and the outermost `[...]` span.
pub fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if looks_like_json(trimmed) {
        return Some(trimmed);
    }

    if let Some(block) = fenced_block(trimmed) {
        if looks_like_json(block) {
            return Some(block);
        }
    }

    outer_span(trimmed, '{', '}').or_else(|| outer_span(trimmed, '[', ']'))
}

fn looks_like_json(s: &str) -> bool {
    (s.starts_with('{') && s.ends_with('}')) || (s.starts_with('[') && s.ends_with(']'))
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn outer_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Deserialize a value of type `T` from model text
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, AgentError> {
    let json = extract_json(text)
        .ok_or_else(|| AgentError::MalformedOutput("no JSON object found in model output".into()))?;

    serde_json::from_str(json)
        .map_err(|e| AgentError::MalformedOutput(format!("output does not match schema: {}", e)))
}

/// Run a completion and deserialize its text into `T`
pub async fn complete_structured<T: DeserializeOwned>(
    provider: &dyn LLMProvider,
    messages: &[Message],
    config: Option<&LLMConfig>,
) -> Result<T, AgentError> {
    let response = provider.complete(messages, config).await?;
    debug!(
        provider = provider.name(),
        response_len = response.text().len(),
        "Parsing structured output"
    );
    parse_structured(response.text())
}
