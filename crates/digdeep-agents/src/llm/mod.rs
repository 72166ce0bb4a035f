//! LLM Provider abstractions
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        research steps                   │
//! └─────────────────┬───────────────────────┘
//!                   │ complete_structured::<T>
//!                   ▼
//! ┌─────────────────────────────────────────┐
//! │        LLMProvider (trait)              │
//! │  - complete(messages, config)           │
//! └─────────────────┬───────────────────────┘
//!          ┌────────┴────────┐
//!          ▼                 ▼
//! ┌─────────────────┐ ┌─────────────────┐
//! │  Rig OpenAI     │ │  Rig Ollama     │
//! └─────────────────┘ └─────────────────┘
//! ```

mod config;
mod ollama;
mod openai;
mod provider;
mod structured;

pub use config::LLMConfig;
pub use ollama::{OllamaProvider, DEFAULT_OLLAMA_HOST};
pub use openai::OpenAIProvider;
pub use provider::{prompt_text, system_preamble, LLMProvider, LLMResponse};
pub use structured::{complete_structured, extract_json, parse_structured};
