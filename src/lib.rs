// lib.rs - Page summarizer: provider-agnostic LLM client, chunked
// summarization, YouTube transcript resolution and a TTL summary cache

pub mod adapter;
pub mod api_client;
pub mod cache;
pub mod chunking;
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod settings;
pub mod storage;
pub mod youtube;

#[cfg(test)]
mod test_support;

pub use api_client::{ApiClient, ApiKeyCheck};
pub use cache::SummaryCache;
pub use config::{load_summarizer_config, SummarizerConfig};
pub use error::{Result, SummarizeError};
pub use pipeline::{ContentSource, PageRequest, SummaryOutcome, Summarizer};
pub use settings::{Settings, SettingsStore};
