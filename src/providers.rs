// providers.rs - Static registry of the supported LLM providers
// Descriptors are built once and never mutated; adding a provider means adding
// a ProviderId variant plus its descriptor and adapter.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Anthropic,
    Gemini,
    Grok,
}

impl ProviderId {
    pub const ALL: [ProviderId; 4] = [
        ProviderId::OpenAi,
        ProviderId::Anthropic,
        ProviderId::Gemini,
        ProviderId::Grok,
    ];

    /// Case-insensitive lookup of a stored provider id.
    pub fn parse(id: &str) -> Option<ProviderId> {
        match id.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(ProviderId::OpenAi),
            "anthropic" => Some(ProviderId::Anthropic),
            "gemini" => Some(ProviderId::Gemini),
            "grok" => Some(ProviderId::Grok),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Anthropic => "anthropic",
            ProviderId::Gemini => "gemini",
            ProviderId::Grok => "grok",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub name: String,
    pub api_url: String,
    /// Catalog order matters: the first model is the provider default.
    pub models: Vec<ModelInfo>,
    pub temperature: Option<f32>,
    pub key_prefix: String,
}

impl ProviderDescriptor {
    pub fn model(&self, model_id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.id == model_id)
    }

    pub fn has_model(&self, model_id: &str) -> bool {
        self.model(model_id).is_some()
    }

    pub fn default_model(&self) -> Option<&ModelInfo> {
        self.models.first()
    }
}

fn model(id: &str, name: &str, max_tokens: u32) -> ModelInfo {
    ModelInfo {
        id: id.to_string(),
        name: name.to_string(),
        max_tokens,
    }
}

static PROVIDERS: Lazy<Vec<ProviderDescriptor>> = Lazy::new(|| {
    vec![
        ProviderDescriptor {
            id: ProviderId::OpenAi,
            name: "OpenAI".to_string(),
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            models: vec![
                model("gpt-5-mini", "GPT-5 Mini", 8192),
                model("gpt-5-nano", "GPT-5 Nano", 8192),
                model("gpt-4.1-mini", "GPT-4.1 Mini", 4096),
            ],
            temperature: Some(0.7),
            key_prefix: "sk-".to_string(),
        },
        ProviderDescriptor {
            id: ProviderId::Anthropic,
            name: "Anthropic".to_string(),
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            models: vec![
                model("claude-sonnet-4-5", "Claude Sonnet 4.5", 8192),
                model("claude-3-5-haiku-20241022", "Claude Haiku 3.5", 8192),
            ],
            temperature: None,
            key_prefix: "sk-ant-".to_string(),
        },
        ProviderDescriptor {
            id: ProviderId::Gemini,
            name: "Google Gemini".to_string(),
            api_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            models: vec![model("gemini-2.5-flash", "Gemini 2.5 Flash", 8192)],
            temperature: None,
            key_prefix: "AI".to_string(),
        },
        ProviderDescriptor {
            id: ProviderId::Grok,
            name: "xAI Grok".to_string(),
            api_url: "https://api.x.ai/v1/chat/completions".to_string(),
            models: vec![model("grok-4-fast-reasoning", "Grok 4 Fast", 4096)],
            temperature: None,
            key_prefix: "xai-".to_string(),
        },
    ]
});

pub fn all_providers() -> &'static [ProviderDescriptor] {
    &PROVIDERS
}

pub fn provider(id: &str) -> Option<&'static ProviderDescriptor> {
    let id = ProviderId::parse(id)?;
    descriptor(id)
}

pub fn descriptor(id: ProviderId) -> Option<&'static ProviderDescriptor> {
    PROVIDERS.iter().find(|p| p.id == id)
}

pub fn default_model(id: &str) -> Option<&'static str> {
    provider(id)
        .and_then(|p| p.default_model())
        .map(|m| m.id.as_str())
}

/// Client-side format check only; a passing key can still be rejected upstream.
pub fn validate_api_key(provider_id: &str, api_key: &str) -> bool {
    match provider(provider_id) {
        Some(p) if !api_key.is_empty() => api_key.starts_with(&p.key_prefix),
        _ => false,
    }
}

pub fn api_key_placeholder(provider_id: &str) -> String {
    provider(provider_id)
        .map(|p| format!("{}...", p.key_prefix))
        .unwrap_or_default()
}
