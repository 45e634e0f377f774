// settings.rs - User settings: normalization and the persistent settings store
// The orchestrator receives a SettingsStore at construction and loads a fresh
// snapshot per request; nothing here is global.

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::prompts::{SummaryFormat, SummaryLength};
use crate::providers;
use crate::storage::{Entries, KeyValueStore};

pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_MODEL: &str = "gpt-5-mini";

pub const SETTINGS_KEYS: [&str; 6] = [
    "provider",
    "model",
    "apiKey",
    "summaryLength",
    "summaryFormat",
    "youtubeTranscriptMode",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TranscriptMode {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    /// Skip auto-generated captions and the internal transcript endpoint.
    #[serde(rename = "no-auto")]
    NoAuto,
}

impl TranscriptMode {
    pub fn parse(value: &str) -> Option<TranscriptMode> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(TranscriptMode::Auto),
            "no-auto" => Some(TranscriptMode::NoAuto),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptMode::Auto => "auto",
            TranscriptMode::NoAuto => "no-auto",
        }
    }
}

impl fmt::Display for TranscriptMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub summary_length: SummaryLength,
    pub summary_format: SummaryFormat,
    pub youtube_transcript_mode: TranscriptMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            summary_length: SummaryLength::default(),
            summary_format: SummaryFormat::default(),
            youtube_transcript_mode: TranscriptMode::default(),
        }
    }
}

/// Loosely typed settings as stored, also used as a partial update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_transcript_mode: Option<String>,
}

impl RawSettings {
    /// Fields of `patch` win over fields of `self`.
    pub fn merged_with(self, patch: RawSettings) -> RawSettings {
        RawSettings {
            provider: patch.provider.or(self.provider),
            model: patch.model.or(self.model),
            api_key: patch.api_key.or(self.api_key),
            summary_length: patch.summary_length.or(self.summary_length),
            summary_format: patch.summary_format.or(self.summary_format),
            youtube_transcript_mode: patch.youtube_transcript_mode.or(self.youtube_transcript_mode),
        }
    }

    /// Apply a `camelCase` key (or its snake_case spelling) with a value.
    pub fn set_field(&mut self, key: &str, value: &str) -> bool {
        let value = Some(value.to_string());
        match key {
            "provider" => self.provider = value,
            "model" => self.model = value,
            "apiKey" | "api_key" => self.api_key = value,
            "summaryLength" | "summary_length" => self.summary_length = value,
            "summaryFormat" | "summary_format" => self.summary_format = value,
            "youtubeTranscriptMode" | "youtube_transcript_mode" => self.youtube_transcript_mode = value,
            _ => return false,
        }
        true
    }

    fn from_entries(entries: &Entries) -> RawSettings {
        let field = |key: &str| {
            entries
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        RawSettings {
            provider: field("provider"),
            model: field("model"),
            api_key: field("apiKey"),
            summary_length: field("summaryLength"),
            summary_format: field("summaryFormat"),
            youtube_transcript_mode: field("youtubeTranscriptMode"),
        }
    }
}

impl From<&Settings> for RawSettings {
    fn from(settings: &Settings) -> Self {
        RawSettings {
            provider: Some(settings.provider.clone()),
            model: Some(settings.model.clone()),
            api_key: Some(settings.api_key.clone()),
            summary_length: Some(settings.summary_length.as_str().to_string()),
            summary_format: Some(settings.summary_format.as_str().to_string()),
            youtube_transcript_mode: Some(settings.youtube_transcript_mode.as_str().to_string()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Fill defaults and repair a model that is not in the provider's catalog.
/// Unknown providers keep whatever model was stored.
pub fn normalize_settings(raw: RawSettings) -> Settings {
    let provider = non_empty(raw.provider).unwrap_or_else(|| DEFAULT_PROVIDER.to_string());
    let mut model = non_empty(raw.model).unwrap_or_else(|| DEFAULT_MODEL.to_string());

    if let Some(descriptor) = providers::provider(&provider) {
        if !descriptor.has_model(&model) {
            if let Some(first) = descriptor.default_model() {
                debug!("⚙️ Model '{}' not offered by {}, using '{}'", model, provider, first.id);
                model = first.id.clone();
            }
        }
    }

    Settings {
        provider,
        model,
        api_key: raw.api_key.unwrap_or_default(),
        summary_length: non_empty(raw.summary_length)
            .and_then(|v| SummaryLength::parse(&v))
            .unwrap_or_default(),
        summary_format: non_empty(raw.summary_format)
            .and_then(|v| SummaryFormat::parse(&v))
            .unwrap_or_default(),
        youtube_transcript_mode: non_empty(raw.youtube_transcript_mode)
            .and_then(|v| TranscriptMode::parse(&v))
            .unwrap_or_default(),
    }
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load_settings(&self) -> Result<Settings>;

    /// Persist `patch`, merged over the stored settings when `merge` is true,
    /// and return the normalized result.
    async fn save_settings(&self, patch: RawSettings, merge: bool) -> Result<Settings>;
}

pub struct KvSettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl KvSettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn read_raw(&self) -> Result<RawSettings> {
        let keys: Vec<String> = SETTINGS_KEYS.iter().map(|k| k.to_string()).collect();
        let entries = self.store.get(&keys).await?;
        Ok(RawSettings::from_entries(&entries))
    }
}

#[async_trait]
impl SettingsStore for KvSettingsStore {
    async fn load_settings(&self) -> Result<Settings> {
        Ok(normalize_settings(self.read_raw().await?))
    }

    async fn save_settings(&self, patch: RawSettings, merge: bool) -> Result<Settings> {
        let base = if merge {
            RawSettings::from(&self.load_settings().await?)
        } else {
            RawSettings::default()
        };
        let normalized = normalize_settings(base.merged_with(patch));

        let entries: Entries = match serde_json::to_value(&normalized) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            _ => Entries::new(),
        };
        self.store.set(entries).await?;
        info!("💾 Settings saved (provider: {}, model: {})", normalized.provider, normalized.model);
        Ok(normalized)
    }
}
