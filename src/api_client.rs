// api_client.rs - Provider-agnostic summarization client
// Loads settings, picks single-pass or chunk-then-synthesize, and runs each
// provider call with a timeout, retry with exponential backoff, and a shared
// cancellation handle.

use log::{debug, error, info, trace, warn};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::adapter::{self, RequestParams};
use crate::chunking::{plan_chunks, should_chunk};
use crate::config::{SummarizerConfig, CHUNK_MAX_OUTPUT_TOKENS, CHUNK_MIN_TARGET_WORDS, CHUNK_TARGET_DIVISOR_CAP};
use crate::error::{Result, SummarizeError};
use crate::http::{self, HttpRequest, HttpTransport, TransportError};
use crate::prompts::{build_chunk_prompt, build_synthesis_prompt, get_summary_prompt, PromptContext};
use crate::providers::{self, ProviderDescriptor};
use crate::settings::{RawSettings, Settings, SettingsStore};

pub const LEGACY_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const LEGACY_MODEL: &str = "gpt-5-mini";
pub const LEGACY_MAX_TOKENS: u32 = 8192;
pub const TEST_PROMPT: &str = "Test";
pub const TEST_MAX_TOKENS: u32 = 10;

/// Outcome of an interactive credential check. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyCheck {
    pub ok: bool,
    pub error_message: Option<String>,
}

impl ApiKeyCheck {
    fn passed() -> Self {
        Self { ok: true, error_message: None }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self { ok: false, error_message: Some(message.into()) }
    }
}

pub struct ApiClient {
    settings: Arc<dyn SettingsStore>,
    transport: Arc<dyn HttpTransport>,
    config: SummarizerConfig,
    in_flight: Mutex<Option<CancellationToken>>,
}

fn http_error_message(body: Option<Value>, status: u16) -> String {
    body.as_ref()
        .and_then(|b| b.get("error"))
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("API request failed: {}", status))
}

fn transport_error(e: TransportError) -> SummarizeError {
    match e {
        TransportError::Timeout => SummarizeError::Timeout,
        TransportError::Network(detail) => {
            warn!("🌐 Network failure: {}", detail);
            SummarizeError::NetworkError(detail)
        }
    }
}

impl ApiClient {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        transport: Arc<dyn HttpTransport>,
        config: SummarizerConfig,
    ) -> Self {
        Self {
            settings,
            transport,
            config,
            in_flight: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Install a fresh cancellation handle, replacing any previous one.
    fn begin_request(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut slot) = self.in_flight.lock() {
            *slot = Some(token.clone());
        }
        token
    }

    /// Abort whatever call is in flight. Safe to call at any time.
    pub fn cancel_request(&self) {
        let pending = self.in_flight.lock().ok().and_then(|mut slot| slot.take());
        if let Some(token) = pending {
            info!("🛑 Cancelling in-flight summary request");
            token.cancel();
        }
    }

    /// Summarize `content` using the currently stored settings.
    pub async fn call_api(&self, content: &str, context: &PromptContext) -> Result<String> {
        let settings = self.settings.load_settings().await?;
        if settings.api_key.is_empty() {
            return Err(SummarizeError::NoApiKey);
        }
        let token = self.begin_request();

        let descriptor = match providers::provider(&settings.provider) {
            Some(descriptor) => descriptor,
            None => {
                warn!("⚠️ Unknown provider '{}', using legacy OpenAI path", settings.provider);
                return self.legacy_openai_call(content, &settings, context, &token).await;
            }
        };

        let settings = self.resolve_model(settings, descriptor).await?;
        let max_tokens = descriptor
            .model(&settings.model)
            .map(|m| m.max_tokens)
            .ok_or_else(|| SummarizeError::NoModelsAvailable(settings.provider.clone()))?;

        info!(
            "🤖 Summarizing {} chars with {}/{} ({} max tokens)",
            content.chars().count(),
            descriptor.id,
            settings.model,
            max_tokens
        );

        if should_chunk(content, max_tokens) {
            return self
                .chunked_summary(content, &settings, descriptor, context, &token)
                .await;
        }

        let prompt = get_summary_prompt(
            content,
            settings.summary_length.as_str(),
            settings.summary_format,
            context,
        );
        self.request_with_retry(&prompt, &settings, descriptor, Some(max_tokens), &token)
            .await
    }

    /// Replace a model missing from the catalog with the provider's first
    /// model and persist the correction.
    async fn resolve_model(&self, mut settings: Settings, descriptor: &ProviderDescriptor) -> Result<Settings> {
        if descriptor.has_model(&settings.model) {
            return Ok(settings);
        }
        let fallback = descriptor
            .default_model()
            .ok_or_else(|| SummarizeError::NoModelsAvailable(settings.provider.clone()))?;
        warn!(
            "⚠️ Model '{}' is not offered by {}, switching to '{}'",
            settings.model, descriptor.id, fallback.id
        );
        settings.model = fallback.id.clone();
        self.settings
            .save_settings(RawSettings::from(&settings), false)
            .await?;
        Ok(settings)
    }

    /// Split, summarize each chunk in order, then synthesize.
    pub async fn summarize_with_chunking(
        &self,
        content: &str,
        settings: &Settings,
        descriptor: &ProviderDescriptor,
        context: &PromptContext,
    ) -> Result<String> {
        let token = self.begin_request();
        self.chunked_summary(content, settings, descriptor, context, &token)
            .await
    }

    async fn chunked_summary(
        &self,
        content: &str,
        settings: &Settings,
        descriptor: &ProviderDescriptor,
        context: &PromptContext,
        token: &CancellationToken,
    ) -> Result<String> {
        let max_tokens = descriptor
            .model(&settings.model)
            .map(|m| m.max_tokens)
            .ok_or_else(|| SummarizeError::NoModelsAvailable(settings.provider.clone()))?;
        let plan = plan_chunks(content, max_tokens);

        if plan.len() <= 1 {
            let prompt = get_summary_prompt(
                content,
                settings.summary_length.as_str(),
                settings.summary_format,
                context,
            );
            return self
                .request_with_retry(&prompt, settings, descriptor, Some(max_tokens), token)
                .await;
        }

        let word_count = settings.summary_length.target_words();
        let divisor = plan.len().min(CHUNK_TARGET_DIVISOR_CAP);
        let target_words = ((word_count as f64 / divisor as f64).round() as usize).max(CHUNK_MIN_TARGET_WORDS);
        let chunk_max_tokens = CHUNK_MAX_OUTPUT_TOKENS.min(max_tokens);
        info!(
            "✂️ Content split into {} chunks of up to {} chars ({} words each)",
            plan.len(),
            plan.max_chunk_chars,
            target_words
        );

        // Sequential on purpose: one outbound request at a time
        let mut summaries = Vec::with_capacity(plan.len());
        for (i, chunk) in plan.chunks.iter().enumerate() {
            let prompt = build_chunk_prompt(
                chunk,
                i + 1,
                plan.len(),
                target_words,
                settings.summary_format,
                context,
            );
            let summary = self
                .request_with_retry(&prompt, settings, descriptor, Some(chunk_max_tokens), token)
                .await?;
            debug!("✂️ Chunk {}/{} summarized ({} chars)", i + 1, plan.len(), summary.len());
            summaries.push(summary.trim().to_string());
        }

        let combined = summaries
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = build_synthesis_prompt(
            &combined,
            settings.summary_length.as_str(),
            settings.summary_format,
            context,
        );
        info!("🧩 Synthesizing {} chunk summaries", plan.len());
        self.request_with_retry(&prompt, settings, descriptor, Some(max_tokens), token)
            .await
    }

    /// One provider call with timeout and retry. Uses the model's limit when
    /// no override is given.
    pub async fn request_summary(
        &self,
        prompt: &str,
        settings: &Settings,
        descriptor: &ProviderDescriptor,
        max_tokens_override: Option<u32>,
    ) -> Result<String> {
        let token = self.begin_request();
        self.request_with_retry(prompt, settings, descriptor, max_tokens_override, &token)
            .await
    }

    async fn request_with_retry(
        &self,
        prompt: &str,
        settings: &Settings,
        descriptor: &ProviderDescriptor,
        max_tokens_override: Option<u32>,
        token: &CancellationToken,
    ) -> Result<String> {
        let attempts = self.config.retry_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = backoff_delay(self.config.retry_delay_base, attempt - 1);
                debug!("🔄 Retrying in {:?} (attempt {}/{})", delay, attempt, attempts);
                tokio::select! {
                    _ = token.cancelled() => return Err(SummarizeError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            match self
                .attempt_once(prompt, settings, descriptor, max_tokens_override, token)
                .await
            {
                Ok(summary) => return Ok(summary),
                Err(e) if !e.is_retryable() => {
                    warn!("⏱️ Provider call aborted: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("❌ Attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                }
            }
        }

        error!("❌ All {} attempts failed", attempts);
        Err(last_error.unwrap_or_else(|| SummarizeError::ApiCallFailed(String::new())))
    }

    async fn attempt_once(
        &self,
        prompt: &str,
        settings: &Settings,
        descriptor: &ProviderDescriptor,
        max_tokens_override: Option<u32>,
        token: &CancellationToken,
    ) -> Result<String> {
        let max_tokens = match max_tokens_override {
            Some(tokens) if tokens > 0 => tokens,
            _ => descriptor
                .model(&settings.model)
                .map(|m| m.max_tokens)
                .ok_or_else(|| SummarizeError::NoModelsAvailable(settings.provider.clone()))?,
        };
        let provider_adapter = adapter::adapter_for(descriptor.id);
        let body = provider_adapter.build_request(&RequestParams {
            prompt,
            model: &settings.model,
            max_tokens,
            provider: descriptor,
        });
        let url = provider_adapter.api_url(descriptor, &settings.model, &settings.api_key);
        let request = HttpRequest::post_json(url, body)
            .with_headers(adapter::request_headers(descriptor.id, &settings.api_key));
        trace!("[TRACE][API] {} prompt chars, {} max tokens", prompt.len(), max_tokens);

        let outcome = tokio::select! {
            _ = token.cancelled() => return Err(SummarizeError::Cancelled),
            result = http::execute(self.transport.as_ref(), request, self.config.timeout) => result,
        };
        let response = outcome.map_err(transport_error)?;

        if !response.is_success() {
            return Err(SummarizeError::ApiCallFailed(http_error_message(
                response.json(),
                response.status,
            )));
        }
        let data = response.json().ok_or(SummarizeError::InvalidResponseFormat)?;
        adapter::parse_response(descriptor.id, &data)
    }

    /// Pre-registry installs stored a provider id the catalog no longer knows.
    /// Single attempt against the fixed OpenAI endpoint.
    async fn legacy_openai_call(
        &self,
        content: &str,
        settings: &Settings,
        context: &PromptContext,
        token: &CancellationToken,
    ) -> Result<String> {
        let prompt = get_summary_prompt(
            content,
            settings.summary_length.as_str(),
            settings.summary_format,
            context,
        );
        let body = json!({
            "model": LEGACY_MODEL,
            "max_completion_tokens": LEGACY_MAX_TOKENS,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let request = HttpRequest::post_json(LEGACY_API_URL, body).with_headers(vec![(
            "Authorization".to_string(),
            format!("Bearer {}", settings.api_key),
        )]);

        let outcome = tokio::select! {
            _ = token.cancelled() => return Err(SummarizeError::Cancelled),
            result = http::execute(self.transport.as_ref(), request, self.config.timeout) => result,
        };
        let response = outcome.map_err(transport_error)?;
        if !response.is_success() {
            return Err(SummarizeError::ApiCallFailed(http_error_message(
                response.json(),
                response.status,
            )));
        }

        response
            .json()
            .and_then(|data| {
                data.get("choices")?
                    .as_array()?
                    .first()?
                    .get("message")?
                    .get("content")?
                    .as_str()
                    .map(str::to_string)
            })
            .ok_or_else(|| SummarizeError::ApiCallFailed("No response from OpenAI API".to_string()))
    }

    /// Minimal request to check a credential, with its own short timeout.
    pub async fn test_api_key(&self, provider: &str, api_key: &str, model: &str) -> ApiKeyCheck {
        let descriptor = match providers::provider(provider) {
            Some(descriptor) => descriptor,
            None => return ApiKeyCheck::failed(SummarizeError::UnsupportedProvider(provider.to_string()).to_string()),
        };
        let model = match descriptor.model(model).or_else(|| descriptor.default_model()) {
            Some(m) => m.id.clone(),
            None => return ApiKeyCheck::failed(SummarizeError::NoModelsAvailable(provider.to_string()).to_string()),
        };

        let provider_adapter = adapter::adapter_for(descriptor.id);
        let body = provider_adapter.build_request(&RequestParams {
            prompt: TEST_PROMPT,
            model: &model,
            max_tokens: TEST_MAX_TOKENS,
            provider: descriptor,
        });
        let request = HttpRequest::post_json(provider_adapter.api_url(descriptor, &model, api_key), body)
            .with_headers(adapter::request_headers(descriptor.id, api_key));

        info!("🔑 Testing {} key against model {}", descriptor.id, model);
        match http::execute(self.transport.as_ref(), request, self.config.test_timeout).await {
            Ok(response) if response.is_success() => ApiKeyCheck::passed(),
            Ok(response) => {
                let message = response
                    .json()
                    .and_then(|body| adapter::extract_error_message(&body))
                    .unwrap_or_else(|| format!("API request failed: {}", response.status));
                warn!("🔑 Key test rejected: {}", message);
                ApiKeyCheck::failed(message)
            }
            Err(TransportError::Timeout) => ApiKeyCheck::failed("API key test timed out."),
            Err(TransportError::Network(detail)) => {
                warn!("🔑 Key test failed: {}", detail);
                ApiKeyCheck::failed("API key test failed.")
            }
        }
    }
}

/// Delay before the given 1-based retry. Saturates instead of overflowing.
pub fn backoff_delay(base: Duration, retry: u32) -> Duration {
    let factor = 2u32.checked_pow(retry.saturating_sub(1)).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}
