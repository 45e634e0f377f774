// adapter.rs - Per-provider wire format translation
// Each provider gets one adapter implementing request body, headers, URL and
// response extraction. Dispatch is an exhaustive match on ProviderId.

use serde_json::{json, Value};

use crate::error::{Result, SummarizeError};
use crate::providers::{ProviderDescriptor, ProviderId};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that creates concise, accurate summaries of articles.";
const FIXED_TEMPERATURE: f32 = 0.7;
const GEMINI_FALLBACK_MAX_TOKENS: u32 = 8192;

/// Model families that reject a temperature parameter.
const NO_TEMPERATURE_MODEL_PREFIXES: [&str; 1] = ["gpt-5"];

pub struct RequestParams<'a> {
    pub prompt: &'a str,
    pub model: &'a str,
    pub max_tokens: u32,
    pub provider: &'a ProviderDescriptor,
}

pub trait ProviderAdapter: Send + Sync {
    fn build_request(&self, params: &RequestParams) -> Value;

    /// Provider-specific headers, excluding Content-Type.
    fn headers(&self, api_key: &str) -> Vec<(String, String)>;

    fn api_url(&self, provider: &ProviderDescriptor, model: &str, api_key: &str) -> String;

    /// Generated text, or None when any level of the expected path is missing.
    fn parse_response(&self, data: &Value) -> Option<String>;
}

pub struct OpenAiAdapter;
pub struct AnthropicAdapter;
pub struct GeminiAdapter;
pub struct GrokAdapter;

fn user_messages(prompt: &str) -> Value {
    json!([{ "role": "user", "content": prompt }])
}

fn bearer(api_key: &str) -> Vec<(String, String)> {
    vec![("Authorization".to_string(), format!("Bearer {}", api_key))]
}

fn chat_completion_text(data: &Value) -> Option<String> {
    data.get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

impl ProviderAdapter for OpenAiAdapter {
    fn build_request(&self, params: &RequestParams) -> Value {
        let mut body = json!({
            "model": params.model,
            "max_completion_tokens": params.max_tokens,
            "messages": user_messages(params.prompt),
        });
        let accepts_temperature = !NO_TEMPERATURE_MODEL_PREFIXES
            .iter()
            .any(|prefix| params.model.starts_with(prefix));
        if let (true, Some(temperature)) = (accepts_temperature, params.provider.temperature) {
            body["temperature"] = json!(temperature);
        }
        body
    }

    fn headers(&self, api_key: &str) -> Vec<(String, String)> {
        bearer(api_key)
    }

    fn api_url(&self, provider: &ProviderDescriptor, _model: &str, _api_key: &str) -> String {
        provider.api_url.clone()
    }

    fn parse_response(&self, data: &Value) -> Option<String> {
        chat_completion_text(data)
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn build_request(&self, params: &RequestParams) -> Value {
        json!({
            "model": params.model,
            "max_tokens": params.max_tokens,
            "messages": user_messages(params.prompt),
            "system": DEFAULT_SYSTEM_PROMPT,
        })
    }

    fn headers(&self, api_key: &str) -> Vec<(String, String)> {
        vec![
            ("x-api-key".to_string(), api_key.to_string()),
            ("anthropic-version".to_string(), ANTHROPIC_VERSION.to_string()),
            ("anthropic-dangerous-direct-browser-access".to_string(), "true".to_string()),
        ]
    }

    fn api_url(&self, provider: &ProviderDescriptor, _model: &str, _api_key: &str) -> String {
        provider.api_url.clone()
    }

    fn parse_response(&self, data: &Value) -> Option<String> {
        data.get("content")?
            .as_array()?
            .first()?
            .get("text")?
            .as_str()
            .map(str::to_string)
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn build_request(&self, params: &RequestParams) -> Value {
        let max_output_tokens = if params.max_tokens > 0 {
            params.max_tokens
        } else {
            params
                .provider
                .model(params.model)
                .map(|m| m.max_tokens)
                .unwrap_or(GEMINI_FALLBACK_MAX_TOKENS)
        };
        json!({
            "contents": [{ "parts": [{ "text": params.prompt }] }],
            "generationConfig": {
                "maxOutputTokens": max_output_tokens,
                "temperature": FIXED_TEMPERATURE,
            },
        })
    }

    // Gemini authenticates through the URL query instead
    fn headers(&self, _api_key: &str) -> Vec<(String, String)> {
        Vec::new()
    }

    fn api_url(&self, provider: &ProviderDescriptor, model: &str, api_key: &str) -> String {
        format!("{}/{}:generateContent?key={}", provider.api_url, model, api_key)
    }

    fn parse_response(&self, data: &Value) -> Option<String> {
        data.get("candidates")?
            .as_array()?
            .first()?
            .get("content")?
            .get("parts")?
            .as_array()?
            .first()?
            .get("text")?
            .as_str()
            .map(str::to_string)
    }
}

impl ProviderAdapter for GrokAdapter {
    fn build_request(&self, params: &RequestParams) -> Value {
        json!({
            "model": params.model,
            "max_tokens": params.max_tokens,
            "messages": user_messages(params.prompt),
            "temperature": FIXED_TEMPERATURE,
        })
    }

    fn headers(&self, api_key: &str) -> Vec<(String, String)> {
        bearer(api_key)
    }

    fn api_url(&self, provider: &ProviderDescriptor, _model: &str, _api_key: &str) -> String {
        provider.api_url.clone()
    }

    fn parse_response(&self, data: &Value) -> Option<String> {
        chat_completion_text(data)
    }
}

static OPENAI: OpenAiAdapter = OpenAiAdapter;
static ANTHROPIC: AnthropicAdapter = AnthropicAdapter;
static GEMINI: GeminiAdapter = GeminiAdapter;
static GROK: GrokAdapter = GrokAdapter;

pub fn adapter_for(id: ProviderId) -> &'static dyn ProviderAdapter {
    match id {
        ProviderId::OpenAi => &OPENAI,
        ProviderId::Anthropic => &ANTHROPIC,
        ProviderId::Gemini => &GEMINI,
        ProviderId::Grok => &GROK,
    }
}

pub fn adapter_by_name(provider: &str) -> Result<&'static dyn ProviderAdapter> {
    ProviderId::parse(provider)
        .map(adapter_for)
        .ok_or_else(|| SummarizeError::UnsupportedProvider(provider.to_string()))
}

/// Full header set for a provider call.
pub fn request_headers(id: ProviderId, api_key: &str) -> Vec<(String, String)> {
    let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    headers.extend(adapter_for(id).headers(api_key));
    headers
}

pub fn parse_response(id: ProviderId, data: &Value) -> Result<String> {
    match adapter_for(id).parse_response(data) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(SummarizeError::InvalidResponseFormat),
    }
}

/// Pull a human readable message out of a provider error body.
pub fn extract_error_message(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .or_else(|| body.get("message").and_then(Value::as_str))
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::descriptor;

    fn params<'a>(provider: &'a ProviderDescriptor, model: &'a str) -> RequestParams<'a> {
        RequestParams {
            prompt: "Summarize me",
            model,
            max_tokens: 512,
            provider,
        }
    }

    #[test]
    fn test_openai_request_shape() {
        let provider = descriptor(ProviderId::OpenAi).unwrap();
        let body = OpenAiAdapter.build_request(&params(provider, "gpt-4.1-mini"));
        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["max_completion_tokens"], 512);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Summarize me");
        assert!(body.get("temperature").is_some());
    }

    #[test]
    fn test_openai_suppresses_temperature_for_gpt5() {
        let provider = descriptor(ProviderId::OpenAi).unwrap();
        let body = OpenAiAdapter.build_request(&params(provider, "gpt-5-mini"));
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_anthropic_request_and_headers() {
        let provider = descriptor(ProviderId::Anthropic).unwrap();
        let body = AnthropicAdapter.build_request(&params(provider, "claude-sonnet-4-5"));
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["system"], DEFAULT_SYSTEM_PROMPT);

        let headers = request_headers(ProviderId::Anthropic, "sk-ant-key");
        assert!(headers.contains(&("x-api-key".to_string(), "sk-ant-key".to_string())));
        assert!(headers.contains(&("anthropic-version".to_string(), ANTHROPIC_VERSION.to_string())));
        assert!(headers.iter().all(|(k, _)| k != "Authorization"));
    }

    #[test]
    fn test_gemini_key_in_url_not_headers() {
        let provider = descriptor(ProviderId::Gemini).unwrap();
        let url = GeminiAdapter.api_url(provider, "gemini-2.5-flash", "AIkey");
        assert_eq!(
            url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent?key=AIkey"
        );
        assert_eq!(request_headers(ProviderId::Gemini, "AIkey").len(), 1);

        let body = GeminiAdapter.build_request(&params(provider, "gemini-2.5-flash"));
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Summarize me");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 512);
    }

    #[test]
    fn test_grok_fixed_temperature() {
        let provider = descriptor(ProviderId::Grok).unwrap();
        let body = GrokAdapter.build_request(&params(provider, "grok-4-fast-reasoning"));
        assert_eq!(body["max_tokens"], 512);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(
            request_headers(ProviderId::Grok, "xai-k")[1],
            ("Authorization".to_string(), "Bearer xai-k".to_string())
        );
    }

    #[test]
    fn test_parse_response_paths() {
        let openai = json!({"choices": [{"message": {"content": "hello"}}]});
        assert_eq!(parse_response(ProviderId::OpenAi, &openai).unwrap(), "hello");

        let anthropic = json!({"content": [{"type": "text", "text": "hi"}]});
        assert_eq!(parse_response(ProviderId::Anthropic, &anthropic).unwrap(), "hi");

        let gemini = json!({"candidates": [{"content": {"parts": [{"text": "yo"}]}}]});
        assert_eq!(parse_response(ProviderId::Gemini, &gemini).unwrap(), "yo");
    }

    #[test]
    fn test_parse_response_failures() {
        let empty_choices = json!({"choices": []});
        assert_eq!(
            parse_response(ProviderId::Grok, &empty_choices),
            Err(SummarizeError::InvalidResponseFormat)
        );
        let empty_parts = json!({"candidates": [{"content": {"parts": []}}]});
        assert_eq!(
            parse_response(ProviderId::Gemini, &empty_parts),
            Err(SummarizeError::InvalidResponseFormat)
        );
        assert!(parse_response(ProviderId::Anthropic, &json!({})).is_err());
    }

    #[test]
    fn test_unknown_adapter() {
        assert_eq!(
            adapter_by_name("cohere").err(),
            Some(SummarizeError::UnsupportedProvider("cohere".to_string()))
        );
        assert!(adapter_by_name("Anthropic").is_ok());
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(&json!({"error": {"message": "bad key"}})),
            Some("bad key".to_string())
        );
        assert_eq!(
            extract_error_message(&json!({"message": "quota"})),
            Some("quota".to_string())
        );
        assert_eq!(extract_error_message(&json!({})), None);
    }
}
