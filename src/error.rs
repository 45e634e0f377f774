// error.rs - Error taxonomy for the summarization pipeline
// Every variant's Display string is the single user-facing message the caller
// shows; detailed causes go to the log instead.

use thiserror::Error;

pub const API_CALL_FAILED_MESSAGE: &str = "Failed to generate summary. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SummarizeError {
    #[error("API key not found. Please configure your API key in settings.")]
    NoApiKey,

    #[error("Invalid API key format. Please check your API key.")]
    InvalidApiKey,

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("No models available for provider: {0}")]
    NoModelsAvailable(String),

    #[error("Invalid response format from API")]
    InvalidResponseFormat,

    #[error("Summary generation timed out. Please try again.")]
    Timeout,

    #[error("Summary request was cancelled.")]
    Cancelled,

    /// Carries the provider's own error message when one was returned.
    #[error("{}", api_call_failed_message(.0))]
    ApiCallFailed(String),

    #[error("Could not extract readable content from this page.")]
    ContentExtractionFailed,

    #[error("Could not retrieve a transcript for this YouTube video.")]
    YoutubeTranscriptUnavailable,

    #[error("Page content is too short to summarize (minimum 500 characters).")]
    ContentTooShort,

    #[error("Cannot summarize this page. Try a different website.")]
    UnsupportedPage,

    #[error("Network error. Please check your connection and try again.")]
    NetworkError(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

fn api_call_failed_message(message: &str) -> &str {
    if message.trim().is_empty() {
        API_CALL_FAILED_MESSAGE
    } else {
        message
    }
}

pub type Result<T> = std::result::Result<T, SummarizeError>;

impl SummarizeError {
    /// Whether another attempt of the same HTTP call could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SummarizeError::Timeout | SummarizeError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_call_failed_falls_back_to_generic_message() {
        assert_eq!(SummarizeError::ApiCallFailed(String::new()).to_string(), API_CALL_FAILED_MESSAGE);
        assert_eq!(
            SummarizeError::ApiCallFailed("Rate limit exceeded".to_string()).to_string(),
            "Rate limit exceeded"
        );
    }

    #[test]
    fn test_unsupported_provider_message() {
        let err = SummarizeError::UnsupportedProvider("mistral".to_string());
        assert_eq!(err.to_string(), "Unsupported provider: mistral");
    }

    #[test]
    fn test_timeout_and_cancel_are_not_retryable() {
        assert!(!SummarizeError::Timeout.is_retryable());
        assert!(!SummarizeError::Cancelled.is_retryable());
        assert!(SummarizeError::NetworkError("reset".to_string()).is_retryable());
        assert!(SummarizeError::InvalidResponseFormat.is_retryable());
    }
}
