// youtube/mod.rs - YouTube transcript resolution
// Talks to undocumented internal endpoints (youtubei) and scrapes watch-page
// bootstrap data. Either can change upstream without notice; each strategy is
// isolated behind TranscriptSource so a broken one can be dropped on its own.

pub mod bootstrap;
pub mod captions;
pub mod transcript;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::http::TransportError;

pub use transcript::{
    AndroidPlayerCaptions, EmbeddedPlayerCaptions, FetchContext, TranscriptResolver, TranscriptSource,
    WebPlayerCaptions, YoutubeiTranscriptEndpoint,
};

pub const YOUTUBE_ORIGIN: &str = "https://www.youtube.com";
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

static VIDEO_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("Invalid video id regex"));
static HORIZONTAL_WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("Invalid whitespace regex"));
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("Invalid blank line regex"));

/// One timed caption line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub start_ms: u64,
    pub end_ms: Option<u64>,
    pub text: String,
}

/// What a single strategy produced before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTranscript {
    pub text: String,
    pub segments: Vec<Segment>,
}

impl RawTranscript {
    pub(crate) fn from_lines(lines: Vec<String>, segments: Vec<Segment>) -> Option<RawTranscript> {
        let text = lines.join("\n").trim().to_string();
        if text.is_empty() {
            return None;
        }
        Some(RawTranscript { text, segments })
    }
}

/// Why a strategy produced nothing. Logged and collected, never surfaced as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("disabled by transcript mode")]
    DisabledByMode,
    #[error("page has no usable ytcfg bootstrap")]
    MissingBootstrap,
    #[error("page has no transcript endpoint params")]
    MissingTranscriptParams,
    #[error("no innertube api key")]
    MissingApiKey,
    #[error("no player response")]
    MissingPlayerResponse,
    #[error("no caption tracks")]
    NoCaptionTracks,
    #[error("http status {0}")]
    Http(u16),
    #[error("transport: {0}")]
    Transport(TransportError),
    #[error("unexpected payload shape")]
    Malformed,
    #[error("transcript was empty")]
    EmptyTranscript,
    #[error("watch page could not be fetched")]
    PageUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TranscriptSourceKind {
    Youtubei,
    CaptionTracks,
    /// The video description stood in for a transcript.
    Description,
    Unavailable,
}

impl fmt::Display for TranscriptSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TranscriptSourceKind::Youtubei => "youtubei",
            TranscriptSourceKind::CaptionTracks => "captionTracks",
            TranscriptSourceKind::Description => "description",
            TranscriptSourceKind::Unavailable => "unavailable",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptResolution {
    pub text: Option<String>,
    pub source: TranscriptSourceKind,
    pub segments: Vec<Segment>,
    pub title: Option<String>,
    /// Every strategy that was tried and skipped, in order.
    pub attempts: Vec<(String, SkipReason)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
}

pub fn is_youtube_url(raw_url: &str) -> bool {
    match url::Url::parse(raw_url) {
        Ok(parsed) => parsed
            .host_str()
            .map(|h| {
                let host = h.to_ascii_lowercase();
                host.contains("youtube.com") || host.contains("youtu.be")
            })
            .unwrap_or(false),
        Err(_) => {
            let lower = raw_url.to_ascii_lowercase();
            lower.contains("youtube.com") || lower.contains("youtu.be")
        }
    }
}

/// The 11 character video id for watch, short-link, shorts, embed and /v/ URLs.
pub fn extract_video_id(raw_url: &str) -> Option<String> {
    let parsed = url::Url::parse(raw_url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let path = parsed.path();
    let nth_segment = |n: usize| path.split('/').nth(n).map(str::to_string);

    let candidate = if host == "youtu.be" {
        nth_segment(1)
    } else if host.contains("youtube.com") {
        if path.starts_with("/watch") {
            parsed
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned())
        } else if path.starts_with("/shorts/") || path.starts_with("/embed/") || path.starts_with("/v/") {
            nth_segment(2)
        } else {
            None
        }
    } else {
        None
    };

    candidate
        .map(|c| c.trim().to_string())
        .filter(|c| VIDEO_ID_RE.is_match(c))
}

/// Title and description from the embedded player response, falling back to meta tags.
pub fn extract_metadata(html: &str) -> VideoMetadata {
    let details = bootstrap::extract_initial_player_response(html)
        .and_then(|player| player.get("videoDetails").and_then(Value::as_object).cloned());
    let detail = |key: &str| {
        details
            .as_ref()
            .and_then(|d| d.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    VideoMetadata {
        title: detail("title").or_else(|| bootstrap::extract_meta_content(html, "og:title")),
        description: detail("shortDescription")
            .or_else(|| bootstrap::extract_meta_content(html, "description"))
            .or_else(|| bootstrap::extract_meta_content(html, "og:description")),
    }
}

/// Collapse space/tab runs, keep at most one blank line, trim.
pub fn normalize_transcript_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = HORIZONTAL_WS_RE.replace_all(&text, " ");
    BLANK_RUN_RE.replace_all(&text, "\n\n").trim().to_string()
}
