// transcript.rs - Ordered transcript strategies and the resolver that runs them

use async_trait::async_trait;
use log::{debug, info, trace, warn};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

use super::bootstrap::{self, TranscriptEndpointConfig, YoutubeiBootstrap};
use super::captions::{self, parse_timestamp_ms};
use super::{
    extract_metadata, extract_video_id, is_youtube_url, normalize_transcript_text, RawTranscript, Segment,
    SkipReason, TranscriptResolution, TranscriptSourceKind, ACCEPT_LANGUAGE, YOUTUBE_ORIGIN,
};
use crate::http::{self, HttpRequest, HttpTransport};
use crate::settings::TranscriptMode;

pub const ANDROID_CLIENT_NAME: &str = "ANDROID";
pub const ANDROID_CLIENT_VERSION: &str = "20.10.38";

/// Everything a strategy may look at for one video.
pub struct FetchContext<'a> {
    pub transport: &'a dyn HttpTransport,
    pub url: &'a str,
    pub video_id: &'a str,
    pub html: &'a str,
    pub mode: TranscriptMode,
    pub timeout: Duration,
}

impl FetchContext<'_> {
    fn skip_auto(&self) -> bool {
        self.mode == TranscriptMode::NoAuto
    }
}

#[async_trait]
pub trait TranscriptSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn kind(&self) -> TranscriptSourceKind;
    async fn fetch(&self, ctx: &FetchContext<'_>) -> Result<RawTranscript, SkipReason>;
}

fn json_headers() -> Vec<(String, String)> {
    vec![
        ("Accept".to_string(), "application/json".to_string()),
        ("Accept-Language".to_string(), ACCEPT_LANGUAGE.to_string()),
    ]
}

async fn post_json(
    ctx: &FetchContext<'_>,
    url: String,
    body: Value,
    headers: Vec<(String, String)>,
) -> Result<String, SkipReason> {
    let request = HttpRequest::post_json(url, body)
        .with_headers(json_headers())
        .with_headers(headers);
    let response = http::execute(ctx.transport, request, ctx.timeout)
        .await
        .map_err(SkipReason::Transport)?;
    if !response.is_success() {
        return Err(SkipReason::Http(response.status));
    }
    Ok(response.body)
}

fn parse_player_body(body: &str) -> Result<Map<String, Value>, SkipReason> {
    match serde_json::from_str::<Value>(bootstrap::strip_xssi_prefix(body)) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(SkipReason::Malformed),
    }
}

/// Walk `actions[0].updateEngagementPanelAction...initialSegments` into lines and segments.
pub fn parse_transcript_endpoint_response(data: &Value) -> Option<RawTranscript> {
    let segment_list = data
        .get("actions")?
        .as_array()?
        .first()?
        .pointer(
            "/updateEngagementPanelAction/content/transcriptRenderer/content/transcriptSearchPanelRenderer/body/transcriptSegmentListRenderer/initialSegments",
        )?
        .as_array()?;

    let mut lines = Vec::new();
    let mut segments = Vec::new();
    for item in segment_list {
        let renderer = match item.get("transcriptSegmentRenderer") {
            Some(renderer) => renderer,
            None => continue,
        };
        let runs = match renderer.pointer("/snippet/runs").and_then(Value::as_array) {
            Some(runs) => runs,
            None => continue,
        };
        let text = runs
            .iter()
            .filter_map(|run| run.get("text").and_then(Value::as_str))
            .collect::<String>()
            .trim()
            .to_string();
        if text.is_empty() {
            continue;
        }

        let start = parse_timestamp_ms(renderer.get("startMs"), false);
        let duration = parse_timestamp_ms(renderer.get("durationMs"), false);
        segments.extend(captions::segment(start, duration, &text));
        lines.push(text);
    }

    RawTranscript::from_lines(lines, segments)
}

/// The internal get_transcript endpoint, driven by params embedded in the page.
pub struct YoutubeiTranscriptEndpoint;

#[async_trait]
impl TranscriptSource for YoutubeiTranscriptEndpoint {
    fn name(&self) -> &'static str {
        "youtubei"
    }

    fn kind(&self) -> TranscriptSourceKind {
        TranscriptSourceKind::Youtubei
    }

    async fn fetch(&self, ctx: &FetchContext<'_>) -> Result<RawTranscript, SkipReason> {
        if ctx.skip_auto() {
            return Err(SkipReason::DisabledByMode);
        }
        let config = TranscriptEndpointConfig::from_html(ctx.html).ok_or(SkipReason::MissingTranscriptParams)?;

        let body = json!({
            "context": config.context_for(ctx.url),
            "params": config.params,
        });
        let url = format!("{}/youtubei/v1/get_transcript?key={}", YOUTUBE_ORIGIN, config.api_key);
        let raw = post_json(ctx, url, body, config.headers()).await?;
        let parsed: Value = serde_json::from_str(&raw).map_err(|_| SkipReason::Malformed)?;
        parse_transcript_endpoint_response(&parsed).ok_or(SkipReason::EmptyTranscript)
    }
}

/// Caption tracks listed in the `ytInitialPlayerResponse` already on the page.
pub struct EmbeddedPlayerCaptions;

#[async_trait]
impl TranscriptSource for EmbeddedPlayerCaptions {
    fn name(&self) -> &'static str {
        "embeddedPlayer"
    }

    fn kind(&self) -> TranscriptSourceKind {
        TranscriptSourceKind::CaptionTracks
    }

    async fn fetch(&self, ctx: &FetchContext<'_>) -> Result<RawTranscript, SkipReason> {
        let player = bootstrap::extract_initial_player_response(ctx.html).ok_or(SkipReason::MissingPlayerResponse)?;
        captions::transcript_from_player_payload(ctx.transport, &player, ctx.skip_auto(), ctx.timeout).await
    }
}

/// A fresh player request made with the page's own web client identity.
pub struct WebPlayerCaptions;

#[async_trait]
impl TranscriptSource for WebPlayerCaptions {
    fn name(&self) -> &'static str {
        "webPlayer"
    }

    fn kind(&self) -> TranscriptSourceKind {
        TranscriptSourceKind::CaptionTracks
    }

    async fn fetch(&self, ctx: &FetchContext<'_>) -> Result<RawTranscript, SkipReason> {
        let client = YoutubeiBootstrap::from_html(ctx.html).ok_or(SkipReason::MissingBootstrap)?;
        let api_key = client.api_key.clone().ok_or(SkipReason::MissingApiKey)?;

        let body = json!({
            "context": client.context_for(ctx.url),
            "videoId": ctx.video_id,
            "playbackContext": {
                "contentPlaybackContext": { "html5Preference": "HTML5_PREF_WANTS" }
            },
            "contentCheckOk": true,
            "racyCheckOk": true,
        });
        let url = format!("{}/youtubei/v1/player?key={}", YOUTUBE_ORIGIN, api_key);
        let raw = post_json(ctx, url, body, client.headers(true)).await?;
        let player = parse_player_body(&raw)?;
        captions::transcript_from_player_payload(ctx.transport, &player, ctx.skip_auto(), ctx.timeout).await
    }
}

/// Player request posing as the Android app, which is blocked less often.
pub struct AndroidPlayerCaptions;

#[async_trait]
impl TranscriptSource for AndroidPlayerCaptions {
    fn name(&self) -> &'static str {
        "androidPlayer"
    }

    fn kind(&self) -> TranscriptSourceKind {
        TranscriptSourceKind::CaptionTracks
    }

    async fn fetch(&self, ctx: &FetchContext<'_>) -> Result<RawTranscript, SkipReason> {
        let api_key = bootstrap::extract_innertube_api_key(ctx.html).ok_or(SkipReason::MissingApiKey)?;

        let body = json!({
            "context": {
                "client": {
                    "clientName": ANDROID_CLIENT_NAME,
                    "clientVersion": ANDROID_CLIENT_VERSION,
                }
            },
            "videoId": ctx.video_id,
        });
        let url = format!("{}/youtubei/v1/player?key={}", YOUTUBE_ORIGIN, api_key);
        let raw = post_json(ctx, url, body, Vec::new()).await?;
        let player = parse_player_body(&raw)?;
        captions::transcript_from_player_payload(ctx.transport, &player, ctx.skip_auto(), ctx.timeout).await
    }
}

fn has_bootstrap_markers(html: &str) -> bool {
    html.contains("ytcfg.set") || html.contains("ytInitialPlayerResponse")
}

pub struct TranscriptResolver {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
    sources: Vec<Box<dyn TranscriptSource>>,
}

impl TranscriptResolver {
    pub fn new(transport: Arc<dyn HttpTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            sources: vec![
                Box::new(YoutubeiTranscriptEndpoint),
                Box::new(EmbeddedPlayerCaptions),
                Box::new(WebPlayerCaptions),
                Box::new(AndroidPlayerCaptions),
            ],
        }
    }

    /// Replace the strategy chain, e.g. to retire one that upstream broke.
    pub fn with_sources(mut self, sources: Vec<Box<dyn TranscriptSource>>) -> Self {
        self.sources = sources;
        self
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    async fn fetch_watch_html(&self, url: &str) -> Option<String> {
        let request = HttpRequest::get(url).with_headers(vec![
            ("Accept".to_string(), "text/html,application/xhtml+xml".to_string()),
            ("Accept-Language".to_string(), ACCEPT_LANGUAGE.to_string()),
        ]);
        match http::execute(self.transport.as_ref(), request, self.timeout).await {
            Ok(response) if response.is_success() => Some(response.body),
            Ok(response) => {
                debug!("🎬 Watch page returned {}", response.status);
                None
            }
            Err(e) => {
                debug!("🎬 Watch page fetch failed: {}", e);
                None
            }
        }
    }

    /// Try each strategy in order, then fall back to the video description.
    /// Never fails; an empty `text` means nothing usable was found.
    pub async fn resolve(&self, url: &str, html: Option<&str>, mode: TranscriptMode) -> TranscriptResolution {
        let mut attempts: Vec<(String, SkipReason)> = Vec::new();
        let mut page_html: Option<String> = html.map(str::to_string);

        let video_id = if is_youtube_url(url) { extract_video_id(url) } else { None };

        if let Some(video_id) = video_id {
            if !html.map(has_bootstrap_markers).unwrap_or(false) {
                trace!("[TRACE][YT] no bootstrap data supplied, fetching watch page");
                page_html = self.fetch_watch_html(url).await;
                if page_html.is_none() {
                    attempts.push(("watchPage".to_string(), SkipReason::PageUnavailable));
                }
            }

            if let Some(page) = page_html.as_deref() {
                let ctx = FetchContext {
                    transport: self.transport.as_ref(),
                    url,
                    video_id: &video_id,
                    html: page,
                    mode,
                    timeout: self.timeout,
                };

                for source in &self.sources {
                    match source.fetch(&ctx).await {
                        Ok(raw) => {
                            let text = normalize_transcript_text(&raw.text);
                            if text.is_empty() {
                                attempts.push((source.name().to_string(), SkipReason::EmptyTranscript));
                                continue;
                            }
                            info!("🎬 Transcript for {} resolved via {}", video_id, source.name());
                            return TranscriptResolution {
                                text: Some(text),
                                source: source.kind(),
                                segments: raw.segments,
                                title: extract_metadata(page).title,
                                attempts,
                            };
                        }
                        Err(reason) => {
                            debug!("🎬 Strategy {} skipped: {}", source.name(), reason);
                            attempts.push((source.name().to_string(), reason));
                        }
                    }
                }
            }
        } else {
            debug!("🎬 {} is not a recognised YouTube video URL", http::redact(url));
        }

        let metadata_html = page_html.as_deref().or(html);
        let metadata = metadata_html.map(extract_metadata).unwrap_or_default();

        if let Some(description) = metadata.description.as_deref() {
            let text = normalize_transcript_text(description);
            if !text.is_empty() {
                info!("🎬 No transcript found, using video description ({} chars)", text.len());
                return TranscriptResolution {
                    text: Some(text),
                    source: TranscriptSourceKind::Description,
                    segments: Vec::<Segment>::new(),
                    title: metadata.title,
                    attempts,
                };
            }
        }

        warn!("🎬 No transcript or description available for {}", http::redact(url));
        TranscriptResolution {
            text: None,
            source: TranscriptSourceKind::Unavailable,
            segments: Vec::new(),
            title: metadata.title,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use crate::test_support::{FakeTransport, Reply};

    const WATCH_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn resolver(transport: &Arc<FakeTransport>) -> TranscriptResolver {
        TranscriptResolver::new(transport.clone(), Duration::from_secs(5))
    }

    fn endpoint_response() -> Value {
        json!({
            "actions": [{
                "updateEngagementPanelAction": {
                    "content": {
                        "transcriptRenderer": {
                            "content": {
                                "transcriptSearchPanelRenderer": {
                                    "body": {
                                        "transcriptSegmentListRenderer": {
                                            "initialSegments": [
                                                {"transcriptSegmentRenderer": {
                                                    "startMs": "0", "durationMs": "1500",
                                                    "snippet": {"runs": [{"text": "Never gonna "}, {"text": "give you up"}]}
                                                }},
                                                {"transcriptSectionHeaderRenderer": {}},
                                                {"transcriptSegmentRenderer": {
                                                    "startMs": "1500",
                                                    "snippet": {"runs": [{"text": "  Never   gonna let you down "}]}
                                                }}
                                            ]
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }]
        })
    }

    fn youtubei_html() -> String {
        r#"<script>ytcfg.set({"INNERTUBE_API_KEY":"page-key","INNERTUBE_CONTEXT":{"client":{"clientName":"WEB","visitorData":"vis-1"}},"INNERTUBE_CONTEXT_CLIENT_NAME":1,"INNERTUBE_CONTEXT_CLIENT_VERSION":"2.2024"});</script>
           <script>var data = {"getTranscriptEndpoint":{"params":"PARAMS123"}};</script>
           <meta property="og:title" content="Rick Astley">"#
            .to_string()
    }

    fn caption_player(lang: &str, kind: &str) -> Value {
        json!({
            "captions": {
                "playerCaptionsTracklistRenderer": {
                    "captionTracks": [{
                        "baseUrl": "https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=en",
                        "languageCode": lang,
                        "kind": kind
                    }]
                }
            }
        })
    }

    fn json3_body() -> Reply {
        Reply::json(
            200,
            json!({"events": [{"tStartMs": 0, "dDurationMs": 1000, "segs": [{"utf8": "Hello "}, {"utf8": "world"}]}]}),
        )
    }

    #[test]
    fn test_parse_endpoint_response() {
        let transcript = parse_transcript_endpoint_response(&endpoint_response()).unwrap();
        assert_eq!(transcript.text, "Never gonna give you up\nNever   gonna let you down");
        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.segments[0].end_ms, Some(1500));
        assert_eq!(transcript.segments[1].start_ms, 1500);
        assert_eq!(transcript.segments[1].end_ms, None);
        assert_eq!(transcript.segments[1].text, "Never gonna let you down");
    }

    #[test]
    fn test_parse_endpoint_response_shapes() {
        assert!(parse_transcript_endpoint_response(&json!({})).is_none());
        assert!(parse_transcript_endpoint_response(&json!({"actions": []})).is_none());
        assert!(parse_transcript_endpoint_response(&json!({"actions": [{"other": 1}]})).is_none());
    }

    #[tokio::test]
    async fn test_description_only_html() {
        let transport = Arc::new(FakeTransport::new());
        let html = r#"<html><head><meta name="description" content="A song about   commitment.">
            <meta property="og:title" content="Never Gonna Give You Up"></head></html>"#;

        let result = resolver(&transport).resolve(WATCH_URL, Some(html), TranscriptMode::Auto).await;

        assert_eq!(result.source, TranscriptSourceKind::Description);
        assert_eq!(result.text.as_deref(), Some("A song about commitment."));
        assert_eq!(result.title.as_deref(), Some("Never Gonna Give You Up"));
        assert!(result.segments.is_empty());
        assert_eq!(result.attempts, vec![("watchPage".to_string(), SkipReason::PageUnavailable)]);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Get);
        assert_eq!(requests[0].header("Accept"), Some("text/html,application/xhtml+xml"));
    }

    #[tokio::test]
    async fn test_youtubei_endpoint_wins() {
        let transport = Arc::new(FakeTransport::new());
        transport.route("get_transcript", Reply::json(200, endpoint_response()));

        let html = youtubei_html();
        let result = resolver(&transport).resolve(WATCH_URL, Some(&html), TranscriptMode::Auto).await;

        assert_eq!(result.source, TranscriptSourceKind::Youtubei);
        assert_eq!(
            result.text.as_deref(),
            Some("Never gonna give you up\nNever gonna let you down")
        );
        assert_eq!(result.title.as_deref(), Some("Rick Astley"));
        assert!(result.attempts.is_empty());

        let requests = transport.requests_to("get_transcript");
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.url.ends_with("get_transcript?key=page-key"));
        assert_eq!(request.header("X-Youtube-Client-Name"), Some("1"));
        assert_eq!(request.header("X-Youtube-Client-Version"), Some("2.2024"));
        assert_eq!(request.header("X-Goog-Visitor-Id"), Some("vis-1"));
        assert_eq!(request.header("Accept-Language"), Some(ACCEPT_LANGUAGE));
        let body = request.body.as_ref().unwrap();
        assert_eq!(body["params"], json!("PARAMS123"));
        assert_eq!(body["context"]["client"]["originalUrl"], json!(WATCH_URL));
    }

    #[tokio::test]
    async fn test_no_auto_skips_endpoint_and_asr_tracks() {
        let transport = Arc::new(FakeTransport::new());
        transport.route("get_transcript", Reply::json(200, endpoint_response()));

        let html = format!(
            "{}<script>var ytInitialPlayerResponse = {};</script>",
            youtubei_html(),
            caption_player("en", "asr")
        );
        transport.route("youtubei/v1/player", Reply::json(500, json!({})));

        let result = resolver(&transport).resolve(WATCH_URL, Some(&html), TranscriptMode::NoAuto).await;

        assert!(transport.requests_to("get_transcript").is_empty());
        assert!(transport.requests_to("api/timedtext").is_empty());
        assert_eq!(result.attempts[0], ("youtubei".to_string(), SkipReason::DisabledByMode));
        assert_eq!(result.attempts[1], ("embeddedPlayer".to_string(), SkipReason::NoCaptionTracks));
        assert_eq!(result.attempts[2], ("webPlayer".to_string(), SkipReason::Http(500)));
        assert_eq!(result.source, TranscriptSourceKind::Unavailable);
        assert_eq!(result.text, None);
    }

    #[tokio::test]
    async fn test_embedded_player_captions() {
        let transport = Arc::new(FakeTransport::new());
        transport.route("api/timedtext", json3_body());

        let html = format!(
            "<script>var ytInitialPlayerResponse = {};</script>",
            caption_player("en", "")
        );
        let result = resolver(&transport).resolve(WATCH_URL, Some(&html), TranscriptMode::Auto).await;

        assert_eq!(result.source, TranscriptSourceKind::CaptionTracks);
        assert_eq!(result.text.as_deref(), Some("Hello world"));
        assert_eq!(result.segments[0].end_ms, Some(1000));
        assert_eq!(result.attempts[0].0, "youtubei");
    }

    #[tokio::test]
    async fn test_android_fallback() {
        let transport = Arc::new(FakeTransport::new());
        transport.route("youtubei/v1/player", Reply::json(200, caption_player("de", "")));
        transport.route("api/timedtext", json3_body());

        let html = r#"<script>var ytInitialPlayerResponse = {"videoDetails":{"title":"Android route"}};</script>
            <script>window.cfg = {"INNERTUBE_API_KEY":"android-key"};</script>"#;
        let result = resolver(&transport).resolve(WATCH_URL, Some(html), TranscriptMode::Auto).await;

        assert_eq!(result.source, TranscriptSourceKind::CaptionTracks);
        assert_eq!(result.text.as_deref(), Some("Hello world"));
        assert_eq!(result.title.as_deref(), Some("Android route"));
        let names: Vec<&str> = result.attempts.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["youtubei", "embeddedPlayer", "webPlayer"]);

        let player = &transport.requests_to("youtubei/v1/player")[0];
        assert!(player.url.ends_with("player?key=android-key"));
        let body = player.body.as_ref().unwrap();
        assert_eq!(body["context"]["client"]["clientName"], json!("ANDROID"));
        assert_eq!(body["context"]["client"]["clientVersion"], json!("20.10.38"));
        assert_eq!(body["videoId"], json!("dQw4w9WgXcQ"));
    }

    #[tokio::test]
    async fn test_web_player_strips_xssi_and_sends_identity() {
        let transport = Arc::new(FakeTransport::new());
        let player_body = format!(")]}}'\n{}", caption_player("en", ""));
        transport.route("youtubei/v1/player", Reply::text(200, &player_body));
        transport.route("api/timedtext", json3_body());

        let html = r#"<script>ytcfg.set({"INNERTUBE_API_KEY":"web-key","INNERTUBE_CONTEXT":{"client":{}},"XSRF_TOKEN":"xsrf-1"});</script>"#;
        let result = resolver(&transport).resolve(WATCH_URL, Some(html), TranscriptMode::Auto).await;

        assert_eq!(result.text.as_deref(), Some("Hello world"));
        let player = &transport.requests_to("youtubei/v1/player")[0];
        assert!(player.url.ends_with("player?key=web-key"));
        assert_eq!(player.header("X-Youtube-Identity-Token"), Some("xsrf-1"));
        let body = player.body.as_ref().unwrap();
        assert_eq!(body["playbackContext"]["contentPlaybackContext"]["html5Preference"], json!("HTML5_PREF_WANTS"));
        assert_eq!(body["racyCheckOk"], json!(true));
    }

    #[tokio::test]
    async fn test_refetches_watch_page_without_bootstrap() {
        let transport = Arc::new(FakeTransport::new());
        let fetched = format!(
            "<script>var ytInitialPlayerResponse = {};</script>",
            caption_player("en", "")
        );
        transport.route("watch?v=", Reply::text(200, &fetched));
        transport.route("api/timedtext", json3_body());

        let result = resolver(&transport).resolve(WATCH_URL, None, TranscriptMode::Auto).await;
        assert_eq!(result.text.as_deref(), Some("Hello world"));
        assert_eq!(transport.requests_to("watch?v=").len(), 1);
    }

    #[tokio::test]
    async fn test_non_video_url_skips_strategies() {
        let transport = Arc::new(FakeTransport::new());
        let html = r#"<meta name="description" content="Channel about page">"#;

        let result = resolver(&transport)
            .resolve("https://www.youtube.com/@someone/about", Some(html), TranscriptMode::Auto)
            .await;

        assert!(transport.requests().is_empty());
        assert_eq!(result.source, TranscriptSourceKind::Description);
        assert_eq!(result.text.as_deref(), Some("Channel about page"));
    }

    #[tokio::test]
    async fn test_custom_source_chain() {
        struct Fixed;

        #[async_trait]
        impl TranscriptSource for Fixed {
            fn name(&self) -> &'static str {
                "fixed"
            }
            fn kind(&self) -> TranscriptSourceKind {
                TranscriptSourceKind::CaptionTracks
            }
            async fn fetch(&self, _ctx: &FetchContext<'_>) -> Result<RawTranscript, SkipReason> {
                Ok(RawTranscript {
                    text: "fixed\n\n\n\ntext".to_string(),
                    segments: Vec::new(),
                })
            }
        }

        let transport = Arc::new(FakeTransport::new());
        let resolver = resolver(&transport).with_sources(vec![Box::new(Fixed)]);
        assert_eq!(resolver.source_names(), vec!["fixed"]);

        let result = resolver
            .resolve(WATCH_URL, Some("ytInitialPlayerResponse"), TranscriptMode::Auto)
            .await;
        assert_eq!(result.text.as_deref(), Some("fixed\n\ntext"));
    }
}
