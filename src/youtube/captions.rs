// captions.rs - Caption track selection, download and payload parsing

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::time::Duration;

use super::bootstrap::decode_html_entities;
use super::{RawTranscript, Segment, SkipReason, ACCEPT_LANGUAGE};
use crate::http::{self, HttpRequest, HttpTransport};

static XML_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<text([^>]*)>(.*?)</text>").expect("Invalid caption xml regex"));
static XML_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bstart\s*=\s*["']([^"']+)["']"#).expect("Invalid start attr regex"));
static XML_DUR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bdur\s*=\s*["']([^"']+)["']"#).expect("Invalid dur attr regex"));
static FMT_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&fmt=[^&]+").expect("Invalid fmt param regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// "asr" for speech-recognition tracks, empty otherwise.
    pub kind: String,
}

impl CaptionTrack {
    pub fn is_auto_generated(&self) -> bool {
        self.kind == "asr"
    }

    fn from_value(value: &Value) -> Option<CaptionTrack> {
        let track = value.as_object()?;
        let base_url = track
            .get("baseUrl")
            .or_else(|| track.get("url"))
            .and_then(Value::as_str)?
            .to_string();
        let text = |key: &str| track.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
        Some(CaptionTrack {
            base_url,
            language_code: text("languageCode"),
            kind: text("kind"),
        })
    }
}

/// Candidate tracks from a player payload, best first: manual before asr,
/// English before others, one track per language. With `skip_auto` the
/// automatic list and every asr track are dropped.
pub fn select_caption_tracks(payload: &Map<String, Value>, skip_auto: bool) -> Vec<CaptionTrack> {
    let renderer = payload
        .get("captions")
        .and_then(|c| c.get("playerCaptionsTracklistRenderer"))
        .or_else(|| payload.get("playerCaptionsTracklistRenderer"));
    let renderer = match renderer.and_then(Value::as_object) {
        Some(renderer) => renderer,
        None => return Vec::new(),
    };

    let list = |key: &str| {
        renderer
            .get(key)
            .and_then(Value::as_array)
            .map(|tracks| tracks.iter().filter_map(CaptionTrack::from_value).collect::<Vec<_>>())
            .unwrap_or_default()
    };

    let mut tracks = list("captionTracks");
    if !skip_auto {
        tracks.extend(list("automaticCaptions"));
    }

    tracks.sort_by_key(|t| (t.is_auto_generated(), t.language_code != "en"));

    let mut seen = HashSet::new();
    tracks.retain(|t| {
        let lang = t.language_code.to_lowercase();
        lang.is_empty() || seen.insert(lang)
    });

    if skip_auto {
        tracks.retain(|t| !t.is_auto_generated());
    }
    tracks
}

/// Caption URL asking for the json3 format.
pub fn json3_url(base_url: &str) -> String {
    match url::Url::parse(base_url) {
        Ok(mut parsed) => {
            let kept: Vec<(String, String)> = parsed
                .query_pairs()
                .filter(|(k, _)| k != "fmt" && k != "alt")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            parsed
                .query_pairs_mut()
                .clear()
                .extend_pairs(kept)
                .append_pair("fmt", "json3")
                .append_pair("alt", "json");
            parsed.to_string()
        }
        Err(_) => {
            let separator = if base_url.contains('?') { '&' } else { '?' };
            format!("{}{}fmt=json3&alt=json", base_url, separator)
        }
    }
}

/// Caption URL with any explicit format removed, so the server returns XML.
pub fn xml_url(base_url: &str) -> String {
    FMT_PARAM_RE.replace_all(base_url, "").into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Milliseconds from a number or numeric string.
pub fn parse_timestamp_ms(value: Option<&Value>, assume_seconds: bool) -> Option<u64> {
    let number = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() || number < 0.0 {
        return None;
    }
    let ms = if assume_seconds { number * 1000.0 } else { number };
    Some(ms.round() as u64)
}

pub fn segment(start_ms: Option<u64>, duration_ms: Option<u64>, text: &str) -> Option<Segment> {
    let start_ms = start_ms?;
    Some(Segment {
        start_ms,
        end_ms: duration_ms.map(|d| start_ms + d),
        text: collapse_whitespace(text),
    })
}

/// json3 payload: `events[].segs[].utf8` with `tStartMs`/`dDurationMs`.
pub fn parse_json3_transcript(raw: &str) -> Option<RawTranscript> {
    let parsed: Value = serde_json::from_str(raw).ok()?;
    let events = parsed.as_object()?.get("events")?.as_array()?;

    let mut lines = Vec::new();
    let mut segments = Vec::new();
    for event in events {
        let segs = match event.get("segs").and_then(Value::as_array) {
            Some(segs) => segs,
            None => continue,
        };
        let text: String = segs
            .iter()
            .filter_map(|seg| seg.get("utf8").and_then(Value::as_str))
            .collect::<String>()
            .trim()
            .to_string();
        if text.is_empty() {
            continue;
        }
        let start = parse_timestamp_ms(event.get("tStartMs"), false);
        let duration = parse_timestamp_ms(event.get("dDurationMs"), false);
        segments.extend(segment(start, duration, &text));
        lines.push(text);
    }

    RawTranscript::from_lines(lines, segments)
}

/// Timed-text XML: `<text start="1.2" dur="3.4">...</text>`, seconds.
pub fn parse_xml_transcript(xml: &str) -> Option<RawTranscript> {
    let mut lines = Vec::new();
    let mut segments = Vec::new();

    for caps in XML_TEXT_RE.captures_iter(xml) {
        let attributes = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let body = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let decoded = collapse_whitespace(&decode_html_entities(body));
        if decoded.is_empty() {
            continue;
        }
        let attr = |re: &Regex| {
            re.captures(attributes)
                .and_then(|c| c.get(1))
                .map(|m| Value::String(m.as_str().to_string()))
        };
        let start = parse_timestamp_ms(attr(&*XML_START_RE).as_ref(), true);
        let duration = parse_timestamp_ms(attr(&*XML_DUR_RE).as_ref(), true);
        segments.extend(segment(start, duration, &decoded));
        lines.push(decoded);
    }

    RawTranscript::from_lines(lines, segments)
}

fn caption_request(url: String) -> HttpRequest {
    HttpRequest::get(url).with_headers(vec![(
        "Accept-Language".to_string(),
        ACCEPT_LANGUAGE.to_string(),
    )])
}

/// Fetch one track: json3 first, then the plain XML form.
pub async fn download_caption_track(
    transport: &dyn HttpTransport,
    track: &CaptionTrack,
    timeout: Duration,
) -> Result<RawTranscript, SkipReason> {
    trace!("[TRACE][YT] downloading {} track ({})", track.language_code, track.kind);
    match http::execute(transport, caption_request(json3_url(&track.base_url)), timeout).await {
        Ok(response) if response.is_success() && !response.body.is_empty() => {
            if let Some(transcript) =
                parse_json3_transcript(&response.body).or_else(|| parse_xml_transcript(&response.body))
            {
                return Ok(transcript);
            }
        }
        Ok(response) => debug!("🎬 json3 caption request returned {}", response.status),
        Err(e) => debug!("🎬 json3 caption request failed: {}", e),
    }

    let response = http::execute(transport, caption_request(xml_url(&track.base_url)), timeout)
        .await
        .map_err(SkipReason::Transport)?;
    if !response.is_success() {
        return Err(SkipReason::Http(response.status));
    }
    parse_json3_transcript(&response.body)
        .or_else(|| parse_xml_transcript(&response.body))
        .ok_or(SkipReason::EmptyTranscript)
}

/// Try every selected track of a player payload until one yields text.
pub async fn transcript_from_player_payload(
    transport: &dyn HttpTransport,
    payload: &Map<String, Value>,
    skip_auto: bool,
    timeout: Duration,
) -> Result<RawTranscript, SkipReason> {
    let tracks = select_caption_tracks(payload, skip_auto);
    if tracks.is_empty() {
        return Err(SkipReason::NoCaptionTracks);
    }

    let mut last = SkipReason::EmptyTranscript;
    for track in &tracks {
        match download_caption_track(transport, track, timeout).await {
            Ok(transcript) => return Ok(transcript),
            Err(reason) => {
                debug!("🎬 Track {} skipped: {}", track.language_code, reason);
                last = reason;
            }
        }
    }
    Err(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeTransport, Reply};
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn sample_payload() -> Map<String, Value> {
        payload(json!({
            "captions": {"playerCaptionsTracklistRenderer": {
                "captionTracks": [
                    {"baseUrl": "https://yt.test/api/timedtext?lang=de", "languageCode": "de"},
                    {"baseUrl": "https://yt.test/api/timedtext?lang=en&kind=asr", "languageCode": "en", "kind": "asr"},
                    {"baseUrl": "https://yt.test/api/timedtext?lang=en", "languageCode": "en"},
                    {"baseUrl": "https://yt.test/api/timedtext?lang=DE2", "languageCode": "DE"},
                    {"languageCode": "fr"}
                ],
                "automaticCaptions": [
                    {"baseUrl": "https://yt.test/api/timedtext?lang=es&kind=asr", "languageCode": "es", "kind": "asr"}
                ]
            }}
        }))
    }

    #[test]
    fn test_track_ordering_and_dedup() {
        let tracks = select_caption_tracks(&sample_payload(), false);
        let langs: Vec<&str> = tracks.iter().map(|t| t.language_code.as_str()).collect();
        assert_eq!(langs, vec!["en", "de", "es"]);
        assert!(!tracks[0].is_auto_generated());
    }

    #[test]
    fn test_no_auto_drops_asr() {
        let tracks = select_caption_tracks(&sample_payload(), true);
        assert!(tracks.iter().all(|t| !t.is_auto_generated()));
        assert_eq!(tracks.len(), 2);
    }

    #[test]
    fn test_top_level_renderer_and_missing_captions() {
        let top = payload(json!({"playerCaptionsTracklistRenderer": {
            "captionTracks": [{"url": "https://yt.test/t", "languageCode": "it"}]
        }}));
        assert_eq!(select_caption_tracks(&top, false).len(), 1);
        assert!(select_caption_tracks(&payload(json!({"videoDetails": {}})), false).is_empty());
    }

    #[test]
    fn test_caption_urls() {
        let json3 = json3_url("https://yt.test/api/timedtext?v=abc&fmt=srv3");
        assert!(json3.contains("v=abc"));
        assert!(json3.contains("fmt=json3"));
        assert!(json3.contains("alt=json"));
        assert!(!json3.contains("srv3"));
        assert_eq!(json3_url("not a url"), "not a url?fmt=json3&alt=json");
        assert_eq!(
            xml_url("https://yt.test/api/timedtext?v=abc&fmt=srv3&lang=en"),
            "https://yt.test/api/timedtext?v=abc&lang=en"
        );
    }

    #[test]
    fn test_parse_json3() {
        let raw = json!({"events": [
            {"tStartMs": 0, "dDurationMs": 1500, "segs": [{"utf8": "Hello "}, {"utf8": "world"}]},
            {"tStartMs": 1500, "segs": [{"utf8": "\n"}]},
            {"tStartMs": "2000", "segs": [{"utf8": "again  and\nagain"}]},
            {"aAppend": 1}
        ]})
        .to_string();
        let transcript = parse_json3_transcript(&raw).unwrap();
        assert_eq!(transcript.text, "Hello world\nagain  and\nagain");
        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.segments[0].end_ms, Some(1500));
        assert_eq!(transcript.segments[1].start_ms, 2000);
        assert_eq!(transcript.segments[1].end_ms, None);
        assert_eq!(transcript.segments[1].text, "again and again");
        assert!(parse_json3_transcript("{\"events\": []}").is_none());
        assert!(parse_json3_transcript("<xml/>").is_none());
    }

    #[test]
    fn test_parse_xml() {
        let xml = r#"<?xml version="1.0"?><transcript><text start="1.5" dur="2.25">Fish &amp; chips</text><text start='4'>  </text><text start="5">bye
now</text></transcript>"#;
        let transcript = parse_xml_transcript(xml).unwrap();
        assert_eq!(transcript.text, "Fish & chips\nbye now");
        assert_eq!(transcript.segments[0].start_ms, 1500);
        assert_eq!(transcript.segments[0].end_ms, Some(3750));
        assert_eq!(transcript.segments[1].start_ms, 5000);
    }

    #[tokio::test]
    async fn test_download_falls_back_to_xml() {
        let transport = FakeTransport::new();
        transport.route("fmt=json3", Reply::text(404, ""));
        transport.route("timedtext", Reply::text(200, r#"<text start="0" dur="1">from xml</text>"#));
        let track = CaptionTrack {
            base_url: "https://yt.test/api/timedtext?v=abc&lang=en".to_string(),
            language_code: "en".to_string(),
            kind: String::new(),
        };
        let transcript = download_caption_track(&transport, &track, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(transcript.text, "from xml");
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(
            transport.requests()[0].header("Accept-Language"),
            Some(ACCEPT_LANGUAGE)
        );
    }

    #[tokio::test]
    async fn test_payload_tries_next_track() {
        let transport = FakeTransport::new();
        transport.route("lang=en", Reply::text(500, ""));
        transport.route(
            "lang=de",
            Reply::json(200, json!({"events": [{"tStartMs": 0, "segs": [{"utf8": "Hallo"}]}]})),
        );
        let transcript = transcript_from_player_payload(&transport, &sample_payload(), true, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(transcript.text, "Hallo");
    }

    #[tokio::test]
    async fn test_payload_without_tracks() {
        let transport = FakeTransport::new();
        let result =
            transcript_from_player_payload(&transport, &payload(json!({})), false, Duration::from_secs(5)).await;
        assert_eq!(result, Err(SkipReason::NoCaptionTracks));
        assert!(transport.requests().is_empty());
    }
}
