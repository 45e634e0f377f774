// bootstrap.rs - Pulling embedded JSON out of a YouTube watch page
// The page carries its player response and client config as JS object
// literals; everything here is best-effort and returns None on any mismatch.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

const XSSI_PREFIX: &str = ")]}'";

static TRANSCRIPT_PARAMS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""getTranscriptEndpoint":\{"params":"([^"]+)"\}"#).expect("Invalid transcript params regex"));

static INNERTUBE_API_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""INNERTUBE_API_KEY":"([^"]+)"|INNERTUBE_API_KEY\\":\\"([^\\"]+)\\""#)
        .expect("Invalid innertube key regex")
});

static META_CONTENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)content\s*=\s*["']([^"']+)["']"#).expect("Invalid meta content regex"));

/// Drop the anti-XSSI guard YouTube prepends to some JSON bodies.
pub fn strip_xssi_prefix(input: &str) -> &str {
    let trimmed = input.trim_start();
    trimmed.strip_prefix(XSSI_PREFIX).unwrap_or(trimmed)
}

/// Text of the first balanced `{...}` at or after `start_at`.
/// Braces inside single or double quoted strings (escapes included) don't count.
pub fn extract_balanced_json_object(source: &str, start_at: usize) -> Option<&str> {
    let bytes = source.as_bytes();
    let start = start_at + source.get(start_at..)?.find('{')?;

    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaping = false;

    for (i, &ch) in bytes.iter().enumerate().skip(start) {
        if let Some(q) = quote {
            if escaping {
                escaping = false;
            } else if ch == b'\\' {
                escaping = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            b'"' | b'\'' => quote = Some(ch),
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return source.get(start..=i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// The `ytInitialPlayerResponse = {...}` object embedded in the page.
pub fn extract_initial_player_response(html: &str) -> Option<Map<String, Value>> {
    let token = html.find("ytInitialPlayerResponse")?;
    let assignment = token + html[token..].find('=')?;
    parse_object(extract_balanced_json_object(html, assignment)?)
}

/// The page's ytcfg object, from `ytcfg.set({...})` or `var ytcfg = {...}`.
pub fn extract_bootstrap_config(html: &str) -> Option<Map<String, Value>> {
    let source = strip_xssi_prefix(html);
    const SET_MARKER: &str = "ytcfg.set";

    let mut from = 0;
    while let Some(found) = source[from..].find(SET_MARKER) {
        let index = from + found;
        if let Some(config) = extract_balanced_json_object(source, index).and_then(parse_object) {
            return Some(config);
        }
        from = index + SET_MARKER.len();
    }

    let var_index = source.find("var ytcfg")?;
    parse_object(extract_balanced_json_object(source, var_index)?)
}

pub fn extract_innertube_api_key(html: &str) -> Option<String> {
    let caps = INNERTUBE_API_KEY_RE.captures(html)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().trim().to_string())
        .filter(|k| !k.is_empty())
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Client name may be stored as a number or a string.
fn client_name_field(map: &Map<String, Value>) -> Option<String> {
    match map.get("INNERTUBE_CONTEXT_CLIENT_NAME")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Client identity pulled from ytcfg, used to impersonate the web player.
#[derive(Debug, Clone, PartialEq)]
pub struct YoutubeiBootstrap {
    pub api_key: Option<String>,
    pub context: Map<String, Value>,
    pub client_name: Option<String>,
    pub client_version: Option<String>,
    pub visitor_data: Option<String>,
    pub page_cl: Option<i64>,
    pub page_label: Option<String>,
    pub xsrf_token: Option<String>,
}

impl YoutubeiBootstrap {
    pub fn from_html(html: &str) -> Option<Self> {
        let config = extract_bootstrap_config(html)?;
        let context = config.get("INNERTUBE_CONTEXT")?.as_object()?.clone();
        let visitor_data = context
            .get("client")
            .and_then(|c| c.get("visitorData"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(Self {
            api_key: string_field(&config, "INNERTUBE_API_KEY"),
            client_name: client_name_field(&config),
            client_version: string_field(&config, "INNERTUBE_CLIENT_VERSION"),
            visitor_data,
            page_cl: config.get("PAGE_CL").and_then(Value::as_i64),
            page_label: string_field(&config, "PAGE_BUILD_LABEL"),
            xsrf_token: string_field(&config, "XSRF_TOKEN"),
            context,
        })
    }

    /// The page context with `client.originalUrl` set.
    pub fn context_for(&self, original_url: &str) -> Value {
        with_original_url(&self.context, original_url)
    }

    /// Identity headers; the identity token is only sent when asked for.
    pub fn headers(&self, include_identity: bool) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        push_opt(&mut headers, "X-Youtube-Client-Name", self.client_name.as_deref());
        push_opt(&mut headers, "X-Youtube-Client-Version", self.client_version.as_deref());
        push_opt(&mut headers, "X-Goog-Visitor-Id", self.visitor_data.as_deref());
        if let Some(cl) = self.page_cl {
            headers.push(("X-Youtube-Page-CL".to_string(), cl.to_string()));
        }
        push_opt(&mut headers, "X-Youtube-Page-Label", self.page_label.as_deref());
        if include_identity {
            push_opt(&mut headers, "X-Youtube-Identity-Token", self.xsrf_token.as_deref());
        }
        headers
    }
}

/// Everything needed to call the internal get_transcript endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEndpointConfig {
    pub api_key: String,
    pub params: String,
    pub context: Map<String, Value>,
    pub client_name: Option<String>,
    pub client_version: Option<String>,
    pub visitor_data: Option<String>,
    pub page_cl: Option<i64>,
    pub page_label: Option<String>,
}

impl TranscriptEndpointConfig {
    pub fn from_html(html: &str) -> Option<Self> {
        let config = extract_bootstrap_config(html)?;
        let params = TRANSCRIPT_PARAMS_RE.captures(html)?.get(1)?.as_str().to_string();
        let api_key = string_field(&config, "INNERTUBE_API_KEY")?;
        let context = config.get("INNERTUBE_CONTEXT")?.as_object()?.clone();

        let visitor_data = string_field(&config, "VISITOR_DATA").or_else(|| {
            context
                .get("client")
                .and_then(|c| c.get("visitorData"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });

        Some(Self {
            api_key,
            params,
            client_name: client_name_field(&config),
            client_version: string_field(&config, "INNERTUBE_CONTEXT_CLIENT_VERSION"),
            visitor_data,
            page_cl: config.get("PAGE_CL").and_then(Value::as_i64),
            page_label: string_field(&config, "PAGE_BUILD_LABEL"),
            context,
        })
    }

    pub fn context_for(&self, original_url: &str) -> Value {
        with_original_url(&self.context, original_url)
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        push_opt(&mut headers, "X-Youtube-Client-Name", self.client_name.as_deref());
        push_opt(&mut headers, "X-Youtube-Client-Version", self.client_version.as_deref());
        push_opt(&mut headers, "X-Goog-Visitor-Id", self.visitor_data.as_deref());
        if let Some(cl) = self.page_cl {
            headers.push(("X-Youtube-Page-CL".to_string(), cl.to_string()));
        }
        push_opt(&mut headers, "X-Youtube-Page-Label", self.page_label.as_deref());
        headers
    }
}

fn push_opt(headers: &mut Vec<(String, String)>, name: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        headers.push((name.to_string(), value.to_string()));
    }
}

fn with_original_url(context: &Map<String, Value>, original_url: &str) -> Value {
    let mut context = context.clone();
    let mut client = context
        .get("client")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    client.insert("originalUrl".to_string(), Value::String(original_url.to_string()));
    context.insert("client".to_string(), Value::Object(client));
    Value::Object(context)
}

/// Content of a `<meta name|property="...">` tag, entity-decoded.
pub fn extract_meta_content(html: &str, name: &str) -> Option<String> {
    let pattern = format!(
        r#"(?i)<meta[^>]+(?:name|property)=["']{}["'][^>]*>"#,
        regex::escape(name)
    );
    let tag_re = Regex::new(&pattern).ok()?;
    let tag = tag_re.find(html)?.as_str();
    let content = META_CONTENT_RE.captures(tag)?.get(1)?.as_str();
    Some(decode_html_entities(content))
}

pub fn decode_html_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&#x2F;", "/")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
