// extract.rs - Readable text from article HTML
// A deliberately small tag-stripping extractor; anything smarter plugs in
// through ContentExtractor.

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{MAX_CONTENT_LENGTH, MIN_CONTENT_LENGTH};
use crate::error::{Result, SummarizeError};
use crate::youtube::bootstrap::decode_html_entities;

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("Invalid title regex"));
static HIDDEN_BLOCK_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["script", "style", "noscript"]
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).expect("Invalid block regex"))
        .collect()
});
static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Invalid comment regex"));
static BREAK_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(?:p|div|br|li|ul|ol|h[1-6]|tr|section|article|header|footer|blockquote)\b[^>]*>")
        .expect("Invalid break tag regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("Invalid tag regex"));
static SPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").expect("Invalid space regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: Option<String>,
    pub content: String,
}

pub trait ContentExtractor: Send + Sync {
    fn extract(&self, html: &str, url: &str) -> Result<ExtractedContent>;
}

pub fn is_content_too_short(text: &str, min_length: usize) -> bool {
    text.chars().count() < min_length
}

pub struct BasicHtmlExtractor {
    min_length: usize,
    max_length: usize,
}

impl Default for BasicHtmlExtractor {
    fn default() -> Self {
        Self::new(MIN_CONTENT_LENGTH, MAX_CONTENT_LENGTH)
    }
}

impl BasicHtmlExtractor {
    pub fn new(min_length: usize, max_length: usize) -> Self {
        Self { min_length, max_length }
    }

    fn page_title(html: &str) -> Option<String> {
        let raw = TITLE_RE.captures(html)?.get(1)?.as_str();
        let title = SPACE_RUN_RE
            .replace_all(&decode_html_entities(raw).replace('\n', " "), " ")
            .trim()
            .to_string();
        (!title.is_empty()).then_some(title)
    }

    fn visible_text(html: &str) -> String {
        let mut text = COMMENT_RE.replace_all(html, "").into_owned();
        for block in HIDDEN_BLOCK_RES.iter() {
            text = block.replace_all(&text, "").into_owned();
        }
        text = TITLE_RE.replace_all(&text, "").into_owned();
        text = BREAK_TAG_RE.replace_all(&text, "\n").into_owned();
        text = TAG_RE.replace_all(&text, "").into_owned();
        let text = decode_html_entities(&text);

        text.lines()
            .map(|line| SPACE_RUN_RE.replace_all(line, " ").trim().to_string())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ContentExtractor for BasicHtmlExtractor {
    fn extract(&self, html: &str, url: &str) -> Result<ExtractedContent> {
        if is_content_too_short(html, self.min_length) {
            debug!("📄 HTML for {} too short to extract", url);
            return Err(SummarizeError::ContentTooShort);
        }

        let title = Self::page_title(html);
        let mut content = Self::visible_text(html);
        trace!("[TRACE][EXTRACT] {} chars of text from {}", content.chars().count(), url);

        if content.is_empty() {
            return Err(SummarizeError::ContentExtractionFailed);
        }
        if is_content_too_short(&content, self.min_length) {
            return Err(SummarizeError::ContentTooShort);
        }
        if content.chars().count() > self.max_length {
            content = content.chars().take(self.max_length).collect::<String>() + "...";
        }

        Ok(ExtractedContent { title, content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(body: &str) -> String {
        format!(
            r#"<html><head><title> Rust &amp; Friends </title><style>p {{ color: red; }}</style>
            <script>var tracking = "<p>not content</p>";</script></head>
            <body><!-- nav --><noscript>Enable JS</noscript><article><h1>Heading</h1><p>{}</p></article></body></html>"#,
            body
        )
    }

    #[test]
    fn test_extracts_title_and_text() {
        let paragraph = "Ownership keeps memory safe. ".repeat(30);
        let extracted = BasicHtmlExtractor::new(100, 50_000)
            .extract(&article(&paragraph), "https://example.com")
            .unwrap();

        assert_eq!(extracted.title.as_deref(), Some("Rust & Friends"));
        assert!(extracted.content.starts_with("Heading\nOwnership keeps memory safe."));
        assert!(!extracted.content.contains("tracking"));
        assert!(!extracted.content.contains("color"));
        assert!(!extracted.content.contains("Enable JS"));
        assert!(!extracted.content.contains("nav"));
        assert!(!extracted.content.contains('<'));
    }

    #[test]
    fn test_short_html_rejected() {
        let result = BasicHtmlExtractor::default().extract("<p>tiny</p>", "https://example.com");
        assert_eq!(result, Err(SummarizeError::ContentTooShort));
    }

    #[test]
    fn test_short_text_rejected() {
        let html = format!("<html><script>{}</script><p>Just a line.</p></html>", "x".repeat(600));
        let result = BasicHtmlExtractor::default().extract(&html, "https://example.com");
        assert_eq!(result, Err(SummarizeError::ContentTooShort));
    }

    #[test]
    fn test_no_text_fails_extraction() {
        let html = format!("<html><style>{}</style><div></div></html>", "a".repeat(600));
        let result = BasicHtmlExtractor::default().extract(&html, "https://example.com");
        assert_eq!(result, Err(SummarizeError::ContentExtractionFailed));
    }

    #[test]
    fn test_long_text_truncated() {
        let paragraph = "é".repeat(400);
        let extracted = BasicHtmlExtractor::new(10, 200)
            .extract(&article(&paragraph), "https://example.com")
            .unwrap();
        assert_eq!(extracted.content.chars().count(), 203);
        assert!(extracted.content.ends_with("..."));
    }

    #[test]
    fn test_is_content_too_short() {
        assert!(is_content_too_short("abc", 4));
        assert!(!is_content_too_short("abcd", 4));
        assert!(!is_content_too_short("ééé", 3));
    }
}
