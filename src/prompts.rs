// prompts.rs - Prompt builders for single-pass, per-chunk and synthesis calls

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_TARGET_WORDS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SummaryLength {
    Brief,
    #[default]
    Standard,
    Detailed,
}

impl SummaryLength {
    pub fn parse(value: &str) -> Option<SummaryLength> {
        match value.trim().to_ascii_uppercase().as_str() {
            "BRIEF" => Some(SummaryLength::Brief),
            "STANDARD" => Some(SummaryLength::Standard),
            "DETAILED" => Some(SummaryLength::Detailed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryLength::Brief => "BRIEF",
            SummaryLength::Standard => "STANDARD",
            SummaryLength::Detailed => "DETAILED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SummaryLength::Brief => "Brief",
            SummaryLength::Standard => "Standard",
            SummaryLength::Detailed => "Detailed",
        }
    }

    pub fn target_words(&self) -> usize {
        match self {
            SummaryLength::Brief => 100,
            SummaryLength::Standard => 200,
            SummaryLength::Detailed => 400,
        }
    }
}

/// Word target for a stored length id; unknown ids get the standard target.
pub fn target_words_for(length: &str) -> usize {
    SummaryLength::parse(length)
        .map(|l| l.target_words())
        .unwrap_or(DEFAULT_TARGET_WORDS)
}

impl fmt::Display for SummaryLength {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFormat {
    #[default]
    Paragraph,
    Bullets,
}

impl SummaryFormat {
    pub fn parse(value: &str) -> Option<SummaryFormat> {
        match value.trim().to_ascii_lowercase().as_str() {
            "paragraph" => Some(SummaryFormat::Paragraph),
            "bullets" => Some(SummaryFormat::Bullets),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryFormat::Paragraph => "paragraph",
            SummaryFormat::Bullets => "bullets",
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            SummaryFormat::Bullets => "Format the summary as clear bullet points.",
            SummaryFormat::Paragraph => "Format the summary in well-structured paragraphs.",
        }
    }
}

impl fmt::Display for SummaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceType {
    #[default]
    Article,
    Video,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptContext {
    pub source_type: SourceType,
    pub title: Option<String>,
}

impl PromptContext {
    pub fn article(title: Option<String>) -> Self {
        Self { source_type: SourceType::Article, title }
    }

    pub fn video(title: Option<String>) -> Self {
        Self { source_type: SourceType::Video, title }
    }

    fn subject_label(&self) -> &'static str {
        match self.source_type {
            SourceType::Video => "video transcript",
            SourceType::Article => "article",
        }
    }

    fn content_label(&self) -> &'static str {
        match self.source_type {
            SourceType::Video => "Transcript",
            SourceType::Article => "Article",
        }
    }

    fn title_line(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => format!("Title: {}\n", title),
            _ => String::new(),
        }
    }
}

pub fn get_summary_prompt(
    content: &str,
    length: &str,
    format: SummaryFormat,
    context: &PromptContext,
) -> String {
    let word_count = target_words_for(length);
    let subject = context.subject_label();

    format!(
        "Provide a concise summary of the {subject} below. The summary should be around {word_count} words and capture the essential information while preserving the original meaning and context. {instruction} Avoid including minor details or tangential information. The goal is to provide a quick, informative overview of the {subject}'s core content.\n\n\
Do not include any intro text, e.g. 'Here is a concise summary', get straight to the summary.\n\n\
{label}:\n---\n{title}{content}\n---",
        instruction = format.instruction(),
        label = context.content_label(),
        title = context.title_line(),
    )
}

/// Prompt for one section; `chunk_index` is 1-based.
pub fn build_chunk_prompt(
    chunk: &str,
    chunk_index: usize,
    total_chunks: usize,
    target_words: usize,
    format: SummaryFormat,
    context: &PromptContext,
) -> String {
    format!(
        "Summarize section {chunk_index} of {total_chunks} from a longer {subject}. Target about {target_words} words. {instruction} Keep the key facts and context.\n\n\
Do not include any intro text.\n\n\
{label} section:\n---\n{title}{chunk}\n---",
        subject = context.subject_label(),
        instruction = format.instruction(),
        label = context.content_label(),
        title = context.title_line(),
    )
}

pub fn build_synthesis_prompt(
    chunk_summaries: &str,
    length: &str,
    format: SummaryFormat,
    context: &PromptContext,
) -> String {
    format!(
        "The text below contains summaries of sections from one long {subject}. Synthesize them into a single coherent summary around {word_count} words. {instruction} Remove duplication and keep the most important points.\n\n\
Do not include any intro text.\n\n\
Section summaries:\n---\n{chunk_summaries}\n---",
        subject = context.subject_label(),
        word_count = target_words_for(length),
        instruction = format.instruction(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_bullets_prompt() {
        let prompt = get_summary_prompt("X", "STANDARD", SummaryFormat::Bullets, &PromptContext::default());
        assert!(prompt.contains("bullet points"));
        assert!(prompt.contains("200"));
        assert!(prompt.contains("Article:\n---\nX\n---"));
    }

    #[test]
    fn test_unknown_length_falls_back_to_standard() {
        assert_eq!(target_words_for("EPIC"), 200);
        assert_eq!(target_words_for("brief"), 100);
        let prompt = get_summary_prompt("X", "EPIC", SummaryFormat::Paragraph, &PromptContext::default());
        assert!(prompt.contains("around 200 words"));
        assert!(prompt.contains("well-structured paragraphs"));
    }

    #[test]
    fn test_video_context_labels() {
        let ctx = PromptContext::video(Some("Rust in 100 Seconds".to_string()));
        let prompt = get_summary_prompt("words", "DETAILED", SummaryFormat::Paragraph, &ctx);
        assert!(prompt.contains("summary of the video transcript below"));
        assert!(prompt.contains("around 400 words"));
        assert!(prompt.contains("Transcript:\n---\nTitle: Rust in 100 Seconds\nwords"));
    }

    #[test]
    fn test_chunk_prompt() {
        let ctx = PromptContext::article(None);
        let prompt = build_chunk_prompt("body", 2, 5, 80, SummaryFormat::Bullets, &ctx);
        assert!(prompt.starts_with("Summarize section 2 of 5 from a longer article."));
        assert!(prompt.contains("Target about 80 words."));
        assert!(prompt.contains("Article section:\n---\nbody\n---"));
    }

    #[test]
    fn test_synthesis_prompt_omits_title() {
        let ctx = PromptContext::video(Some("ignored".to_string()));
        let prompt = build_synthesis_prompt("a\n\nb", "BRIEF", SummaryFormat::Paragraph, &ctx);
        assert!(prompt.contains("one long video transcript"));
        assert!(prompt.contains("around 100 words"));
        assert!(prompt.contains("Section summaries:\n---\na\n\nb\n---"));
        assert!(!prompt.contains("ignored"));
    }

    #[test]
    fn test_length_and_format_parse() {
        assert_eq!(SummaryLength::parse("detailed"), Some(SummaryLength::Detailed));
        assert_eq!(SummaryLength::default().label(), "Standard");
        assert_eq!(SummaryFormat::parse("BULLETS"), Some(SummaryFormat::Bullets));
        assert_eq!(SummaryFormat::parse("table"), None);
    }
}
