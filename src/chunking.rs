// chunking.rs - Budget estimation and boundary-aware splitting of long content
// Lengths are counted in chars, never bytes, so multi-byte text can't be cut
// mid code point.

use log::trace;

use crate::config::{
    MAX_CHUNKS, MIN_CONTENT_TOKENS, OUTPUT_TOKEN_RESERVE, OVERLAP_MAX_CHARS, OVERLAP_RATIO,
    PROMPT_TOKEN_OVERHEAD, TOKEN_CHAR_RATIO,
};

/// Natural break points, in the order they are considered.
const BOUNDARIES: [&str; 5] = ["\n\n", ". ", "? ", "! ", "\n"];

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPlan {
    pub max_chunk_chars: usize,
    pub overlap_chars: usize,
    pub chunks: Vec<String>,
}

impl ChunkPlan {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Character budget for the content part of a prompt, from a model's output limit.
/// Uses a fixed chars-per-token ratio rather than real tokenization.
pub fn estimate_max_content_chars(max_tokens: u32) -> usize {
    let available_tokens = (max_tokens as usize)
        .saturating_sub(OUTPUT_TOKEN_RESERVE)
        .saturating_sub(PROMPT_TOKEN_OVERHEAD)
        .max(MIN_CONTENT_TOKENS);
    available_tokens * TOKEN_CHAR_RATIO
}

pub fn should_chunk(content: &str, max_tokens: u32) -> bool {
    if content.is_empty() {
        return false;
    }
    content.chars().count() > estimate_max_content_chars(max_tokens)
}

pub fn overlap_for(max_chunk_chars: usize) -> usize {
    let proportional = (max_chunk_chars as f64 * OVERLAP_RATIO).floor() as usize;
    proportional.min(OVERLAP_MAX_CHARS)
}

pub fn plan_chunks(content: &str, max_tokens: u32) -> ChunkPlan {
    let max_chunk_chars = estimate_max_content_chars(max_tokens);
    let overlap_chars = overlap_for(max_chunk_chars);
    ChunkPlan {
        max_chunk_chars,
        overlap_chars,
        chunks: split_into_chunks(content, max_chunk_chars, overlap_chars),
    }
}

fn last_index_of(haystack: &[char], needle: &str) -> Option<usize> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| haystack[i..i + needle.len()] == needle[..])
}

fn find_boundary(window: &[char]) -> Option<usize> {
    BOUNDARIES
        .iter()
        .filter_map(|b| last_index_of(window, b))
        .max()
}

fn trimmed(chars: &[char]) -> String {
    chars.iter().collect::<String>().trim().to_string()
}

/// Greedy left-to-right split. Non-final chunks never exceed `max_chunk_chars`;
/// at most `MAX_CHUNKS` chunks are produced, the last one taking the remainder.
pub fn split_into_chunks(content: &str, max_chunk_chars: usize, overlap_chars: usize) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= max_chunk_chars {
        return vec![content.trim().to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let half_window = max_chunk_chars / 2;

    while start < chars.len() {
        if chunks.len() >= MAX_CHUNKS - 1 {
            let tail = trimmed(&chars[start..]);
            if !tail.is_empty() {
                chunks.push(tail);
            }
            break;
        }

        let end = (start + max_chunk_chars).min(chars.len());
        let window = &chars[start..end];
        let offset = match find_boundary(window) {
            Some(boundary) if boundary > half_window => boundary + 1,
            _ => window.len(),
        };
        let actual_end = start + offset;
        let chunk = trimmed(&chars[start..actual_end]);
        if chunk.is_empty() {
            break;
        }
        trace!("[TRACE][CHUNK] chunk {} spans chars {}..{}", chunks.len() + 1, start, actual_end);
        chunks.push(chunk);
        if chars[actual_end..].iter().all(|c| c.is_whitespace()) {
            break;
        }

        let next_start = actual_end.saturating_sub(overlap_chars);
        start = if next_start <= start { actual_end } else { next_start };
    }

    chunks
}
