// config.rs - Tunables for the summarizer
// Defaults live in the constants below; an optional summarizerconf.txt
// (KEY=VALUE, multi-path fallback like the other config loaders) overrides them.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::time::Duration;

pub const TIMEOUT_MS: u64 = 25_000;
pub const TEST_TIMEOUT_MS: u64 = 5_000;
pub const YOUTUBE_TIMEOUT_MS: u64 = 15_000;
pub const CACHE_TTL_HOURS: i64 = 24;
pub const RETRY_ATTEMPTS: u32 = 3;
pub const MAX_RETRY_ATTEMPTS: u32 = 10;
pub const RETRY_DELAY_BASE_MS: u64 = 1_000;

pub const MIN_CONTENT_LENGTH: usize = 500;
pub const MAX_CONTENT_LENGTH: usize = 50_000;

// Chunking budget heuristics
pub const TOKEN_CHAR_RATIO: usize = 4;
pub const MIN_CONTENT_TOKENS: usize = 1_000;
pub const OUTPUT_TOKEN_RESERVE: usize = 1_024;
pub const PROMPT_TOKEN_OVERHEAD: usize = 500;
pub const MAX_CHUNKS: usize = 12;
pub const OVERLAP_RATIO: f64 = 0.05;
pub const OVERLAP_MAX_CHARS: usize = 400;
pub const CHUNK_MIN_TARGET_WORDS: usize = 80;
pub const CHUNK_MAX_OUTPUT_TOKENS: u32 = 1_024;
pub const CHUNK_TARGET_DIVISOR_CAP: usize = 6;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const DEFAULT_SETTINGS_PATH: &str = "summarizer_settings.json";
pub const DEFAULT_CACHE_PATH: &str = "summarizer_cache.json";

const CONFIG_PATHS: [&str; 4] = [
    "summarizerconf.txt",
    "../summarizerconf.txt",
    "../../summarizerconf.txt",
    "src/summarizerconf.txt",
];

#[derive(Debug, Clone, PartialEq)]
pub struct SummarizerConfig {
    pub timeout: Duration,
    pub test_timeout: Duration,
    pub youtube_timeout: Duration,
    pub cache_ttl_hours: i64,
    pub retry_attempts: u32,
    pub retry_delay_base: Duration,
    pub min_content_length: usize,
    pub max_content_length: usize,
    pub user_agent: String,
    pub settings_path: String,
    pub cache_path: String,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(TIMEOUT_MS),
            test_timeout: Duration::from_millis(TEST_TIMEOUT_MS),
            youtube_timeout: Duration::from_millis(YOUTUBE_TIMEOUT_MS),
            cache_ttl_hours: CACHE_TTL_HOURS,
            retry_attempts: RETRY_ATTEMPTS,
            retry_delay_base: Duration::from_millis(RETRY_DELAY_BASE_MS),
            min_content_length: MIN_CONTENT_LENGTH,
            max_content_length: MAX_CONTENT_LENGTH,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            settings_path: DEFAULT_SETTINGS_PATH.to_string(),
            cache_path: DEFAULT_CACHE_PATH.to_string(),
        }
    }
}

/// Load configuration from summarizerconf.txt using multi-path fallback.
/// A missing file is not an error: every key has a default.
pub fn load_summarizer_config() -> Result<SummarizerConfig, String> {
    for path in &CONFIG_PATHS {
        match fs::read_to_string(path) {
            Ok(content) => {
                let config = parse_config_text(&content)
                    .map_err(|e| format!("{} (in {})", e, path))?;
                info!("⚙️ Summarizer configuration loaded from {}", path);
                return Ok(config);
            }
            Err(_) => continue,
        }
    }

    debug!("⚙️ No summarizerconf.txt found, using built-in defaults");
    Ok(SummarizerConfig::default())
}

/// Parse KEY=VALUE text over the defaults. Unknown keys are ignored with a warning.
pub fn parse_config_text(content: &str) -> Result<SummarizerConfig, String> {
    // Remove BOM if present
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut config_map = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(equals_pos) = line.find('=') {
            let key = line[..equals_pos].trim().to_string();
            let value = line[equals_pos + 1..].trim().to_string();
            config_map.insert(key, value);
        }
    }

    let mut config = SummarizerConfig::default();
    for (key, value) in &config_map {
        match key.as_str() {
            "TIMEOUT_MS" => config.timeout = Duration::from_millis(parse_number(key, value)?),
            "TEST_TIMEOUT_MS" => config.test_timeout = Duration::from_millis(parse_number(key, value)?),
            "YOUTUBE_TIMEOUT_MS" => config.youtube_timeout = Duration::from_millis(parse_number(key, value)?),
            "CACHE_TTL_HOURS" => config.cache_ttl_hours = parse_number(key, value)?,
            "RETRY_ATTEMPTS" => {
                let attempts: u32 = parse_number(key, value)?;
                if attempts == 0 || attempts > MAX_RETRY_ATTEMPTS {
                    return Err(format!(
                        "RETRY_ATTEMPTS must be between 1 and {}",
                        MAX_RETRY_ATTEMPTS
                    ));
                }
                config.retry_attempts = attempts;
            }
            "RETRY_DELAY_BASE_MS" => config.retry_delay_base = Duration::from_millis(parse_number(key, value)?),
            "MIN_CONTENT_LENGTH" => config.min_content_length = parse_number(key, value)?,
            "MAX_CONTENT_LENGTH" => config.max_content_length = parse_number(key, value)?,
            "USER_AGENT" => config.user_agent = value.clone(),
            "SETTINGS_PATH" => config.settings_path = value.clone(),
            "CACHE_PATH" => config.cache_path = value.clone(),
            other => warn!("⚠️ Ignoring unknown configuration key '{}'", other),
        }
    }

    Ok(config)
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid {} value: '{}'", key, value))
}
