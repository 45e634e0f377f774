// cli.rs - Command-line arguments and subcommands

use clap::{Parser, Subcommand};

const AFTER_HELP: &str = "\
SETTINGS KEYS:
  provider, model, apiKey, summaryLength (BRIEF|STANDARD|DETAILED),
  summaryFormat (paragraph|bullets), youtubeTranscriptMode (auto|no-auto)

EXAMPLES:
  page_summarizer summarize https://example.com/post
  page_summarizer set provider=anthropic summaryLength=BRIEF
  page_summarizer test-key openai sk-... gpt-5-mini
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Summarize web pages and YouTube videos with an LLM provider",
    after_help = AFTER_HELP
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Fetch a page (or YouTube transcript) and print its summary
    Summarize {
        /// http(s) URL of the page
        url: String,
    },
    /// Send a minimal request to check that an API key works
    TestKey {
        provider: String,
        api_key: String,
        /// Defaults to the provider's default model
        model: Option<String>,
    },
    /// Update saved settings
    Set {
        /// One or more key=value pairs
        #[arg(required = true, value_parser = parse_key_value)]
        pairs: Vec<(String, String)>,
    },
    /// Print the saved settings with the API key masked
    ShowSettings,
    /// Print cache entry counts and size
    CacheStats,
    /// Remove every cached summary
    ClearCache,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Commands, clap::Error> {
        Args::try_parse_from(std::iter::once("page_summarizer").chain(argv.iter().copied()))
            .map(|args| args.command)
    }

    #[test]
    fn test_subcommands() {
        assert_eq!(
            parse(&["summarize", "https://example.com"]).unwrap(),
            Commands::Summarize { url: "https://example.com".to_string() }
        );
        assert_eq!(
            parse(&["test-key", "openai", "sk-abc"]).unwrap(),
            Commands::TestKey {
                provider: "openai".to_string(),
                api_key: "sk-abc".to_string(),
                model: None,
            }
        );
        assert_eq!(parse(&["show-settings"]).unwrap(), Commands::ShowSettings);
        assert_eq!(parse(&["cache-stats"]).unwrap(), Commands::CacheStats);
        assert_eq!(parse(&["clear-cache"]).unwrap(), Commands::ClearCache);
    }

    #[test]
    fn test_set_pairs() {
        assert_eq!(
            parse(&["set", "provider = anthropic", "summaryFormat=bullets"]).unwrap(),
            Commands::Set {
                pairs: vec![
                    ("provider".to_string(), "anthropic".to_string()),
                    ("summaryFormat".to_string(), "bullets".to_string()),
                ],
            }
        );
        assert!(parse(&["set"]).is_err());
        assert!(parse(&["set", "provider"]).is_err());
    }

    #[test]
    fn test_missing_arguments_are_rejected() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["summarize"]).is_err());
        assert!(parse(&["test-key", "openai"]).is_err());
        assert!(parse(&["bogus"]).is_err());
    }
}
