// main.rs - Command-line driver: loads config, wires the file-backed stores
// and runs one subcommand

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{debug, error, info, warn};
use tokio::signal;

use page_summarizer::config::load_summarizer_config;
use page_summarizer::http::ReqwestTransport;
use page_summarizer::providers::{self, api_key_placeholder, validate_api_key};
use page_summarizer::settings::{KvSettingsStore, RawSettings, Settings, SettingsStore};
use page_summarizer::storage::{JsonFileStore, KeyValueStore};
use page_summarizer::{PageRequest, SummarizeError, Summarizer};

use crate::cli::{Args, Commands};

fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(6).collect();
    if key.chars().count() <= 6 {
        "*".repeat(key.chars().count())
    } else {
        format!("{}…", visible)
    }
}

fn print_settings(settings: &Settings) {
    let mut shown = settings.clone();
    shown.api_key = mask_key(&settings.api_key);
    match serde_json::to_string_pretty(&shown) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("❌ Could not render settings: {}", e),
    }
}

async fn run_summarize(summarizer: &Summarizer, url: &str) -> ExitCode {
    // The page itself is only fetched on a cache miss
    let request = PageRequest::new(url);

    let result = tokio::select! {
        result = summarizer.summarize(request) => result,
        _ = signal::ctrl_c() => {
            summarizer.cancel();
            Err(SummarizeError::Cancelled)
        }
    };

    match result {
        Ok(outcome) => {
            if let Some(title) = &outcome.title {
                println!("# {}\n", title);
            }
            println!("{}", outcome.summary);
            debug!("source: {:?}, cached: {}", outcome.source, outcome.from_cache);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ Summarization failed: {:?}", e);
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_test_key(summarizer: &Summarizer, provider: &str, api_key: &str, model: Option<&str>) -> ExitCode {
    if !validate_api_key(provider, api_key) {
        warn!(
            "🔑 Key does not look like a {} key (expected {})",
            provider,
            api_key_placeholder(provider)
        );
    }
    let model = model
        .or_else(|| providers::default_model(provider))
        .unwrap_or_default();

    let check = summarizer.api().test_api_key(provider, api_key, model).await;
    if check.ok {
        println!("✅ API key works for {}", provider);
        ExitCode::SUCCESS
    } else {
        eprintln!(
            "❌ {}",
            check.error_message.unwrap_or_else(|| "API key test failed.".to_string())
        );
        ExitCode::FAILURE
    }
}

async fn run_set(settings: &KvSettingsStore, pairs: &[(String, String)]) -> ExitCode {
    let mut patch = RawSettings::default();
    for (key, value) in pairs {
        if !patch.set_field(key, value) {
            eprintln!("❌ Unknown settings key '{}'", key);
            return ExitCode::FAILURE;
        }
    }

    match settings.save_settings(patch, true).await {
        Ok(saved) => {
            if !saved.api_key.is_empty() && !validate_api_key(&saved.provider, &saved.api_key) {
                println!("⚠️ {}", SummarizeError::InvalidApiKey);
            }
            print_settings(&saved);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logger - must be done before any logging calls
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_secs()
        .init();

    let config = match load_summarizer_config() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Failed to load summarizerconf.txt: {}", e);
            eprintln!("❌ Failed to load summarizerconf.txt: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let settings_kv: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(&config.settings_path));
    let cache_kv: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(&config.cache_path));
    let settings = Arc::new(KvSettingsStore::new(settings_kv));
    let transport = Arc::new(ReqwestTransport::new(config.user_agent.clone()));
    let summarizer = Summarizer::new(settings.clone(), cache_kv, transport, config.clone());

    let evicted = summarizer.cache().cleanup().await;
    if evicted > 0 {
        info!("🧹 Removed {} expired cache entries at startup", evicted);
    }

    match args.command {
        Commands::Summarize { url } => run_summarize(&summarizer, &url).await,
        Commands::TestKey { provider, api_key, model } => {
            run_test_key(&summarizer, &provider, &api_key, model.as_deref()).await
        }
        Commands::Set { pairs } => run_set(&settings, &pairs).await,
        Commands::ShowSettings => match settings.load_settings().await {
            Ok(current) => {
                print_settings(&current);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::CacheStats => {
            let stats = summarizer.cache().stats().await;
            match serde_json::to_string_pretty(&stats) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("❌ Could not render cache stats: {}", e),
            }
            ExitCode::SUCCESS
        }
        Commands::ClearCache => {
            let removed = summarizer.cache().clear().await;
            println!("🧹 Cleared {} cached summaries", removed);
            ExitCode::SUCCESS
        }
    }
}
