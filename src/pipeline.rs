// pipeline.rs - One summarization request from URL to cached summary
// Cache lookup, content resolution (article text or YouTube transcript),
// provider call and cache write, in that order.

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::api_client::ApiClient;
use crate::cache::SummaryCache;
use crate::config::SummarizerConfig;
use crate::error::{Result, SummarizeError};
use crate::extract::{BasicHtmlExtractor, ContentExtractor};
use crate::http::{self, HttpRequest, HttpTransport};
use crate::prompts::PromptContext;
use crate::settings::{SettingsStore, TranscriptMode};
use crate::storage::KeyValueStore;
use crate::youtube::{self, TranscriptResolver, TranscriptSourceKind};

/// What the caller knows about the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRequest {
    pub url: String,
    /// Page HTML when the caller already has it. Fetched on a cache miss otherwise.
    pub html: Option<String>,
    pub title: Option<String>,
}

impl PageRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    Cached,
    Article,
    Video(TranscriptSourceKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOutcome {
    pub summary: String,
    pub title: Option<String>,
    pub from_cache: bool,
    pub source: ContentSource,
}

struct ResolvedContent {
    text: String,
    context: PromptContext,
    source: ContentSource,
}

pub struct Summarizer {
    settings: Arc<dyn SettingsStore>,
    api: ApiClient,
    cache: SummaryCache,
    resolver: TranscriptResolver,
    extractor: Box<dyn ContentExtractor>,
    transport: Arc<dyn HttpTransport>,
    page_timeout: Duration,
}

fn is_web_url(raw_url: &str) -> bool {
    url::Url::parse(raw_url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

impl Summarizer {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        cache_store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn HttpTransport>,
        config: SummarizerConfig,
    ) -> Self {
        let cache = SummaryCache::new(cache_store, config.cache_ttl_hours);
        let resolver = TranscriptResolver::new(transport.clone(), config.youtube_timeout);
        let extractor = Box::new(BasicHtmlExtractor::new(
            config.min_content_length,
            config.max_content_length,
        ));
        let page_timeout = config.timeout;
        Self {
            api: ApiClient::new(settings.clone(), transport.clone(), config),
            transport,
            page_timeout,
            settings,
            cache,
            resolver,
            extractor,
        }
    }

    pub fn with_cache(mut self, cache: SummaryCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_resolver(mut self, resolver: TranscriptResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_extractor(mut self, extractor: Box<dyn ContentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &SummaryCache {
        &self.cache
    }

    /// Abort the provider call in flight, if any.
    pub fn cancel(&self) {
        self.api.cancel_request();
    }

    pub async fn summarize(&self, request: PageRequest) -> Result<SummaryOutcome> {
        let request_id = Uuid::new_v4();
        info!("📝 [{}] Summarize request for {}", request_id, request.url);

        if !is_web_url(&request.url) {
            warn!("📝 [{}] Refusing non-web URL", request_id);
            return Err(SummarizeError::UnsupportedPage);
        }

        let settings = self.settings.load_settings().await?;
        if let Some(summary) = self.cache.get(&request.url, &settings).await {
            info!("📝 [{}] Served from cache", request_id);
            return Ok(SummaryOutcome {
                summary,
                title: request.title,
                from_cache: true,
                source: ContentSource::Cached,
            });
        }

        let resolved = if youtube::is_youtube_url(&request.url) && youtube::extract_video_id(&request.url).is_some() {
            self.resolve_video(&request, settings.youtube_transcript_mode).await?
        } else {
            self.resolve_article(&request).await?
        };
        debug!(
            "📝 [{}] Resolved {} chars ({:?})",
            request_id,
            resolved.text.chars().count(),
            resolved.source
        );

        let summary = self.api.call_api(&resolved.text, &resolved.context).await.map_err(|e| {
            warn!("📝 [{}] Summary failed: {}", request_id, e);
            e
        })?;

        // The provider call may have repaired the model; key the cache on what was used.
        let used_settings = match self.settings.load_settings().await {
            Ok(current) => current,
            Err(_) => settings,
        };
        self.cache.set(&request.url, &used_settings, &summary).await;

        info!("📝 [{}] Summary ready ({} chars)", request_id, summary.chars().count());
        Ok(SummaryOutcome {
            summary,
            title: resolved.context.title,
            from_cache: false,
            source: resolved.source,
        })
    }

    async fn resolve_video(
        &self,
        request: &PageRequest,
        mode: TranscriptMode,
    ) -> Result<ResolvedContent> {
        let resolution = self.resolver.resolve(&request.url, request.html.as_deref(), mode).await;
        for (strategy, reason) in &resolution.attempts {
            debug!("🎬 {} -> {}", strategy, reason);
        }
        let text = resolution.text.ok_or(SummarizeError::YoutubeTranscriptUnavailable)?;
        let title = resolution.title.or_else(|| request.title.clone());
        Ok(ResolvedContent {
            text,
            context: PromptContext::video(title),
            source: ContentSource::Video(resolution.source),
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let request = HttpRequest::get(url).with_headers(vec![(
            "Accept".to_string(),
            "text/html,application/xhtml+xml".to_string(),
        )]);
        match http::execute(self.transport.as_ref(), request, self.page_timeout).await {
            Ok(response) if response.is_success() => Ok(response.body),
            Ok(response) => {
                warn!("🌐 {} answered {}", http::redact(url), response.status);
                Err(SummarizeError::NetworkError(format!("HTTP {}", response.status)))
            }
            Err(e) => {
                warn!("🌐 Could not fetch {}: {}", http::redact(url), e);
                Err(SummarizeError::NetworkError(e.to_string()))
            }
        }
    }

    async fn resolve_article(&self, request: &PageRequest) -> Result<ResolvedContent> {
        let fetched;
        let html = match request.html.as_deref() {
            Some(html) => html,
            None => {
                fetched = self.fetch_page(&request.url).await?;
                fetched.as_str()
            }
        };
        let extracted = self.extractor.extract(html, &request.url)?;
        let title = request.title.clone().or(extracted.title);
        Ok(ResolvedContent {
            text: extracted.content,
            context: PromptContext::article(title),
            source: ContentSource::Article,
        })
    }
}
