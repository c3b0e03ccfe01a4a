use crate::config::Settings;
use crate::ingest;
use crate::ingest::series::SeriesService;
use crate::llm::client::CompletionClient;
use crate::llm::openai::HttpChatBackend;
use crate::llm::resolver::{ModelResolver, ModelState};
use crate::llm::service::AnalysisService;
use crate::news::aggregate::FeedAggregator;
use crate::news::{HttpFeedFetcher, NewsService};
use crate::storage::cache::TtlCache;
use crate::storage::rate_limit::RateLimiter;
use crate::time::SystemClock;
use std::sync::Arc;

/// Process-wide services shared by every request handler and CLI command.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Arc<Settings>,
    pub analysis: Arc<AnalysisService>,
    pub series: Arc<SeriesService>,
    pub news: Arc<NewsService>,
}

impl AppContext {
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let clock = Arc::new(SystemClock);

        let backend = Arc::new(HttpChatBackend::from_settings(&settings)?);
        let state = match settings.completion_model.as_deref() {
            Some(model) => {
                tracing::info!(model, "completion model pinned by configuration");
                ModelState::seeded(model)
            }
            None => ModelState::new(),
        };
        let resolver = ModelResolver::new(backend.clone(), state);
        let client = CompletionClient::new(backend, resolver, settings.completion_timeout);
        let analysis = AnalysisService::new(client, settings.fallback_enabled);

        let series = SeriesService::new(
            ingest::provider::from_settings(&settings)?,
            TtlCache::with_clock(clock.clone()),
            RateLimiter::with_clock(settings.series_min_interval, clock.clone()),
            settings.series_cache_ttl_secs,
        );

        let aggregator = FeedAggregator::new(
            Arc::new(HttpFeedFetcher::from_settings(&settings)?),
            settings.news_feeds.clone(),
            settings.news_max_items_per_feed,
            clock.clone(),
        )
        .with_max_age(settings.news_max_age());
        let news = NewsService::new(
            aggregator,
            TtlCache::with_clock(clock),
            settings.news_cache_ttl_secs,
        );

        Ok(Self {
            settings: Arc::new(settings),
            analysis: Arc::new(analysis),
            series: Arc::new(series),
            news: Arc::new(news),
        })
    }

    /// The sticky completion model, if one has been chosen yet.
    pub async fn current_model(&self) -> Option<String> {
        self.analysis.client().resolver().state().current().await
    }
}
