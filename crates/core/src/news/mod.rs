pub mod aggregate;
pub mod parse;

use crate::config::Settings;
use crate::domain::news::NewsEnvelope;
use crate::domain::ticker::clamp_news_limit;
use crate::error::{Error, Result};
use crate::news::aggregate::FeedAggregator;
use crate::storage::cache::TtlCache;
use anyhow::Context;

/// Market headline feeds used when `RSS_FEEDS` is unset.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://www.cnbc.com/id/100003114/device/rss/rss.html",
    "https://feeds.a.dj.com/rss/RSSMarketsMain.xml",
    "https://www.marketwatch.com/feeds/topstories",
    "https://finance.yahoo.com/news/rssindex",
    "https://www.investopedia.com/feedbuilder/feed/getfeed?feedName=news",
    "https://www.ft.com/?format=rss",
    "https://www.reuters.com/markets/rss",
];

const FEED_USER_AGENT: &str = "Mozilla/5.0 (compatible; pulse-news/0.1)";

/// Retrieves the raw document behind one feed URL.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    http: reqwest::Client,
}

impl HttpFeedFetcher {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.upstream_timeout)
            .user_agent(FEED_USER_AGENT)
            .build()
            .context("failed to build feed http client")?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::from_transport(url, e))?;

        let status = res.status();
        let text = res.text().await.map_err(|e| Error::from_transport(url, e))?;
        if !status.is_success() {
            return Err(Error::upstream(url, status.as_u16(), &text));
        }
        Ok(text)
    }
}

/// Serves the merged headline list, cached per `(limit, query)`.
pub struct NewsService {
    aggregator: FeedAggregator,
    cache: TtlCache<NewsEnvelope>,
    ttl_secs: u64,
}

impl NewsService {
    pub fn new(aggregator: FeedAggregator, cache: TtlCache<NewsEnvelope>, ttl_secs: u64) -> Self {
        Self {
            aggregator,
            cache,
            ttl_secs,
        }
    }

    pub fn feeds(&self) -> &[String] {
        self.aggregator.feeds()
    }

    pub fn cache_key(limit: usize, query: Option<&str>) -> String {
        format!("news:{limit}:{}", query.unwrap_or(""))
    }

    pub async fn fetch_news(
        &self,
        query: Option<&str>,
        limit: Option<usize>,
    ) -> Result<NewsEnvelope> {
        let limit = clamp_news_limit(limit);
        let query = normalize_query(query);
        let key = Self::cache_key(limit, query.as_deref());

        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(limit, query = query.as_deref().unwrap_or(""), "news cache hit");
            return Ok(hit);
        }

        let report = self.aggregator.collect().await?;
        let items = report
            .items
            .into_iter()
            .filter(|item| query.as_deref().map_or(true, |q| item.matches(q)))
            .take(limit)
            .collect();

        let envelope = NewsEnvelope { items };
        self.cache.set(&key, envelope.clone(), self.ttl_secs);
        Ok(envelope)
    }
}

fn normalize_query(query: Option<&str>) -> Option<String> {
    query
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingFetcher {
        body: String,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl FeedFetcher for CountingFetcher {
        async fn fetch(&self, _url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    fn feed(n: usize) -> String {
        let items: String = (0..n)
            .map(|i| {
                let title = if i % 2 == 0 { "Oil climbs" } else { "Tech slides" };
                format!(
                    "<item><title>{title} {i}</title><link>https://e.com/{i}</link>\
                     <pubDate>Tue, 14 Oct 2025 13:{:02}:00 GMT</pubDate></item>",
                    i % 60
                )
            })
            .collect();
        format!("<rss><channel><title>Wire</title>{items}</channel></rss>")
    }

    fn service(n: usize) -> (NewsService, Arc<CountingFetcher>, Arc<ManualClock>) {
        let fetcher = Arc::new(CountingFetcher {
            body: feed(n),
            calls: AtomicUsize::new(0),
        });
        let clock = Arc::new(ManualClock::new(1_800_000_000_000));
        let aggregator = FeedAggregator::new(
            fetcher.clone(),
            vec!["https://wire.test/rss".to_string()],
            100,
            clock.clone(),
        );
        let svc = NewsService::new(aggregator, TtlCache::with_clock(clock.clone()), 300);
        (svc, fetcher, clock)
    }

    #[tokio::test]
    async fn limit_is_clamped() {
        let (svc, _, _) = service(60);
        assert_eq!(svc.fetch_news(None, Some(1)).await.unwrap().items.len(), 6);
        assert_eq!(svc.fetch_news(None, Some(500)).await.unwrap().items.len(), 50);
        assert_eq!(svc.fetch_news(None, None).await.unwrap().items.len(), 24);
    }

    #[tokio::test]
    async fn query_filters_case_insensitively() {
        let (svc, _, _) = service(10);
        let envelope = svc.fetch_news(Some("  OIL "), Some(50)).await.unwrap();
        assert_eq!(envelope.items.len(), 5);
        assert!(envelope.items.iter().all(|i| i.title.starts_with("Oil")));
    }

    #[tokio::test]
    async fn results_are_cached_per_limit_and_query() {
        let (svc, fetcher, clock) = service(10);
        svc.fetch_news(Some("oil"), Some(10)).await.unwrap();
        svc.fetch_news(Some("Oil"), Some(10)).await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        svc.fetch_news(None, Some(10)).await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);

        clock.advance_millis(301_000);
        svc.fetch_news(Some("oil"), Some(10)).await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn blank_query_means_no_filter() {
        assert_eq!(normalize_query(Some("   ")), None);
        assert_eq!(NewsService::cache_key(24, None), "news:24:");
    }
}
