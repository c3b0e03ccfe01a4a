use crate::domain::news::NewsItem;
use crate::error::{Error, Result};
use crate::news::parse::{domain_of, parse_feed};
use crate::news::FeedFetcher;
use crate::time::Clock;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one fan-out pass over every configured feed.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    /// Deduplicated by link, newest first.
    pub items: Vec<NewsItem>,
    pub failed: usize,
}

pub struct FeedAggregator {
    fetcher: Arc<dyn FeedFetcher>,
    feeds: Vec<String>,
    max_items_per_feed: usize,
    max_age: Option<Duration>,
    clock: Arc<dyn Clock>,
}

impl FeedAggregator {
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        feeds: Vec<String>,
        max_items_per_feed: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            feeds,
            max_items_per_feed,
            max_age: None,
            clock,
        }
    }

    /// Drop dated items published more than `max_age` before the fetch.
    /// Undated items carry the fetch time and always survive.
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    /// Fetch all feeds concurrently and merge what came back.
    ///
    /// A broken source is logged and counted, never fatal, unless every source
    /// failed.
    pub async fn collect(&self) -> Result<AggregateReport> {
        let fetched_at = self.clock.now_millis();
        let results = join_all(self.feeds.iter().map(|url| self.load(url, fetched_at))).await;

        let mut failed = 0usize;
        let mut per_source = Vec::with_capacity(results.len());
        for (url, result) in self.feeds.iter().zip(results) {
            match result {
                Ok(items) => per_source.push(items),
                Err(err) => {
                    failed += 1;
                    tracing::warn!(feed = %url, reason = err.reason(), error = %err, "feed source failed");
                }
            }
        }

        tracing::info!(
            sources = self.feeds.len(),
            failed,
            "feed aggregation pass finished"
        );

        if !self.feeds.is_empty() && failed == self.feeds.len() {
            return Err(Error::AllSourcesFailed { failed });
        }

        Ok(AggregateReport {
            items: merge(per_source),
            failed,
        })
    }

    async fn load(&self, url: &str, fetched_at: i64) -> Result<Vec<NewsItem>> {
        let body = self.fetcher.fetch(url).await?;
        let host = domain_of(url);
        let fallback = if host.is_empty() { url } else { host.as_str() };
        let feed = parse_feed(&body, fallback, fetched_at, self.max_items_per_feed)
            .map_err(|e| Error::malformed(url, e.to_string()))?;

        let mut items = feed.items;
        if let Some(max_age) = self.max_age {
            let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
            let cutoff = fetched_at.saturating_sub(max_age_ms);
            let before = items.len();
            items.retain(|item| item.published_at_millis >= cutoff);
            if items.len() < before {
                tracing::debug!(feed = %url, dropped = before - items.len(), "stale feed items dropped");
            }
        }
        Ok(items)
    }
}

/// Concatenate sources in order, keep the first item per link, newest first.
pub fn merge(sources: Vec<Vec<NewsItem>>) -> Vec<NewsItem> {
    let mut seen = HashSet::new();
    let mut items: Vec<NewsItem> = sources
        .into_iter()
        .flatten()
        .filter(|item| seen.insert(item.link.clone()))
        .collect();
    items.sort_by(|a, b| b.published_at_millis.cmp(&a.published_at_millis));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::news::PLACEHOLDER_IMAGE;
    use crate::time::ManualClock;
    use std::collections::HashMap;

    struct FixtureFetcher {
        bodies: HashMap<String, Result<String>>,
    }

    #[async_trait::async_trait]
    impl FeedFetcher for FixtureFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.bodies
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err(Error::upstream("feed", 404, "not found")))
        }
    }

    fn item(link: &str, source: &str, at: i64) -> NewsItem {
        NewsItem {
            source: source.into(),
            title: format!("title {link}"),
            description: String::new(),
            link: link.into(),
            published_at_millis: at,
            image: PLACEHOLDER_IMAGE.into(),
            domain: "example.com".into(),
        }
    }

    fn rss(title: &str, items: &[(&str, Option<&str>)]) -> String {
        let body: String = items
            .iter()
            .map(|(link, date)| {
                let date = date
                    .map(|d| format!("<pubDate>{d}</pubDate>"))
                    .unwrap_or_default();
                format!("<item><title>{link}</title><link>{link}</link>{date}</item>")
            })
            .collect();
        format!("<rss><channel><title>{title}</title>{body}</channel></rss>")
    }

    fn aggregator(bodies: Vec<(&str, Result<String>)>, now: i64) -> FeedAggregator {
        let feeds = bodies.iter().map(|(u, _)| u.to_string()).collect();
        let fetcher = FixtureFetcher {
            bodies: bodies
                .into_iter()
                .map(|(u, b)| (u.to_string(), b))
                .collect(),
        };
        FeedAggregator::new(
            Arc::new(fetcher),
            feeds,
            100,
            Arc::new(ManualClock::new(now)),
        )
    }

    #[test]
    fn merge_keeps_first_seen_link_and_sorts_newest_first() {
        let merged = merge(vec![
            vec![item("https://e.com/1", "A", 10), item("https://e.com/2", "A", 30)],
            vec![item("https://e.com/1", "B", 99), item("https://e.com/3", "B", 20)],
        ]);
        let links: Vec<_> = merged.iter().map(|i| i.link.as_str()).collect();
        assert_eq!(links, vec!["https://e.com/2", "https://e.com/3", "https://e.com/1"]);
        assert_eq!(merged[2].source, "A");
    }

    #[tokio::test]
    async fn overlapping_sources_yield_one_item_per_link() {
        let a = rss(
            "Alpha",
            &[("https://e.com/shared", Some("Tue, 14 Oct 2025 13:30:00 GMT"))],
        );
        let b = rss(
            "Beta",
            &[
                ("https://e.com/shared", Some("Tue, 14 Oct 2025 13:30:00 GMT")),
                ("https://e.com/only-b", Some("Mon, 13 Oct 2025 09:00:00 GMT")),
            ],
        );
        let agg = aggregator(
            vec![("https://a.test/rss", Ok(a)), ("https://b.test/rss", Ok(b))],
            1_800_000_000_000,
        );

        let report = agg.collect().await.unwrap();
        assert_eq!(report.failed, 0);
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.items[0].link, "https://e.com/shared");
        assert_eq!(report.items[0].source, "Alpha");
    }

    #[tokio::test]
    async fn broken_sources_are_dropped_and_counted() {
        let good = rss("Good", &[("https://e.com/x", None)]);
        let agg = aggregator(
            vec![
                ("https://good.test/rss", Ok(good)),
                ("https://html.test/", Ok("<html><body>nope</body></html>".into())),
                ("https://down.test/rss", Err(Error::Timeout { upstream: "feed".into() })),
            ],
            1_800_000_000_000,
        );

        let report = agg.collect().await.unwrap();
        assert_eq!(report.failed, 2);
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].published_at_millis, 1_800_000_000_000);
    }

    #[tokio::test]
    async fn every_source_failing_is_an_error() {
        let agg = aggregator(
            vec![
                ("https://a.test/rss", Err(Error::upstream("feed", 503, "down"))),
                ("https://b.test/rss", Ok("not xml at all".into())),
            ],
            0,
        );
        assert_eq!(
            agg.collect().await.unwrap_err(),
            Error::AllSourcesFailed { failed: 2 }
        );
    }

    #[tokio::test]
    async fn undated_items_sort_as_fetch_time() {
        let feed = rss(
            "Wire",
            &[
                ("https://e.com/old", Some("Mon, 13 Oct 2025 09:00:00 GMT")),
                ("https://e.com/undated", None),
            ],
        );
        let agg = aggregator(vec![("https://w.test/rss", Ok(feed))], 1_800_000_000_000);
        let report = agg.collect().await.unwrap();
        assert_eq!(report.items[0].link, "https://e.com/undated");
    }

    #[tokio::test]
    async fn items_older_than_max_age_are_dropped() {
        // 2025-10-14T13:30:00Z
        let now = 1_760_448_600_000;
        let feed = rss(
            "Wire",
            &[
                ("https://e.com/fresh", Some("Tue, 14 Oct 2025 12:30:00 GMT")),
                ("https://e.com/stale", Some("Sat, 11 Oct 2025 13:30:00 GMT")),
                ("https://e.com/undated", None),
            ],
        );
        let agg = aggregator(vec![("https://w.test/rss", Ok(feed))], now)
            .with_max_age(Some(Duration::from_secs(48 * 3_600)));

        let report = agg.collect().await.unwrap();
        let links: Vec<_> = report.items.iter().map(|i| i.link.as_str()).collect();
        assert_eq!(links, vec!["https://e.com/undated", "https://e.com/fresh"]);
    }

    #[tokio::test]
    async fn untitled_feed_is_labelled_by_host() {
        let feed = "<rss><channel><item><title>t</title><link>https://e.com/1</link></item></channel></rss>";
        let agg = aggregator(vec![("https://www.wire.test/rss", Ok(feed.into()))], 0);
        let report = agg.collect().await.unwrap();
        assert_eq!(report.items[0].source, "wire.test");
    }
}
