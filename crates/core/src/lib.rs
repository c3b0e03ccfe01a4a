pub mod context;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod news;
pub mod storage;
pub mod time;

pub mod config {
    use crate::error::Error;
    use crate::ingest::provider::PriceVendorKind;
    use std::time::Duration;

    pub const DEFAULT_PORT: u16 = 3000;
    pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.groq.com/openai/v1";
    pub const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 15;
    pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 12;
    pub const DEFAULT_SERIES_CACHE_TTL_SECS: u64 = 900;
    pub const DEFAULT_NEWS_CACHE_TTL_SECS: u64 = 300;
    pub const DEFAULT_SERIES_MIN_INTERVAL_MS: u64 = 2_000;
    pub const DEFAULT_NEWS_MAX_ITEMS_PER_FEED: usize = 100;
    pub const DEFAULT_NEWS_SINCE_HOURS: u64 = 48;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub port: u16,
        pub sentry_dsn: Option<String>,

        pub completion_api_key: Option<String>,
        pub completion_base_url: String,
        pub completion_model: Option<String>,
        pub completion_timeout: Duration,
        pub fallback_enabled: bool,

        pub price_vendor: PriceVendorKind,
        pub finnhub_api_key: Option<String>,
        pub alphavantage_api_key: Option<String>,
        pub series_cache_ttl_secs: u64,
        pub series_min_interval: Duration,

        pub news_cache_ttl_secs: u64,
        pub news_feeds: Vec<String>,
        pub news_max_items_per_feed: usize,
        /// Dated items older than this are dropped; 0 keeps everything.
        pub news_since_hours: u64,

        pub upstream_timeout: Duration,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                port: DEFAULT_PORT,
                sentry_dsn: None,
                completion_api_key: None,
                completion_base_url: DEFAULT_COMPLETION_BASE_URL.to_string(),
                completion_model: None,
                completion_timeout: Duration::from_secs(DEFAULT_COMPLETION_TIMEOUT_SECS),
                fallback_enabled: true,
                price_vendor: PriceVendorKind::Yahoo,
                finnhub_api_key: None,
                alphavantage_api_key: None,
                series_cache_ttl_secs: DEFAULT_SERIES_CACHE_TTL_SECS,
                series_min_interval: Duration::from_millis(DEFAULT_SERIES_MIN_INTERVAL_MS),
                news_cache_ttl_secs: DEFAULT_NEWS_CACHE_TTL_SECS,
                news_feeds: crate::news::DEFAULT_FEEDS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                news_max_items_per_feed: DEFAULT_NEWS_MAX_ITEMS_PER_FEED,
                news_since_hours: DEFAULT_NEWS_SINCE_HOURS,
                upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let defaults = Self::default();

            let price_vendor = match non_empty_var("PRICE_VENDOR") {
                Some(raw) => raw.parse::<PriceVendorKind>()?,
                None => defaults.price_vendor,
            };

            let news_feeds = non_empty_var("RSS_FEEDS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .filter(|feeds| !feeds.is_empty())
                .unwrap_or(defaults.news_feeds);

            Ok(Self {
                port: parsed_var("PORT").unwrap_or(defaults.port),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                completion_api_key: non_empty_var("COMPLETION_API_KEY"),
                completion_base_url: non_empty_var("COMPLETION_BASE_URL")
                    .unwrap_or(defaults.completion_base_url),
                completion_model: non_empty_var("COMPLETION_MODEL"),
                completion_timeout: parsed_var("COMPLETION_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.completion_timeout),
                fallback_enabled: non_empty_var("FALLBACK_ENABLED")
                    .and_then(|s| parse_bool(&s))
                    .unwrap_or(defaults.fallback_enabled),
                price_vendor,
                finnhub_api_key: non_empty_var("FINNHUB_API_KEY"),
                alphavantage_api_key: non_empty_var("ALPHAVANTAGE_API_KEY"),
                series_cache_ttl_secs: parsed_var("SERIES_CACHE_TTL_SECS")
                    .unwrap_or(defaults.series_cache_ttl_secs),
                series_min_interval: parsed_var("SERIES_MIN_INTERVAL_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.series_min_interval),
                news_cache_ttl_secs: parsed_var("NEWS_CACHE_TTL_SECS")
                    .unwrap_or(defaults.news_cache_ttl_secs),
                news_feeds,
                news_max_items_per_feed: parsed_var("NEWS_MAX_ITEMS_PER_FEED")
                    .unwrap_or(defaults.news_max_items_per_feed),
                news_since_hours: parsed_var("NEWS_SINCE_HOURS")
                    .unwrap_or(defaults.news_since_hours),
                upstream_timeout: parsed_var("UPSTREAM_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.upstream_timeout),
            })
        }

        pub fn require_completion_api_key(&self) -> Result<&str, Error> {
            self.completion_api_key
                .as_deref()
                .ok_or_else(|| Error::Configuration("COMPLETION_API_KEY is required".into()))
        }

        pub fn news_max_age(&self) -> Option<Duration> {
            (self.news_since_hours > 0).then(|| Duration::from_secs(self.news_since_hours * 3_600))
        }
    }

    fn non_empty_var(name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
        non_empty_var(name).and_then(|s| s.parse::<T>().ok())
    }

    pub fn parse_bool(raw: &str) -> Option<bool> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        }
    }

}
