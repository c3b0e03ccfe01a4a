use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use pulse_api::{build_router, AppState};
use pulse_core::config::Settings;
use pulse_core::context::AppContext;
use pulse_core::error::{Error, Result};
use pulse_core::ingest::provider::PriceVendorKind;
use pulse_core::ingest::series::SeriesService;
use pulse_core::llm::client::CompletionClient;
use pulse_core::llm::resolver::{ModelResolver, ModelState};
use pulse_core::llm::service::AnalysisService;
use pulse_core::llm::{ChatBackend, ChatMessage};
use pulse_core::news::aggregate::FeedAggregator;
use pulse_core::news::{FeedFetcher, NewsService};
use pulse_core::storage::cache::TtlCache;
use pulse_core::storage::rate_limit::RateLimiter;
use pulse_core::time::SystemClock;

struct UnreachableBackend;

#[async_trait::async_trait]
impl ChatBackend for UnreachableBackend {
    fn backend_name(&self) -> &'static str {
        "completion"
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Err(Error::Network {
            upstream: "completion".into(),
            detail: "connection refused".into(),
        })
    }

    async fn create_chat(&self, _model: &str, _messages: &[ChatMessage]) -> Result<String> {
        Err(Error::Network {
            upstream: "completion".into(),
            detail: "connection refused".into(),
        })
    }
}

struct StaticFeeds {
    body: Option<String>,
}

#[async_trait::async_trait]
impl FeedFetcher for StaticFeeds {
    async fn fetch(&self, _url: &str) -> Result<String> {
        self.body
            .clone()
            .ok_or_else(|| Error::upstream("feed", 503, "unavailable"))
    }
}

const FEED: &str = r#"<rss><channel><title>Wire</title>
<item><title>Chipmakers rally</title><link>https://www.wire.test/chips</link>
<pubDate>Tue, 14 Oct 2025 13:30:00 GMT</pubDate></item>
<item><title>Oil slips</title><link>https://www.wire.test/oil</link>
<pubDate>Mon, 13 Oct 2025 09:00:00 GMT</pubDate></item>
</channel></rss>"#;

fn context(fallback_enabled: bool, feed: Option<&str>) -> AppContext {
    let settings = Settings {
        price_vendor: PriceVendorKind::Finnhub,
        finnhub_api_key: None,
        fallback_enabled,
        ..Settings::default()
    };
    let clock = Arc::new(SystemClock);

    let backend: Arc<dyn ChatBackend> = Arc::new(UnreachableBackend);
    let resolver = ModelResolver::new(backend.clone(), ModelState::new());
    let client = CompletionClient::new(backend, resolver, Duration::from_secs(1));

    let series = SeriesService::new(
        pulse_core::ingest::provider::from_settings(&settings).unwrap(),
        TtlCache::with_clock(clock.clone()),
        RateLimiter::with_clock(Duration::from_secs(60), clock.clone()),
        900,
    );

    let aggregator = FeedAggregator::new(
        Arc::new(StaticFeeds {
            body: feed.map(str::to_string),
        }),
        vec!["https://a.test/rss".into(), "https://b.test/rss".into()],
        100,
        clock.clone(),
    );

    AppContext {
        settings: Arc::new(settings),
        analysis: Arc::new(AnalysisService::new(client, fallback_enabled)),
        series: Arc::new(series),
        news: Arc::new(NewsService::new(aggregator, TtlCache::with_clock(clock), 300)),
    }
}

fn app(ctx: Option<AppContext>) -> Router {
    build_router(AppState { ctx })
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_vendor_and_model() {
    let (status, body) = call(app(Some(context(true, Some(FEED)))), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["vendor"], "finnhub");
    assert_eq!(body["model"], Value::Null);
}

#[tokio::test]
async fn series_with_missing_vendor_credential_is_an_error() {
    let (status, body) = call(
        app(Some(context(true, Some(FEED)))),
        get("/api/series?ticker=NVDA&days=180"),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "configuration_error");
    assert!(body.get("points").is_none());
}

#[tokio::test]
async fn repeated_series_requests_are_throttled() {
    let router = app(Some(context(true, Some(FEED))));
    let (first, _) = call(router.clone(), get("/api/series?ticker=nvda")).await;
    assert_eq!(first, StatusCode::SERVICE_UNAVAILABLE);

    let (second, body) = call(router, get("/api/series?ticker=NVDA")).await;
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limited");
}

#[tokio::test]
async fn series_rejects_bad_ticker() {
    let (status, body) = call(
        app(Some(context(true, Some(FEED)))),
        get("/api/series?ticker=1AAPL"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn analyze_falls_back_when_backend_is_unreachable() {
    let (status, body) = call(
        app(Some(context(true, Some(FEED)))),
        post_json("/api/analyze", json!({ "ticker": "AAPL" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mock"], true);
    assert!(!body["summary"].as_str().unwrap_or_default().is_empty());
}

#[tokio::test]
async fn analyze_without_fallback_propagates_the_failure() {
    let (status, body) = call(
        app(Some(context(false, Some(FEED)))),
        post_json("/api/analyze", json!({ "ticker": "AAPL" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "network_error");
}

#[tokio::test]
async fn analyze_validates_before_any_upstream_call() {
    let (status, body) = call(
        app(Some(context(true, Some(FEED)))),
        post_json("/api/analyze", json!({ "ticker": "TOO-LONG-TICKER-X" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn screen_accepts_an_empty_body() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/screen")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(app(Some(context(true, Some(FEED)))), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mock"], true);
}

#[tokio::test]
async fn news_merges_duplicate_sources() {
    let (status, body) = call(
        app(Some(context(true, Some(FEED)))),
        get("/api/news?limit=10"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["link"], "https://www.wire.test/chips");
    assert_eq!(items[0]["domain"], "wire.test");
    assert_eq!(items[0]["source"], "Wire");
    assert!(items[0]["publishedAtEpochMillis"].is_i64());
}

#[tokio::test]
async fn news_filters_by_query() {
    let (status, body) = call(
        app(Some(context(true, Some(FEED)))),
        get("/api/news?q=OIL"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn news_with_every_source_down_is_bad_gateway() {
    let (status, body) = call(app(Some(context(true, None))), get("/api/news")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "news_unavailable");
}

#[tokio::test]
async fn models_reports_preferences_without_upstream_call() {
    let (status, body) = call(app(Some(context(true, Some(FEED)))), get("/api/models")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current"], Value::Null);
    assert!(!body["preferred"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn degraded_mode_still_answers_health() {
    let (status, body) = call(app(None), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (status, body) = call(app(None), get("/api/news")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "configuration_error");
}
