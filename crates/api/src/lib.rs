use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use pulse_core::context::AppContext;
use pulse_core::domain::analysis::AnalysisResult;
use pulse_core::domain::news::NewsEnvelope;
use pulse_core::domain::series::PriceSeries;
use pulse_core::error::Error;
use pulse_core::llm::service::ScreenRequest;

/// Shared handler state. `ctx` is `None` when bootstrap failed and the API
/// runs degraded: everything but `/health` answers 503.
#[derive(Clone)]
pub struct AppState {
    pub ctx: Option<AppContext>,
}

impl AppState {
    fn ctx(&self) -> Result<&AppContext, ApiError> {
        self.ctx.as_ref().ok_or_else(|| {
            ApiError(Error::Configuration(
                "service started in degraded mode".to_string(),
            ))
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/screen", post(screen))
        .route("/api/analyze", post(analyze))
        .route("/api/series", get(series))
        .route("/api/news", get(news))
        .route("/api/models", get(models))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Boundary error: a core error rendered as `{error, detail}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        Error::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        Error::Upstream { .. }
        | Error::MalformedResponse { .. }
        | Error::NoModelAvailable
        | Error::Unauthorized
        | Error::ModelUnavailable { .. }
        | Error::Network { .. }
        | Error::AllSourcesFailed { .. } => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(reason = self.0.reason(), error = %self.0, "request failed");
            sentry_anyhow::capture_anyhow(&anyhow::Error::new(self.0.clone()));
        } else {
            tracing::debug!(reason = self.0.reason(), error = %self.0, "request rejected");
        }

        let body = ErrorBody {
            error: self.0.reason(),
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct Health {
    ok: bool,
    vendor: Option<&'static str>,
    model: Option<String>,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let (vendor, model) = match &state.ctx {
        Some(ctx) => (Some(ctx.series.vendor_name()), ctx.current_model().await),
        None => (None, None),
    };
    Json(Health {
        ok: true,
        vendor,
        model,
    })
}

/// Empty bodies decode as `T::default()`; anything else must be valid JSON.
fn decode_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError(Error::InvalidInput(format!("request body is not valid JSON: {e}"))))
}

async fn screen(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnalysisResult>, ApiError> {
    let ctx = state.ctx()?;
    let req: ScreenRequest = decode_body(&body)?;
    Ok(Json(ctx.analysis.screen(&req).await?))
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    ticker: Option<String>,
}

async fn analyze(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnalysisResult>, ApiError> {
    let ctx = state.ctx()?;
    let req: AnalyzeRequest = decode_body(&body)?;
    let ticker = req.ticker.unwrap_or_default();
    Ok(Json(ctx.analysis.analyze(&ticker).await?))
}

#[derive(Debug, Deserialize)]
struct SeriesParams {
    ticker: Option<String>,
    days: Option<String>,
}

async fn series(
    State(state): State<AppState>,
    Query(params): Query<SeriesParams>,
) -> Result<Json<PriceSeries>, ApiError> {
    let ctx = state.ctx()?;
    let days = lenient_number(params.days.as_deref(), "days")?
        .map(|d| d.clamp(0, i64::from(u32::MAX)) as u32);
    let ticker = params.ticker.unwrap_or_default();
    Ok(Json(ctx.series.get_series(&ticker, days).await?))
}

#[derive(Debug, Deserialize)]
struct NewsParams {
    limit: Option<String>,
    q: Option<String>,
}

async fn news(
    State(state): State<AppState>,
    Query(params): Query<NewsParams>,
) -> Result<Json<NewsEnvelope>, ApiError> {
    let ctx = state.ctx()?;
    let limit = lenient_number(params.limit.as_deref(), "limit")?.map(|l| l.max(0) as usize);
    Ok(Json(ctx.news.fetch_news(params.q.as_deref(), limit).await?))
}

/// Blank means absent; out-of-range values are clamped downstream.
fn lenient_number(raw: Option<&str>, name: &str) -> Result<Option<i64>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ApiError(Error::InvalidInput(format!("{name} must be an integer")))),
    }
}

#[derive(Debug, Serialize)]
struct ModelsInfo {
    current: Option<String>,
    preferred: Vec<String>,
}

async fn models(State(state): State<AppState>) -> Result<Json<ModelsInfo>, ApiError> {
    let ctx = state.ctx()?;
    let resolver = ctx.analysis.client().resolver();
    Ok(Json(ModelsInfo {
        current: resolver.state().current().await,
        preferred: resolver.preferred().to_vec(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            status_for(&Error::InvalidInput("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&Error::RateLimited {
                key: "NVDA".into(),
                interval_ms: 2000
            }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_for(&Error::Configuration("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&Error::Timeout {
                upstream: "yahoo".into()
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&Error::AllSourcesFailed { failed: 3 }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn blank_numbers_are_absent() {
        assert_eq!(lenient_number(Some("  "), "days").unwrap(), None);
        assert_eq!(lenient_number(Some("-4"), "days").unwrap(), Some(-4));
        assert!(lenient_number(Some("many"), "days").is_err());
    }
}
