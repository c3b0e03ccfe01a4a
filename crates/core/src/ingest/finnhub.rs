use crate::config::Settings;
use crate::domain::series::PriceSeries;
use crate::error::{Error, Result};
use crate::ingest::provider::{build_http, decode, fetch_text, PriceVendor};
use serde::Deserialize;

const VENDOR: &str = "finnhub";
const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Keyed candle endpoint addressed by an explicit `from`/`to` window.
#[derive(Debug, Clone)]
pub struct FinnhubVendor {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl FinnhubVendor {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_http(settings)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: settings.finnhub_api_key.clone(),
        })
    }
}

/// Calendar window, in seconds, wide enough to contain `days` trading sessions
/// ending at `now_secs`.
pub fn window_for_days(now_secs: i64, days: u32) -> (i64, i64) {
    let calendar_days = i64::from(days) * 7 / 5 + 10;
    (now_secs - calendar_days * 86_400, now_secs)
}

#[async_trait::async_trait]
impl PriceVendor for FinnhubVendor {
    fn vendor_name(&self) -> &'static str {
        VENDOR
    }

    async fn fetch_series(&self, ticker: &str, days: u32) -> Result<PriceSeries> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration("FINNHUB_API_KEY is required".into()))?;

        let (from, to) = window_for_days(chrono::Utc::now().timestamp(), days);
        let url = format!("{}/stock/candle", self.base_url.trim_end_matches('/'));
        let req = self
            .http
            .get(url)
            .header("X-Finnhub-Token", api_key)
            .query(&[
                ("symbol", ticker.to_string()),
                ("resolution", "D".to_string()),
                ("from", from.to_string()),
                ("to", to.to_string()),
            ]);

        let text = fetch_text(VENDOR, req).await?;
        let parsed = decode::<CandleResponse>(VENDOR, &text)?;
        into_series(ticker, parsed, days)
    }
}

fn into_series(ticker: &str, res: CandleResponse, days: u32) -> Result<PriceSeries> {
    match res.s.as_str() {
        "ok" => {}
        "no_data" => return Ok(PriceSeries::from_raw(ticker, Vec::new(), days as usize)),
        other => {
            return Err(Error::malformed(
                VENDOR,
                format!("unexpected candle status {other:?}"),
            ))
        }
    }

    if res.t.len() != res.c.len() {
        return Err(Error::malformed(
            VENDOR,
            format!(
                "mismatched candle arrays (t={}, c={})",
                res.t.len(),
                res.c.len()
            ),
        ));
    }

    let rows = res
        .t
        .into_iter()
        .zip(res.c)
        .map(|(ts, close)| (ts.checked_mul(1000), close));
    Ok(PriceSeries::from_raw(ticker, rows, days as usize))
}

#[derive(Debug, Deserialize)]
struct CandleResponse {
    s: String,
    #[serde(default)]
    c: Vec<Option<f64>>,
    #[serde(default)]
    t: Vec<i64>,
}
