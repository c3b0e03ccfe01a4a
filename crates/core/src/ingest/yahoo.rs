use crate::config::Settings;
use crate::domain::series::PriceSeries;
use crate::error::{Error, Result};
use crate::ingest::provider::{build_http, decode, fetch_text, PriceVendor};
use serde::Deserialize;

const VENDOR: &str = "yahoo";
const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; pulse/0.1)";

/// Keyless chart endpoint. Only accepts named range buckets, so the request
/// asks for the smallest bucket holding `days` trading sessions.
#[derive(Debug, Clone)]
pub struct YahooVendor {
    http: reqwest::Client,
    base_url: String,
}

impl YahooVendor {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_http(settings)?,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }
}

/// Smallest chart range that covers `days` trading sessions.
pub fn range_for_days(days: u32) -> &'static str {
    match days {
        0..=21 => "1mo",
        22..=63 => "3mo",
        64..=126 => "6mo",
        127..=252 => "1y",
        _ => "2y",
    }
}

#[async_trait::async_trait]
impl PriceVendor for YahooVendor {
    fn vendor_name(&self) -> &'static str {
        VENDOR
    }

    async fn fetch_series(&self, ticker: &str, days: u32) -> Result<PriceSeries> {
        let url = format!(
            "{}/v8/finance/chart/{ticker}",
            self.base_url.trim_end_matches('/')
        );
        let req = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&[("range", range_for_days(days)), ("interval", "1d")]);

        let text = fetch_text(VENDOR, req).await?;
        let parsed = decode::<ChartResponse>(VENDOR, &text)?;
        into_series(ticker, parsed, days)
    }
}

fn into_series(ticker: &str, res: ChartResponse, days: u32) -> Result<PriceSeries> {
    if let Some(err) = res.chart.error {
        return Err(Error::malformed(
            VENDOR,
            format!("chart error: {}", err.description.unwrap_or(err.code)),
        ));
    }

    let Some(result) = res.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(PriceSeries::from_raw(ticker, Vec::new(), days as usize));
    };

    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let rows = result
        .timestamp
        .into_iter()
        .zip(closes)
        .map(|(ts, close)| (ts.and_then(|s| s.checked_mul(1000)), close));

    Ok(PriceSeries::from_raw(ticker, rows, days as usize))
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<Option<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}
