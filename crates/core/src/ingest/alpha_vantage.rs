use crate::config::Settings;
use crate::domain::series::PriceSeries;
use crate::error::{Error, Result};
use crate::ingest::provider::{build_http, decode, fetch_text, PriceVendor};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;

const VENDOR: &str = "alphavantage";
const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Points returned by `outputsize=compact`.
const COMPACT_POINTS: u32 = 100;

/// Keyed daily series with a fixed output size: `compact` (last 100 sessions)
/// or `full` (entire history).
#[derive(Debug, Clone)]
pub struct AlphaVantageVendor {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl AlphaVantageVendor {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_http(settings)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: settings.alphavantage_api_key.clone(),
        })
    }
}

pub fn output_size_for_days(days: u32) -> &'static str {
    if days <= COMPACT_POINTS {
        "compact"
    } else {
        "full"
    }
}

#[async_trait::async_trait]
impl PriceVendor for AlphaVantageVendor {
    fn vendor_name(&self) -> &'static str {
        VENDOR
    }

    async fn fetch_series(&self, ticker: &str, days: u32) -> Result<PriceSeries> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration("ALPHAVANTAGE_API_KEY is required".into()))?;

        let req = self.http.get(&self.base_url).query(&[
            ("function", "TIME_SERIES_DAILY"),
            ("symbol", ticker),
            ("outputsize", output_size_for_days(days)),
            ("apikey", api_key),
        ]);

        let text = fetch_text(VENDOR, req).await?;
        let parsed = decode::<TimeSeriesResponse>(VENDOR, &text)?;
        into_series(ticker, parsed, days)
    }
}

fn into_series(ticker: &str, res: TimeSeriesResponse, days: u32) -> Result<PriceSeries> {
    // Throttling and bad symbols arrive as HTTP 200 with a message body.
    if let Some(note) = res.note.or(res.information) {
        return Err(Error::upstream(VENDOR, 429, &note));
    }
    if let Some(message) = res.error_message {
        return Err(Error::upstream(VENDOR, 400, &message));
    }

    let Some(series) = res.time_series else {
        return Err(Error::malformed(VENDOR, "missing \"Time Series (Daily)\""));
    };

    let rows = series.into_iter().map(|(date, bar)| {
        let ts = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp_millis());
        (ts, bar.close.trim().parse::<f64>().ok())
    });
    Ok(PriceSeries::from_raw(ticker, rows, days as usize))
}

#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyBar>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "4. close")]
    close: String,
}
