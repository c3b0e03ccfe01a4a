use crate::config::Settings;
use crate::domain::series::PriceSeries;
use crate::error::{Error, Result};
use crate::ingest::{alpha_vantage::AlphaVantageVendor, finnhub::FinnhubVendor, yahoo::YahooVendor};
use std::str::FromStr;
use std::sync::Arc;

/// One upstream price-data vendor.
///
/// Implementations translate `days` into whatever window the vendor
/// understands and return at most the trailing `days` points.
#[async_trait::async_trait]
pub trait PriceVendor: Send + Sync {
    fn vendor_name(&self) -> &'static str;

    async fn fetch_series(&self, ticker: &str, days: u32) -> Result<PriceSeries>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceVendorKind {
    Yahoo,
    Finnhub,
    AlphaVantage,
}

impl FromStr for PriceVendorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yahoo" | "default" => Ok(Self::Yahoo),
            "finnhub" => Ok(Self::Finnhub),
            "alphavantage" | "alpha_vantage" | "alpha-vantage" => Ok(Self::AlphaVantage),
            other => Err(Error::Configuration(format!(
                "unknown PRICE_VENDOR {other:?} (expected yahoo, finnhub or alphavantage)"
            ))),
        }
    }
}

/// Build the single vendor this process serves series from.
///
/// Missing credentials do not fail here; the vendor reports them on first use.
pub fn from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn PriceVendor>> {
    let vendor: Arc<dyn PriceVendor> = match settings.price_vendor {
        PriceVendorKind::Yahoo => Arc::new(YahooVendor::from_settings(settings)?),
        PriceVendorKind::Finnhub => Arc::new(FinnhubVendor::from_settings(settings)?),
        PriceVendorKind::AlphaVantage => Arc::new(AlphaVantageVendor::from_settings(settings)?),
    };
    tracing::info!(vendor = vendor.vendor_name(), "price vendor selected");
    Ok(vendor)
}

pub(crate) fn build_http(settings: &Settings) -> anyhow::Result<reqwest::Client> {
    use anyhow::Context;
    reqwest::Client::builder()
        .timeout(settings.upstream_timeout)
        .build()
        .context("failed to build price vendor http client")
}

/// Send `req` and return the body, mapping transport failures and non-success
/// statuses into the error taxonomy.
pub(crate) async fn fetch_text(vendor: &str, req: reqwest::RequestBuilder) -> Result<String> {
    let res = req
        .send()
        .await
        .map_err(|e| Error::from_transport(vendor, e))?;

    let status = res.status();
    let text = res
        .text()
        .await
        .map_err(|e| Error::from_transport(vendor, e))?;

    if !status.is_success() {
        let err = Error::upstream(vendor, status.as_u16(), &text);
        tracing::warn!(vendor, http_status = %status, error = %err, "price vendor returned an error");
        return Err(err);
    }
    Ok(text)
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(vendor: &str, text: &str) -> Result<T> {
    serde_json::from_str::<T>(text)
        .map_err(|e| Error::malformed(vendor, format!("failed to decode response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vendor_names() {
        assert_eq!("yahoo".parse::<PriceVendorKind>().unwrap(), PriceVendorKind::Yahoo);
        assert_eq!(" Finnhub ".parse::<PriceVendorKind>().unwrap(), PriceVendorKind::Finnhub);
        assert_eq!(
            "alpha_vantage".parse::<PriceVendorKind>().unwrap(),
            PriceVendorKind::AlphaVantage
        );
        assert_eq!(
            "polygon".parse::<PriceVendorKind>().unwrap_err().reason(),
            "configuration_error"
        );
    }

    #[test]
    fn selects_configured_vendor() {
        let settings = Settings {
            price_vendor: PriceVendorKind::AlphaVantage,
            ..Settings::default()
        };
        let vendor = from_settings(&settings).unwrap();
        assert_eq!(vendor.vendor_name(), "alphavantage");
    }
}
