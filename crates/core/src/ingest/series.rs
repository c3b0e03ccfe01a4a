use crate::domain::series::PriceSeries;
use crate::domain::ticker::{clamp_days, normalize_ticker};
use crate::error::Result;
use crate::ingest::provider::PriceVendor;
use crate::storage::cache::TtlCache;
use crate::storage::rate_limit::RateLimiter;
use std::sync::Arc;

/// Serves price series: cache first, then the per-ticker gate, then the vendor.
///
/// Cache hits are never rate limited.
pub struct SeriesService {
    vendor: Arc<dyn PriceVendor>,
    cache: TtlCache<PriceSeries>,
    limiter: RateLimiter,
    ttl_secs: u64,
}

impl SeriesService {
    pub fn new(
        vendor: Arc<dyn PriceVendor>,
        cache: TtlCache<PriceSeries>,
        limiter: RateLimiter,
        ttl_secs: u64,
    ) -> Self {
        Self {
            vendor,
            cache,
            limiter,
            ttl_secs,
        }
    }

    pub fn vendor_name(&self) -> &'static str {
        self.vendor.vendor_name()
    }

    pub fn cache_key(vendor: &str, ticker: &str, days: u32) -> String {
        format!("series:{vendor}:{ticker}:{days}")
    }

    /// Validate, clamp, and serve a series for `raw_ticker`.
    pub async fn get_series(&self, raw_ticker: &str, days: Option<u32>) -> Result<PriceSeries> {
        let ticker = normalize_ticker(raw_ticker)?;
        let days = clamp_days(days);
        let key = Self::cache_key(self.vendor.vendor_name(), &ticker, days);

        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(%ticker, days, "series cache hit");
            return Ok(hit);
        }

        self.limiter.try_acquire(&ticker)?;

        let series = self.vendor.fetch_series(&ticker, days).await?;
        tracing::info!(
            %ticker,
            days,
            vendor = self.vendor.vendor_name(),
            points = series.points.len(),
            "series fetched"
        );
        self.cache.set(&key, series.clone(), self.ttl_secs);
        Ok(series)
    }
}
