use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    #[serde(rename = "timestampEpochMillis")]
    pub timestamp_millis: i64,
    pub close: f64,
}

/// Close-price series, ascending by timestamp, every close finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub ticker: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from raw vendor rows.
    ///
    /// Rows with a missing timestamp or a missing/non-finite close are dropped,
    /// the rest are sorted ascending and only the trailing `days` are kept.
    pub fn from_raw<I>(ticker: &str, raw: I, days: usize) -> Self
    where
        I: IntoIterator<Item = (Option<i64>, Option<f64>)>,
    {
        let mut points: Vec<PricePoint> = raw
            .into_iter()
            .filter_map(|(ts, close)| match (ts, close) {
                (Some(timestamp_millis), Some(close)) if close.is_finite() => Some(PricePoint {
                    timestamp_millis,
                    close,
                }),
                _ => None,
            })
            .collect();

        points.sort_by_key(|p| p.timestamp_millis);
        if points.len() > days {
            points.drain(..points.len() - days);
        }

        Self {
            ticker: ticker.to_string(),
            points,
        }
    }
}
