//! Boundary validation for caller-supplied parameters.

use crate::error::{Error, Result};

pub const MIN_SERIES_DAYS: u32 = 30;
pub const MAX_SERIES_DAYS: u32 = 365;
pub const DEFAULT_SERIES_DAYS: u32 = 180;

pub const MIN_NEWS_LIMIT: usize = 6;
pub const MAX_NEWS_LIMIT: usize = 50;
pub const DEFAULT_NEWS_LIMIT: usize = 24;

/// Uppercase `raw` and check it against `^[A-Z][A-Z0-9.-]{0,9}$`.
/// Surrounding whitespace is not stripped and fails the check.
pub fn normalize_ticker(raw: &str) -> Result<String> {
    let ticker = raw.to_ascii_uppercase();
    let mut chars = ticker.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {
            ticker.len() <= 10
                && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-')
        }
        _ => false,
    };

    if valid {
        Ok(ticker)
    } else {
        Err(Error::InvalidInput(format!("invalid ticker: {raw:?}")))
    }
}

pub fn clamp_days(days: Option<u32>) -> u32 {
    days.unwrap_or(DEFAULT_SERIES_DAYS)
        .clamp(MIN_SERIES_DAYS, MAX_SERIES_DAYS)
}

pub fn clamp_news_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_NEWS_LIMIT)
        .clamp(MIN_NEWS_LIMIT, MAX_NEWS_LIMIT)
}
