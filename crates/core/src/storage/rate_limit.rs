use crate::error::{Error, Result};
use crate::time::{Clock, SystemClock};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Per-key minimum inter-arrival gate.
///
/// A hit arriving sooner than `min_interval` after the last accepted hit for
/// the same key is rejected outright. No queuing, no burst allowance.
pub struct RateLimiter {
    last_hit: DashMap<String, i64>,
    min_interval: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, Arc::new(SystemClock))
    }

    pub fn with_clock(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            last_hit: DashMap::new(),
            min_interval,
            clock,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Accept and record a hit for `key`, or reject with [`Error::RateLimited`].
    pub fn try_acquire(&self, key: &str) -> Result<()> {
        let key = normalize_key(key);
        let now = self.clock.now_millis();
        let interval_ms = u64::try_from(self.min_interval.as_millis()).unwrap_or(u64::MAX);
        let interval = i64::try_from(interval_ms).unwrap_or(i64::MAX);

        // The entry guard makes check-and-record atomic per key.
        match self.last_hit.entry(key) {
            Entry::Occupied(mut occupied) => {
                if now.saturating_sub(*occupied.get()) < interval {
                    let key = occupied.key().clone();
                    tracing::debug!(%key, interval_ms, "rate limit rejected hit");
                    return Err(Error::RateLimited { key, interval_ms });
                }
                occupied.insert(now);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(now);
            }
        }
        Ok(())
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_uppercase()
}
