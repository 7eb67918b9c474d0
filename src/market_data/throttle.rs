// =============================================================================
// Throttle: fixed pause between upstream requests
// =============================================================================
//
// The data source is shared and unauthenticated, so the scan pauses for a
// fixed delay between consecutive tickers. The first call never waits; every
// later call waits for the configured delay. Tickers are never fetched
// concurrently, so this alone bounds the request rate.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

pub struct Throttle {
    delay: Duration,
    calls: AtomicU64,
}

/// Serialisable view of the throttle counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleSnapshot {
    pub delay_ms: u64,
    pub calls: u64,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicU64::new(0),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Wait before the next request. Returns `true` if a pause was taken.
    pub async fn pause(&self) -> bool {
        let previous = self.calls.fetch_add(1, Ordering::Relaxed);
        if previous == 0 || self.delay.is_zero() {
            return false;
        }
        trace!(delay_ms = self.delay.as_millis() as u64, "throttling before next request");
        tokio::time::sleep(self.delay).await;
        true
    }

    pub fn snapshot(&self) -> ThrottleSnapshot {
        ThrottleSnapshot {
            delay_ms: self.delay.as_millis() as u64,
            calls: self.calls.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("delay", &self.delay)
            .field("calls", &self.calls.load(Ordering::Relaxed))
            .finish()
    }
}
