// =============================================================================
// Application State
// =============================================================================
//
// Ties the scanner to the HTTP surface. The scanner owns its own lifecycle
// and last run record; AppState adds the bits the API reports on top of it:
// uptime, a trigger counter and a bounded log of failed scans.
//
// Thread safety:
//   - Atomic counter for triggers.
//   - parking_lot::RwLock for the error log.
//   - Arc wrappers for the scanner and its injected capabilities.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::market_data::MarketDataGateway;
use crate::scanner::{ScanState, Scanner};
use crate::screener_config::ScreenerConfig;
use crate::store::SignalStore;
use crate::types::ScanRun;
use crate::universe::UniverseSource;

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// A failed scan, as shown by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub server_time: i64,
    pub uptime_secs: i64,
    pub scan_state: ScanState,
    pub scans_triggered: u64,
    pub universe_size: usize,
    pub universe_source: &'static str,
    pub gateway: &'static str,
    pub store: &'static str,
    pub recent_errors: Vec<ErrorRecord>,
}

pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub scanner: Arc<Scanner>,
    scans_triggered: AtomicU64,
    recent_errors: RwLock<Vec<ErrorRecord>>,
    gateway_name: &'static str,
    store_name: &'static str,
}

impl AppState {
    pub fn new(
        config: ScreenerConfig,
        gateway: Arc<dyn MarketDataGateway>,
        store: Arc<dyn SignalStore>,
        universe: Option<Arc<dyn UniverseSource>>,
    ) -> Self {
        let gateway_name = gateway.name();
        let store_name = store.name();
        let mut scanner = Scanner::new(gateway, store, Arc::new(config));
        if let Some(source) = universe {
            scanner = scanner.with_universe(source);
        }
        Self {
            started_at: Utc::now(),
            scanner: Arc::new(scanner),
            scans_triggered: AtomicU64::new(0),
            recent_errors: RwLock::new(Vec::new()),
            gateway_name,
            store_name,
        }
    }

    /// Count a scan trigger; returns the new total.
    pub fn record_trigger(&self) -> u64 {
        self.scans_triggered.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn push_error(&self, message: String) {
        let mut errors = self.recent_errors.write();
        errors.push(ErrorRecord {
            message,
            at: Utc::now().to_rfc3339(),
        });
        if errors.len() > MAX_RECENT_ERRORS {
            let excess = errors.len() - MAX_RECENT_ERRORS;
            errors.drain(..excess);
        }
    }

    pub fn last_run(&self) -> Option<ScanRun> {
        self.scanner.last_run()
    }

    pub fn health(&self) -> HealthSnapshot {
        let now = Utc::now();
        HealthSnapshot {
            status: "ok",
            server_time: now.timestamp_millis(),
            uptime_secs: (now - self.started_at).num_seconds(),
            scan_state: self.scanner.state(),
            scans_triggered: self.scans_triggered.load(Ordering::Relaxed),
            universe_size: self.scanner.config().tickers.len(),
            universe_source: self.scanner.universe_name(),
            gateway: self.gateway_name,
            store: self.store_name,
            recent_errors: self.recent_errors.read().clone(),
        }
    }
}
