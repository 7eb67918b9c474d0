// =============================================================================
// Scan Orchestrator: one sequential pass over the ticker universe
// =============================================================================
//
//   Idle -> FetchingVix -> Failed                 (VIX unavailable)
//                       -> Gated                  (VIX outside buy zone)
//                       -> Scanning -> Completed  (every ticker visited once)
//
// Per ticker: quote + history -> snapshot -> entry gate -> score -> floor ->
// candidate. Anything that goes wrong for a ticker becomes a recorded skip;
// only the VIX reading can end a scan early. Tickers are visited strictly in
// order with a fixed pause between them, never concurrently.
//
// The gateway, the store and the config are injected; the scanner holds no
// other shared state than its own lifecycle and the last run record.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::ScanError;
use crate::indicators::{average_volume, compute_adx, compute_rsi, correction_pct, volume_ratio};
use crate::market_data::{MarketDataGateway, Throttle};
use crate::position_plan::plan_position;
use crate::screener_config::ScreenerConfig;
use crate::signals::{check_entry, check_score, classify, score, GateRejection};
use crate::store::SignalStore;
use crate::types::{
    PickStatus, PriceSeries, Quote, ScanRun, ScanRunStatus, SignalCandidate, StockSnapshot,
};
use crate::universe::{resolve_universe, UniverseSource};

// =============================================================================
// Lifecycle & outcomes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    FetchingVix,
    Failed,
    Gated { vix: f64 },
    Scanning { visited: usize, total: usize },
    Completed { signals: usize },
}

impl ScanState {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::FetchingVix | Self::Scanning { .. })
    }
}

/// Why a ticker produced no candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    QuoteUnavailable,
    HistoryUnavailable,
    /// The request failed outright; counted as a failure, not a plain skip.
    Upstream { message: String },
    Rejected { rejection: GateRejection },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuoteUnavailable => write!(f, "no quote"),
            Self::HistoryUnavailable => write!(f, "no history"),
            Self::Upstream { message } => write!(f, "{message}"),
            Self::Rejected { rejection } => write!(f, "{rejection}"),
        }
    }
}

/// Result of evaluating a single ticker.
#[derive(Debug, Clone, PartialEq)]
pub enum TickerOutcome {
    Picked(SignalCandidate),
    Skipped { ticker: String, reason: SkipReason },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: SkipReason,
}

/// Everything a completed scan produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub pick_date: NaiveDate,
    pub vix: f64,
    pub tickers_scanned: usize,
    /// Candidates in ticker-iteration order.
    pub candidates: Vec<SignalCandidate>,
    pub skipped: Vec<SkippedTicker>,
    pub persisted: usize,
    pub persistence_error: Option<String>,
}

impl ScanReport {
    pub fn signal_count(&self) -> usize {
        self.candidates.len()
    }

    /// Skips caused by failed upstream requests.
    pub fn failed(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| matches!(s.reason, SkipReason::Upstream { .. }))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatedScan {
    pub vix: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Completed(ScanReport),
    Gated(GatedScan),
}

// =============================================================================
// Pure pipeline steps
// =============================================================================

/// Derive the indicator snapshot for one ticker.
///
/// Short history is not an error: RSI falls back to 50 and ADX to 0, which
/// the entry gate then rejects.
pub fn build_snapshot(
    ticker: &str,
    quote: &Quote,
    history: &PriceSeries,
    config: &ScreenerConfig,
) -> StockSnapshot {
    let period = config.indicator_period;
    if history.len() < period + 1 {
        debug!(
            "{}",
            ScanError::InsufficientHistory {
                ticker: ticker.to_string(),
                bars: history.len(),
                required: period + 1,
            }
        );
    }

    StockSnapshot {
        ticker: ticker.to_string(),
        price: quote.price,
        high_52w: quote.high_52w,
        rsi: compute_rsi(&history.closes, period),
        adx: compute_adx(&history.highs, &history.lows, &history.closes, period),
        volume: quote.volume,
        avg_volume: average_volume(&history.volumes, config.volume_avg_days),
        pe: quote.pe,
        roe: quote.roe,
        debt_equity: quote.debt_equity,
        name: quote.name.clone(),
    }
}

/// Gate, score and classify a snapshot into a candidate.
pub fn evaluate_snapshot(
    stock: &StockSnapshot,
    vix: f64,
    pick_date: NaiveDate,
    config: &ScreenerConfig,
) -> Result<SignalCandidate, GateRejection> {
    let correction = correction_pct(stock.price, stock.high_52w);
    if let Some(rejection) = check_entry(stock, correction, config) {
        return Err(rejection);
    }

    let card = score(stock, vix, config);
    if let Some(rejection) = check_score(card.score, config) {
        return Err(rejection);
    }

    let ratio = volume_ratio(stock.volume, stock.avg_volume);

    Ok(SignalCandidate {
        ticker: stock.ticker.clone(),
        company_name: stock.name.clone(),
        pick_date,
        entry_price: stock.price,
        current_price: stock.price,
        rsi: stock.rsi,
        adx: stock.adx,
        correction_pct: correction,
        volume_ratio: ratio,
        volume_spike: ratio > config.volume_spike_ratio,
        pe_ratio: stock.pe,
        roe: stock.roe,
        debt_equity: stock.debt_equity,
        status: PickStatus::Active,
        signal_strength: classify(card.score, config),
        signal_score: card.score,
        signal_factors: card.factors,
        notes: format!("VIX: {vix:.1}"),
        position: plan_position(stock.price, &config.position_sizing),
    })
}

// =============================================================================
// Scanner
// =============================================================================

pub struct Scanner {
    gateway: Arc<dyn MarketDataGateway>,
    store: Arc<dyn SignalStore>,
    config: Arc<ScreenerConfig>,
    /// Dynamic listing; `None` scans the configured tickers.
    universe: Option<Arc<dyn UniverseSource>>,
    state: RwLock<ScanState>,
    last_run: RwLock<Option<ScanRun>>,
}

impl Scanner {
    pub fn new(
        gateway: Arc<dyn MarketDataGateway>,
        store: Arc<dyn SignalStore>,
        config: Arc<ScreenerConfig>,
    ) -> Self {
        Self {
            gateway,
            store,
            config,
            universe: None,
            state: RwLock::new(ScanState::Idle),
            last_run: RwLock::new(None),
        }
    }

    /// Pull the universe from `source` at each scan, falling back to the
    /// configured tickers when the listing is unusable.
    pub fn with_universe(mut self, source: Arc<dyn UniverseSource>) -> Self {
        self.universe = Some(source);
        self
    }

    /// Name of the universe source, `"configured"` without one.
    pub fn universe_name(&self) -> &'static str {
        self.universe.as_ref().map_or("configured", |u| u.name())
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    pub fn state(&self) -> ScanState {
        *self.state.read()
    }

    pub fn last_run(&self) -> Option<ScanRun> {
        self.last_run.read().clone()
    }

    fn set_state(&self, next: ScanState) {
        let mut state = self.state.write();
        debug!(from = ?*state, to = ?next, "scan state transition");
        *state = next;
    }

    /// Run a scan for today's UTC date.
    pub async fn run(&self) -> Result<ScanOutcome, ScanError> {
        self.run_on(Utc::now().date_naive()).await
    }

    /// Run a scan whose picks are dated `pick_date`.
    pub async fn run_on(&self, pick_date: NaiveDate) -> Result<ScanOutcome, ScanError> {
        {
            let mut state = self.state.write();
            if state.is_busy() {
                warn!(state = ?*state, "scan rejected, another scan is in flight");
                return Err(ScanError::AlreadyRunning);
            }
            *state = ScanState::FetchingVix;
        }

        let started_at = Utc::now();
        let clock = Instant::now();

        // ── VIX ──────────────────────────────────────────────────────────
        let vix = match self.gateway.get_vix().await {
            Ok(Some(v)) if v.is_finite() => v,
            Ok(_) => {
                let err = ScanError::upstream("VIX", "no reading returned");
                return Err(self.fail(err, started_at, clock).await);
            }
            Err(e) => {
                let err = ScanError::upstream("VIX", format!("{e:#}"));
                return Err(self.fail(err, started_at, clock).await);
            }
        };
        info!(vix, source = self.gateway.name(), "VIX reading");

        if !self.config.vix_in_buy_zone(vix) {
            let gated = GatedScan {
                vix,
                message: format!(
                    "VIX {:.1} outside buy zone ({}-{})",
                    vix, self.config.vix_min, self.config.vix_max
                ),
            };
            info!(vix, message = %gated.message, "scan gated, ticker universe not visited");
            self.set_state(ScanState::Gated { vix });
            self.finish_run(ScanRun {
                id: uuid::Uuid::new_v4(),
                started_at,
                duration_secs: clock.elapsed().as_secs_f64(),
                vix: Some(vix),
                tickers_scanned: 0,
                signals_found: 0,
                signals_persisted: 0,
                skipped: 0,
                failed: 0,
                status: ScanRunStatus::Gated,
                error_message: None,
            })
            .await;
            return Ok(ScanOutcome::Gated(gated));
        }

        // ── Ticker loop ──────────────────────────────────────────────────
        let tickers = resolve_universe(self.universe.as_deref(), &self.config.tickers).await;
        let total = tickers.len();
        self.set_state(ScanState::Scanning { visited: 0, total });
        info!(total, pick_date = %pick_date, "scanning ticker universe");

        let throttle = Throttle::from_millis(self.config.request_delay_ms);
        let mut candidates = Vec::new();
        let mut skipped = Vec::new();

        for (i, ticker) in tickers.iter().enumerate() {
            throttle.pause().await;

            match self.evaluate_ticker(ticker, vix, pick_date).await {
                TickerOutcome::Picked(candidate) => {
                    info!(
                        ticker = %candidate.ticker,
                        score = candidate.signal_score,
                        strength = %candidate.signal_strength,
                        "signal found"
                    );
                    candidates.push(candidate);
                }
                TickerOutcome::Skipped { ticker, reason } => {
                    debug!(ticker = %ticker, reason = %reason, "ticker skipped");
                    skipped.push(SkippedTicker { ticker, reason });
                }
            }

            self.set_state(ScanState::Scanning {
                visited: i + 1,
                total,
            });
            if (i + 1) % 50 == 0 {
                info!(visited = i + 1, total, signals = candidates.len(), "scan progress");
            }
        }

        // ── Persist ──────────────────────────────────────────────────────
        let (persisted, persistence_error) = self.persist(&candidates).await;

        let report = ScanReport {
            pick_date,
            vix,
            tickers_scanned: total,
            candidates,
            skipped,
            persisted,
            persistence_error,
        };

        info!(
            signals = report.signal_count(),
            skipped = report.skipped.len(),
            failed = report.failed(),
            persisted = report.persisted,
            requests = throttle.snapshot().calls,
            elapsed_secs = clock.elapsed().as_secs_f64(),
            "scan complete"
        );

        self.set_state(ScanState::Completed {
            signals: report.signal_count(),
        });
        self.finish_run(ScanRun {
            id: uuid::Uuid::new_v4(),
            started_at,
            duration_secs: clock.elapsed().as_secs_f64(),
            vix: Some(vix),
            tickers_scanned: report.tickers_scanned,
            signals_found: report.signal_count(),
            signals_persisted: report.persisted,
            skipped: report.skipped.len() - report.failed(),
            failed: report.failed(),
            status: ScanRunStatus::Success,
            error_message: report.persistence_error.clone(),
        })
        .await;

        Ok(ScanOutcome::Completed(report))
    }

    /// Fetch and evaluate one ticker. Never fails; problems become skips.
    pub async fn evaluate_ticker(
        &self,
        ticker: &str,
        vix: f64,
        pick_date: NaiveDate,
    ) -> TickerOutcome {
        let skip = |reason| TickerOutcome::Skipped {
            ticker: ticker.to_string(),
            reason,
        };

        let quote = match self.gateway.get_quote(ticker).await {
            Ok(Some(q)) => q,
            Ok(None) => return skip(SkipReason::QuoteUnavailable),
            Err(e) => {
                let err = ScanError::upstream(format!("{ticker} quote"), format!("{e:#}"));
                warn!(ticker, error = %err, "quote fetch failed");
                return skip(SkipReason::Upstream {
                    message: err.to_string(),
                });
            }
        };

        let history = match self.gateway.get_history(ticker).await {
            Ok(Some(h)) => h,
            Ok(None) => return skip(SkipReason::HistoryUnavailable),
            Err(e) => {
                let err = ScanError::upstream(format!("{ticker} history"), format!("{e:#}"));
                warn!(ticker, error = %err, "history fetch failed");
                return skip(SkipReason::Upstream {
                    message: err.to_string(),
                });
            }
        };

        let snapshot = build_snapshot(ticker, &quote, &history, &self.config);
        match evaluate_snapshot(&snapshot, vix, pick_date, &self.config) {
            Ok(candidate) => TickerOutcome::Picked(candidate),
            Err(rejection) => skip(SkipReason::Rejected { rejection }),
        }
    }

    async fn persist(&self, candidates: &[SignalCandidate]) -> (usize, Option<String>) {
        if candidates.is_empty() {
            return (0, None);
        }
        match self.store.upsert(candidates).await {
            Ok(written) => (written, None),
            Err(e) => {
                error!(store = self.store.name(), error = %e, "failed to persist signals");
                let written = match &e {
                    ScanError::Persistence { written, .. } => *written,
                    _ => 0,
                };
                (written, Some(e.to_string()))
            }
        }
    }

    async fn fail(
        &self,
        err: ScanError,
        started_at: chrono::DateTime<Utc>,
        clock: Instant,
    ) -> ScanError {
        error!(error = %err, "scan aborted");
        self.set_state(ScanState::Failed);
        self.finish_run(ScanRun {
            id: uuid::Uuid::new_v4(),
            started_at,
            duration_secs: clock.elapsed().as_secs_f64(),
            vix: None,
            tickers_scanned: 0,
            signals_found: 0,
            signals_persisted: 0,
            skipped: 0,
            failed: 0,
            status: ScanRunStatus::Error,
            error_message: Some(err.to_string()),
        })
        .await;
        err
    }

    async fn finish_run(&self, run: ScanRun) {
        if let Err(e) = self.store.record_run(&run).await {
            warn!(store = self.store.name(), error = %e, "failed to record scan run");
        }
        *self.last_run.write() = Some(run);
    }
}
