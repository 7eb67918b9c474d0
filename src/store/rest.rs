// =============================================================================
// REST Signal Store: PostgREST-compatible upsert
// =============================================================================
//
// Picks are POSTed in batches to `{base}/rest/v1/{table}?on_conflict=ticker,pick_date`
// with `Prefer: resolution=merge-duplicates`, which turns the insert into an
// upsert that overwrites the existing row for the same key. Run records go
// to a separate table with a plain insert.
//
// Rows are written through `PickRow` / `RunRow`, which carry exactly the
// columns of the existing `screener_picks` / `screener_runs` tables. The
// position plan, ROE, debt/equity and the run id stay in-process; PostgREST
// rejects unknown columns.
//
// SECURITY: the service key is sent as a header and never logged.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use tracing::{debug, error, info, instrument};

use super::{dedupe_last_wins, SignalStore};
use crate::error::ScanError;
use crate::types::{PickStatus, ScanRun, ScanRunStatus, SignalCandidate, SignalStrength};

const PICKS_TABLE: &str = "screener_picks";
const RUNS_TABLE: &str = "screener_runs";
const CONFLICT_KEY: &str = "ticker,pick_date";
const BATCH_SIZE: usize = 50;

// ---------------------------------------------------------------------------
// Table rows
// ---------------------------------------------------------------------------

/// One `screener_picks` row.
#[derive(Debug, Serialize)]
struct PickRow<'a> {
    ticker: &'a str,
    company_name: Option<&'a str>,
    pick_date: NaiveDate,
    entry_price: f64,
    current_price: f64,
    rsi: f64,
    adx: f64,
    correction_pct: f64,
    volume_ratio: f64,
    volume_spike: bool,
    pe_ratio: Option<f64>,
    status: PickStatus,
    signal_strength: SignalStrength,
    signal_score: u32,
    signal_factors: &'a [String],
    notes: &'a str,
}

impl<'a> From<&'a SignalCandidate> for PickRow<'a> {
    fn from(c: &'a SignalCandidate) -> Self {
        Self {
            ticker: &c.ticker,
            company_name: c.company_name.as_deref(),
            pick_date: c.pick_date,
            entry_price: c.entry_price,
            current_price: c.current_price,
            rsi: c.rsi,
            adx: c.adx,
            correction_pct: c.correction_pct,
            volume_ratio: c.volume_ratio,
            volume_spike: c.volume_spike,
            pe_ratio: c.pe_ratio,
            status: c.status,
            signal_strength: c.signal_strength,
            signal_score: c.signal_score,
            signal_factors: &c.signal_factors,
            notes: &c.notes,
        }
    }
}

/// One `screener_runs` row.
#[derive(Debug, Serialize)]
struct RunRow<'a> {
    signals_found: usize,
    new_signals: usize,
    tickers_scanned: usize,
    duration_seconds: f64,
    status: ScanRunStatus,
    error_message: Option<&'a str>,
}

impl<'a> From<&'a ScanRun> for RunRow<'a> {
    fn from(run: &'a ScanRun) -> Self {
        Self {
            signals_found: run.signals_found,
            new_signals: run.signals_persisted,
            tickers_scanned: run.tickers_scanned,
            duration_seconds: run.duration_secs,
            status: run.status,
            error_message: run.error_message.as_deref(),
        }
    }
}

#[derive(Clone)]
pub struct RestSignalStore {
    base_url: String,
    client: reqwest::Client,
}

impl RestSignalStore {
    /// Create a store talking to `base_url` (no trailing `/rest/v1`).
    pub fn new(base_url: impl Into<String>, service_key: &str) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        let key = HeaderValue::from_str(service_key).context("service key is not a valid header")?;
        let bearer = HeaderValue::from_str(&format!("Bearer {service_key}"))
            .context("service key is not a valid header")?;
        default_headers.insert("apikey", key);
        default_headers.insert(AUTHORIZATION, bearer);
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "RestSignalStore initialised");

        Ok(Self { base_url, client })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn post_batch(&self, batch: &[SignalCandidate]) -> Result<()> {
        let url = format!("{}?on_conflict={}", self.table_url(PICKS_TABLE), CONFLICT_KEY);
        let rows: Vec<PickRow<'_>> = batch.iter().map(PickRow::from).collect();

        let resp = self
            .client
            .post(&url)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&rows)
            .send()
            .await
            .context("POST picks request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("POST {} returned {}: {}", PICKS_TABLE, status, body);
        }
        Ok(())
    }
}

#[async_trait]
impl SignalStore for RestSignalStore {
    fn name(&self) -> &'static str {
        "rest"
    }

    #[instrument(skip_all, name = "rest_store::upsert", fields(rows = candidates.len()))]
    async fn upsert(&self, candidates: &[SignalCandidate]) -> Result<usize, ScanError> {
        let rows = dedupe_last_wins(candidates);
        let mut written = 0;
        let mut failures = Vec::new();

        for (i, batch) in rows.chunks(BATCH_SIZE).enumerate() {
            match self.post_batch(batch).await {
                Ok(()) => {
                    written += batch.len();
                    debug!(batch = i + 1, rows = batch.len(), "picks batch upserted");
                }
                Err(e) => {
                    error!(batch = i + 1, rows = batch.len(), error = %e, "picks batch rejected");
                    failures.push(format!("batch {}: {e:#}", i + 1));
                }
            }
        }

        if !failures.is_empty() {
            return Err(ScanError::Persistence {
                written,
                reason: failures.join("; "),
            });
        }

        info!(written, "picks upserted");
        Ok(written)
    }

    #[instrument(skip_all, name = "rest_store::record_run", fields(run_id = %run.id))]
    async fn record_run(&self, run: &ScanRun) -> Result<()> {
        let resp = self
            .client
            .post(self.table_url(RUNS_TABLE))
            .header("Prefer", "return=minimal")
            .json(&RunRow::from(run))
            .send()
            .await
            .context("POST run request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("POST {} returned {}: {}", RUNS_TABLE, status, body);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::candidate;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn keys(row: &Value) -> BTreeSet<String> {
        row.as_object().unwrap().keys().cloned().collect()
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    const PICK_COLUMNS: &[&str] = &[
        "ticker",
        "company_name",
        "pick_date",
        "entry_price",
        "current_price",
        "rsi",
        "adx",
        "correction_pct",
        "volume_ratio",
        "volume_spike",
        "pe_ratio",
        "status",
        "signal_strength",
        "signal_score",
        "signal_factors",
        "notes",
    ];

    const RUN_COLUMNS: &[&str] = &[
        "signals_found",
        "new_signals",
        "tickers_scanned",
        "duration_seconds",
        "status",
        "error_message",
    ];

    fn run() -> ScanRun {
        ScanRun {
            id: uuid::Uuid::new_v4(),
            started_at: chrono::Utc::now(),
            duration_secs: 12.5,
            vix: Some(28.0),
            tickers_scanned: 150,
            signals_found: 4,
            signals_persisted: 3,
            skipped: 140,
            failed: 6,
            status: ScanRunStatus::Success,
            error_message: None,
        }
    }

    // ---- Stub PostgREST ---------------------------------------------------

    struct StubDb {
        posts: AtomicUsize,
        /// 1-based index of the first POST that gets a 400.
        reject_from: usize,
        bodies: parking_lot::Mutex<Vec<Value>>,
    }

    async fn insert(State(db): State<Arc<StubDb>>, Json(body): Json<Value>) -> StatusCode {
        let n = db.posts.fetch_add(1, Ordering::SeqCst) + 1;
        db.bodies.lock().push(body);
        if n >= db.reject_from {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::CREATED
        }
    }

    async fn serve_stub(reject_from: usize) -> (String, Arc<StubDb>) {
        let db = Arc::new(StubDb {
            posts: AtomicUsize::new(0),
            reject_from,
            bodies: parking_lot::Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/rest/v1/screener_picks", post(insert))
            .route("/rest/v1/screener_runs", post(insert))
            .with_state(db.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), db)
    }

    // ---- Row shape --------------------------------------------------------

    #[test]
    fn pick_row_has_table_columns_only() {
        let c = candidate("AAA", date(), 80);
        let row = serde_json::to_value(PickRow::from(&c)).unwrap();
        assert_eq!(keys(&row), set(PICK_COLUMNS));
        assert_eq!(row["pick_date"], "2026-10-16");
        assert_eq!(row["status"], "active");
        assert_eq!(row["signal_strength"], "strong");
    }

    #[test]
    fn run_row_uses_table_column_names() {
        let r = run();
        let row = serde_json::to_value(RunRow::from(&r)).unwrap();
        assert_eq!(keys(&row), set(RUN_COLUMNS));
        assert_eq!(row["duration_seconds"], 12.5);
        assert_eq!(row["new_signals"], 3);
        assert_eq!(row["status"], "success");
        assert!(row["error_message"].is_null());
    }

    #[test]
    fn table_urls_strip_trailing_slash() {
        let store = RestSignalStore::new("https://db.example.com/", "key").unwrap();
        assert_eq!(
            store.table_url(PICKS_TABLE),
            "https://db.example.com/rest/v1/screener_picks"
        );
    }

    #[test]
    fn rejects_unprintable_key() {
        assert!(RestSignalStore::new("https://db.example.com", "bad\nkey").is_err());
    }

    // ---- Against the stub -------------------------------------------------

    #[tokio::test]
    async fn later_batch_rejection_reports_rows_already_written() {
        let (url, db) = serve_stub(2).await;
        let store = RestSignalStore::new(url, "key").unwrap();
        let rows: Vec<_> = (0..60)
            .map(|i| candidate(&format!("T{i:02}"), date(), 70))
            .collect();

        match store.upsert(&rows).await {
            Err(ScanError::Persistence { written, reason }) => {
                assert_eq!(written, BATCH_SIZE);
                assert!(reason.contains("batch 2"));
            }
            other => panic!("expected partial persistence failure, got {other:?}"),
        }

        assert_eq!(db.posts.load(Ordering::SeqCst), 2);
        let bodies = db.bodies.lock();
        assert_eq!(bodies[0].as_array().unwrap().len(), BATCH_SIZE);
        assert_eq!(bodies[1].as_array().unwrap().len(), 10);
        assert_eq!(keys(&bodies[0][0]), set(PICK_COLUMNS));
    }

    #[tokio::test]
    async fn accepted_batches_count_every_row() {
        let (url, db) = serve_stub(usize::MAX).await;
        let store = RestSignalStore::new(url, "key").unwrap();
        let rows: Vec<_> = (0..60)
            .map(|i| candidate(&format!("T{i:02}"), date(), 70))
            .collect();
        assert_eq!(store.upsert(&rows).await.unwrap(), 60);
        assert_eq!(db.posts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn run_record_is_posted_with_table_columns() {
        let (url, db) = serve_stub(usize::MAX).await;
        let store = RestSignalStore::new(url, "key").unwrap();
        store.record_run(&run()).await.unwrap();
        let bodies = db.bodies.lock();
        assert_eq!(keys(&bodies[0]), set(RUN_COLUMNS));
    }

    #[tokio::test]
    async fn unreachable_store_reports_persistence_failure() {
        // Port 9 (discard) on localhost is closed in test environments.
        let store = RestSignalStore::new("http://127.0.0.1:9", "key").unwrap();
        let rows = vec![candidate("AAA", date(), 80)];
        match store.upsert(&rows).await {
            Err(ScanError::Persistence { written, .. }) => assert_eq!(written, 0),
            other => panic!("expected persistence failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_batch_writes_nothing() {
        let store = RestSignalStore::new("http://127.0.0.1:9", "key").unwrap();
        assert_eq!(store.upsert(&[]).await.unwrap(), 0);
    }
}
