// =============================================================================
// In-memory Signal Store
// =============================================================================
//
// Default store when no external database is configured. Rows live in a
// `BTreeMap` keyed by (ticker, pick_date) behind a `parking_lot::RwLock`,
// so reads are ordered and an upsert replaces the whole row.
// =============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::debug;

use super::{dedupe_last_wins, SignalStore};
use crate::error::ScanError;
use crate::types::{ScanRun, SignalCandidate};

/// Maximum number of run records to retain.
const MAX_RUNS: usize = 100;

#[derive(Default)]
pub struct MemorySignalStore {
    rows: RwLock<BTreeMap<(String, NaiveDate), SignalCandidate>>,
    runs: RwLock<Vec<ScanRun>>,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemorySignalStore {
    /// All stored picks, ordered by ticker then date.
    pub fn picks(&self) -> Vec<SignalCandidate> {
        self.rows.read().values().cloned().collect()
    }

    pub fn get(&self, ticker: &str, pick_date: NaiveDate) -> Option<SignalCandidate> {
        self.rows.read().get(&(ticker.to_string(), pick_date)).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Run records, oldest first.
    pub fn runs(&self) -> Vec<ScanRun> {
        self.runs.read().clone()
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upsert(&self, candidates: &[SignalCandidate]) -> Result<usize, ScanError> {
        let batch = dedupe_last_wins(candidates);
        let mut rows = self.rows.write();
        for c in &batch {
            rows.insert(c.key(), c.clone());
        }
        debug!(rows = batch.len(), total = rows.len(), "memory store upsert");
        Ok(batch.len())
    }

    async fn record_run(&self, run: &ScanRun) -> anyhow::Result<()> {
        let mut runs = self.runs.write();
        runs.push(run.clone());
        if runs.len() > MAX_RUNS {
            let excess = runs.len() - MAX_RUNS;
            runs.drain(..excess);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::candidate;
    use crate::types::ScanRunStatus;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let store = MemorySignalStore::new();
        store.upsert(&[candidate("AAA", date(), 60)]).await.unwrap();
        store.upsert(&[candidate("AAA", date(), 80)]).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("AAA", date()).unwrap().signal_score, 80);
    }

    #[tokio::test]
    async fn upsert_collapses_duplicates_in_one_call() {
        let store = MemorySignalStore::new();
        let written = store
            .upsert(&[candidate("AAA", date(), 60), candidate("AAA", date(), 70)])
            .await
            .unwrap();
        assert_eq!(written, 1);
        assert_eq!(store.picks()[0].signal_score, 70);
    }

    #[tokio::test]
    async fn run_log_is_bounded() {
        let store = MemorySignalStore::new();
        for i in 0..(MAX_RUNS + 5) {
            let run = ScanRun {
                id: uuid::Uuid::new_v4(),
                started_at: chrono::Utc::now(),
                duration_secs: 0.0,
                vix: None,
                tickers_scanned: i,
                signals_found: 0,
                signals_persisted: 0,
                skipped: 0,
                failed: 0,
                status: ScanRunStatus::Error,
                error_message: None,
            };
            store.record_run(&run).await.unwrap();
        }
        let runs = store.runs();
        assert_eq!(runs.len(), MAX_RUNS);
        assert_eq!(runs[0].tickers_scanned, 5);
    }
}
