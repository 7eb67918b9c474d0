// =============================================================================
// Signal Store
// =============================================================================
//
// Access contract for wherever picks end up. The scanner never designs the
// storage; it only relies on:
//   - upsert keyed on (ticker, pick_date), last write wins, no duplicates
//     within one call;
//   - an append-only run log.
//
// Row-level atomicity is enough. A store that fails part-way reports how
// many rows made it in; the scanner logs the failure and does not retry.
// =============================================================================

pub mod memory;
pub mod rest;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::ScanError;
use crate::types::{ScanRun, SignalCandidate};

pub use memory::MemorySignalStore;
pub use rest::RestSignalStore;

#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Short store name for logs.
    fn name(&self) -> &'static str;

    /// Insert or replace every candidate. Returns the number of rows written.
    async fn upsert(&self, candidates: &[SignalCandidate]) -> Result<usize, ScanError>;

    /// Append a scan run record.
    async fn record_run(&self, run: &ScanRun) -> anyhow::Result<()>;
}

/// Collapse candidates sharing a (ticker, pick_date) key, keeping the last
/// one at the position of the first.
pub fn dedupe_last_wins(candidates: &[SignalCandidate]) -> Vec<SignalCandidate> {
    let mut index: HashMap<(String, chrono::NaiveDate), usize> = HashMap::new();
    let mut out: Vec<SignalCandidate> = Vec::with_capacity(candidates.len());
    for c in candidates {
        match index.get(&c.key()) {
            Some(&i) => out[i] = c.clone(),
            None => {
                index.insert(c.key(), out.len());
                out.push(c.clone());
            }
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;

    use crate::types::{PickStatus, PositionPlan, SignalCandidate, SignalStrength};

    pub fn candidate(ticker: &str, date: NaiveDate, score: u32) -> SignalCandidate {
        SignalCandidate {
            ticker: ticker.to_string(),
            company_name: None,
            pick_date: date,
            entry_price: 70.0,
            current_price: 70.0,
            rsi: 40.0,
            adx: 22.0,
            correction_pct: 30.0,
            volume_ratio: 1.5,
            volume_spike: false,
            pe_ratio: Some(18.0),
            roe: Some(12.0),
            debt_equity: None,
            status: PickStatus::Active,
            signal_strength: SignalStrength::Strong,
            signal_score: score,
            signal_factors: vec!["VIX 28.0 in buy zone".into()],
            notes: "VIX: 28.0".into(),
            position: PositionPlan {
                shares: 95,
                position_value: 6_666.67,
                stop_price: 59.5,
                target_price: 105.0,
            },
        }
    }
}
