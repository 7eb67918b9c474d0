// =============================================================================
// Scan response body
// =============================================================================
//
// Shared by the HTTP trigger and the one-shot CLI run:
//   success: { success: true, vixValue, signalCount, picks, persistenceError? }
//   gated:   { message, vixValue, signalCount: 0 }
//   failure: { error }
// =============================================================================

use serde::Serialize;

use crate::error::ScanError;
use crate::scanner::ScanOutcome;
use crate::types::SignalStrength;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickSummary {
    pub ticker: String,
    pub score: u32,
    pub strength: SignalStrength,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScanResponse {
    #[serde(rename_all = "camelCase")]
    Success {
        success: bool,
        vix_value: f64,
        signal_count: usize,
        picks: Vec<PickSummary>,
        #[serde(skip_serializing_if = "Option::is_none")]
        persistence_error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Gated {
        message: String,
        vix_value: f64,
        signal_count: usize,
    },
    Failure {
        error: String,
    },
}

impl ScanResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn from_result(result: &Result<ScanOutcome, ScanError>) -> Self {
        match result {
            Ok(ScanOutcome::Completed(report)) => Self::Success {
                success: true,
                vix_value: report.vix,
                signal_count: report.signal_count(),
                picks: report
                    .candidates
                    .iter()
                    .map(|c| PickSummary {
                        ticker: c.ticker.clone(),
                        score: c.signal_score,
                        strength: c.signal_strength,
                    })
                    .collect(),
                persistence_error: report.persistence_error.clone(),
            },
            Ok(ScanOutcome::Gated(gated)) => Self::Gated {
                message: gated.message.clone(),
                vix_value: gated.vix,
                signal_count: 0,
            },
            Err(e) => Self::failure(e.to_string()),
        }
    }
}
