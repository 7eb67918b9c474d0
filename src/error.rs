// =============================================================================
// Scan error taxonomy
// =============================================================================
//
// Plumbing (HTTP, JSON, file I/O) uses `anyhow::Result` with context. These
// typed variants are the conditions the scan itself has to tell apart.
// =============================================================================

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ScanError {
    /// VIX or per-ticker market data could not be obtained. Fatal for the
    /// scan only when it concerns the VIX reading.
    #[error("{source_name} unavailable: {reason}")]
    UpstreamUnavailable { source_name: String, reason: String },

    /// History shorter than an indicator period. Indicators fall back to
    /// their neutral defaults; this is only ever logged.
    #[error("{ticker}: {bars} bars of history, {required} required")]
    InsufficientHistory {
        ticker: String,
        bars: usize,
        required: usize,
    },

    /// The signal store rejected some or all of the batch. `written` rows
    /// made it in before or around the failure.
    #[error("signal store rejected batch ({written} rows written): {reason}")]
    Persistence { written: usize, reason: String },

    /// A scan was triggered while another one is in flight.
    #[error("a scan is already running")]
    AlreadyRunning,
}

impl ScanError {
    pub fn upstream(source_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::UpstreamUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_descriptive() {
        let e = ScanError::upstream("VIX", "timeout");
        assert_eq!(e.to_string(), "VIX unavailable: timeout");

        let e = ScanError::InsufficientHistory {
            ticker: "Y".into(),
            bars: 5,
            required: 15,
        };
        assert_eq!(e.to_string(), "Y: 5 bars of history, 15 required");
        assert_eq!(ScanError::AlreadyRunning.to_string(), "a scan is already running");

        let e = ScanError::Persistence {
            written: 3,
            reason: "HTTP 503".into(),
        };
        assert_eq!(e.to_string(), "signal store rejected batch (3 rows written): HTTP 503");
    }
}
