// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator functions used by the scanner. Short or
// degenerate input never errors: each function falls back to a documented
// neutral value instead.

pub mod adx;
pub mod rsi;
pub mod volume;

pub use adx::compute_adx;
pub use rsi::compute_rsi;
pub use volume::{average_volume, correction_pct, volume_ratio};
