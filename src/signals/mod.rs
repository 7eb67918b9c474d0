// =============================================================================
// Signals Module
// =============================================================================
//
// Turning an indicator snapshot into a pick:
// - Fixed-weight composite scoring with an ordered factor trail
// - Entry gate, score floor and strength classification

pub mod gate;
pub mod score;

pub use gate::{check_entry, check_score, classify, GateRejection};
pub use score::score;
