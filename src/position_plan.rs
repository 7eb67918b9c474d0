// =============================================================================
// Position Plan: static fixed-risk sizing
// =============================================================================
//
//   risk_dollars   = account_size * risk_per_trade_pct / 100
//   position_value = min(risk_dollars / (stop_loss_pct / 100),
//                        account_size * max_position_pct / 100)
//   shares         = floor(position_value / entry_price)
//   stop_price     = entry * (1 - stop_loss_pct / 100)
//   target_price   = entry * (1 + take_profit_pct / 100)
//
// No portfolio state is consulted; every pick is sized independently.
// =============================================================================

use crate::screener_config::PositionSizing;
use crate::types::PositionPlan;

/// Size a new position entered at `entry_price`.
///
/// A non-positive or non-finite entry price yields a zero-share plan.
pub fn plan_position(entry_price: f64, sizing: &PositionSizing) -> PositionPlan {
    let stop_price = entry_price * (1.0 - sizing.stop_loss_pct / 100.0);
    let target_price = entry_price * (1.0 + sizing.take_profit_pct / 100.0);

    if !(entry_price > 0.0) || !entry_price.is_finite() || sizing.stop_loss_pct <= 0.0 {
        return PositionPlan {
            shares: 0,
            position_value: 0.0,
            stop_price,
            target_price,
        };
    }

    let risk_dollars = sizing.account_size * sizing.risk_per_trade_pct / 100.0;
    let position_value = (risk_dollars / (sizing.stop_loss_pct / 100.0))
        .min(sizing.account_size * sizing.max_position_pct / 100.0)
        .max(0.0);
    let shares = (position_value / entry_price).floor() as u64;

    PositionPlan {
        shares,
        position_value,
        stop_price,
        target_price,
    }
}
