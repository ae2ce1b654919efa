//! Leverage choice and margin (stake) sizing for copied positions.

use crate::domain::Decimal;
use crate::engine::SizingConfig;

/// Leverage to open a copy with, capped at the exchange maximum.
pub fn select_leverage(tracked_leverage: Option<Decimal>, sizing: &SizingConfig) -> Decimal {
    let wanted = match tracked_leverage {
        Some(lev) if sizing.copy_leverage && lev.is_positive() => lev,
        _ => sizing.leverage,
    };
    wanted.min(sizing.max_leverage)
}

/// Margin for a new position of `target_notional`, never below `min_stake`.
pub fn entry_stake(target_notional: Decimal, leverage: Decimal, sizing: &SizingConfig) -> Decimal {
    let margin = margin_for(target_notional, leverage) - sizing.dust;
    margin.max(sizing.min_stake)
}

/// Signed margin change for an increase (positive) or decrease (negative).
///
/// Increases are shaved by the dust allowance and floored at zero; decreases
/// return the full margin to release.
pub fn adjustment_stake(delta_notional: Decimal, leverage: Decimal, sizing: &SizingConfig) -> Decimal {
    let margin = margin_for(delta_notional, leverage);
    if delta_notional.is_negative() {
        -margin
    } else {
        (margin - sizing.dust).max(Decimal::zero())
    }
}

fn margin_for(notional: Decimal, leverage: Decimal) -> Decimal {
    notional.abs().checked_div(leverage).unwrap_or_default()
}
