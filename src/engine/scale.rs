//! Scale factor and per-coin local targets.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{Coin, Decimal, Direction, Position, PositionSnapshot, ScaledTarget};
use crate::engine::EngineConfig;
use crate::error::EngineError;

/// Why a tracked position produced no target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    BelowSignificance,
    DirectionNotCopied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPosition {
    pub coin: Coin,
    pub direction: Direction,
    /// Share of tracked equity the position represents.
    pub share: Decimal,
    pub reason: SkipReason,
}

/// Complete replacement target set for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScalePlan {
    pub scale_factor: Decimal,
    pub tracked_account_value: Decimal,
    pub local_account_value: Decimal,
    pub targets: BTreeMap<Coin, ScaledTarget>,
    /// Direction of every tracked position, significant or not.
    pub tracked_directions: BTreeMap<Coin, Direction>,
    pub skipped: Vec<SkippedPosition>,
}

impl ScalePlan {
    pub fn target(&self, coin: &Coin) -> Option<&ScaledTarget> {
        self.targets.get(coin)
    }

    pub fn tracked_direction(&self, coin: &Coin) -> Option<Direction> {
        self.tracked_directions.get(coin).copied()
    }

    pub fn skip_reason(&self, coin: &Coin) -> Option<SkipReason> {
        self.skipped
            .iter()
            .find(|s| &s.coin == coin)
            .map(|s| s.reason)
    }
}

/// Whether a tracked position is skipped, and why.
fn copy_rule(position: &Position, share: Decimal, config: &EngineConfig) -> Option<SkipReason> {
    if share < config.thresholds.change {
        Some(SkipReason::BelowSignificance)
    } else if !config.mode.permits(position.direction()) {
        Some(SkipReason::DirectionNotCopied)
    } else {
        None
    }
}

/// Tracked positions that would get a local target, in snapshot order.
pub fn copyable_positions<'a>(
    tracked: &'a PositionSnapshot,
    config: &'a EngineConfig,
) -> impl Iterator<Item = &'a Position> + 'a {
    tracked.positions().filter(move |position| {
        let share = tracked
            .share_of_equity(position.notional())
            .unwrap_or_default();
        copy_rule(position, share, config).is_none()
    })
}

/// Scale every significant, copyable tracked position to the local account.
///
/// Fails with `InvalidAccountState` when either account value is not
/// positive; nothing is divided in that case.
pub fn compute_targets(
    tracked: &PositionSnapshot,
    local: &PositionSnapshot,
    config: &EngineConfig,
) -> Result<ScalePlan, EngineError> {
    for snapshot in [tracked, local] {
        if !snapshot.account_value.is_positive() {
            return Err(EngineError::InvalidAccountState {
                account: snapshot.account.clone(),
                value: snapshot.account_value,
            });
        }
    }

    let scale_factor = local
        .account_value
        .checked_div(tracked.account_value)
        .ok_or_else(|| EngineError::InvalidAccountState {
            account: tracked.account.clone(),
            value: tracked.account_value,
        })?;

    let mut targets = BTreeMap::new();
    let mut tracked_directions = BTreeMap::new();
    let mut skipped = Vec::new();

    for position in tracked.positions() {
        let direction = position.direction();
        tracked_directions.insert(position.coin.clone(), direction);

        let share = tracked
            .share_of_equity(position.notional())
            .unwrap_or_default();

        if let Some(reason) = copy_rule(position, share, config) {
            skipped.push(SkippedPosition {
                coin: position.coin.clone(),
                direction,
                share,
                reason,
            });
            continue;
        }

        targets.insert(
            position.coin.clone(),
            ScaledTarget {
                coin: position.coin.clone(),
                direction,
                target_local_notional: position.notional() * scale_factor,
                tracked_leverage: position.leverage,
            },
        );
    }

    Ok(ScalePlan {
        scale_factor,
        tracked_account_value: tracked.account_value,
        local_account_value: local.account_value,
        targets,
        tracked_directions,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, Position, TimeMs};
    use crate::engine::CopyMode;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn pos(coin: &str, size: &str, value: &str) -> Position {
        Position::new(Coin::new(coin), d(size), d("1"), d(value), d("5"))
    }

    fn snap(value: &str, positions: Vec<Position>) -> PositionSnapshot {
        PositionSnapshot::new(Address::new("0xabc".into()), d(value), TimeMs::new(1), positions)
            .unwrap()
    }

    #[test]
    fn test_copyable_positions_match_plan_targets() {
        let tracked = snap(
            "10000",
            vec![
                pos("BTC", "1", "5000"),
                pos("ETH", "-2", "1000"),
                pos("DOGE", "10", "10"),
            ],
        );
        let config = EngineConfig::default();
        let plan = compute_targets(&tracked, &snap("100", vec![]), &config).unwrap();

        let copyable: Vec<&Coin> = copyable_positions(&tracked, &config)
            .map(|p| &p.coin)
            .collect();
        let targeted: Vec<&Coin> = plan.targets.keys().collect();
        assert_eq!(copyable, targeted);
        assert_eq!(copyable, vec![&Coin::new("BTC")]);
    }

    #[test]
    fn test_scale_factor_and_targets() {
        let tracked = snap("10000", vec![pos("BTC", "1", "5000"), pos("ETH", "2", "1000")]);
        let local = snap("100", vec![]);
        let plan = compute_targets(&tracked, &local, &EngineConfig::default()).unwrap();

        assert_eq!(plan.scale_factor, d("0.01"));
        assert_eq!(plan.target(&Coin::new("BTC")).unwrap().target_local_notional, d("50"));
        assert_eq!(plan.target(&Coin::new("ETH")).unwrap().target_local_notional, d("10"));
    }

    #[test]
    fn test_below_significance_has_no_target() {
        // 40 / 10000 = 0.4% < 0.5%
        let tracked = snap("10000", vec![pos("DOGE", "100", "40")]);
        let local = snap("100", vec![]);
        let plan = compute_targets(&tracked, &local, &EngineConfig::default()).unwrap();

        assert!(plan.targets.is_empty());
        assert_eq!(
            plan.skip_reason(&Coin::new("DOGE")),
            Some(SkipReason::BelowSignificance)
        );
        assert_eq!(plan.tracked_direction(&Coin::new("DOGE")), Some(Direction::Long));
    }

    #[test]
    fn test_significance_boundary_is_inclusive() {
        // 50 / 10000 = 0.5%
        let tracked = snap("10000", vec![pos("DOGE", "100", "50")]);
        let local = snap("100", vec![]);
        let plan = compute_targets(&tracked, &local, &EngineConfig::default()).unwrap();
        assert!(plan.target(&Coin::new("DOGE")).is_some());
    }

    #[test]
    fn test_shorts_only_copied_in_long_short_mode() {
        let tracked = snap("10000", vec![pos("ETH", "-2", "-1000")]);
        let local = snap("100", vec![]);

        let plan = compute_targets(&tracked, &local, &EngineConfig::default()).unwrap();
        assert!(plan.targets.is_empty());
        assert_eq!(
            plan.skip_reason(&Coin::new("ETH")),
            Some(SkipReason::DirectionNotCopied)
        );

        let config = EngineConfig {
            mode: CopyMode::LongShort,
            ..EngineConfig::default()
        };
        let plan = compute_targets(&tracked, &local, &config).unwrap();
        let target = plan.target(&Coin::new("ETH")).unwrap();
        assert_eq!(target.direction, Direction::Short);
        assert_eq!(target.target_local_notional, d("10"));
    }

    #[test]
    fn test_non_positive_account_values_fail() {
        let tracked = snap("0", vec![]);
        let local = snap("100", vec![]);
        let err = compute_targets(&tracked, &local, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAccountState { .. }));

        let tracked = snap("100", vec![]);
        let local = snap("-5", vec![]);
        let err = compute_targets(&tracked, &local, &EngineConfig::default()).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidAccountState {
                account: Address::new("0xabc".into()),
                value: d("-5")
            }
        );
    }
}
