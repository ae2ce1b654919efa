//! Classifies how the tracked account moved between two snapshots.

use crate::domain::{ChangeEvent, ChangeKind, Decimal, Direction, Position, PositionSnapshot};
use crate::engine::Thresholds;

/// Entry price moves at or below this are treated as noise.
fn entry_price_epsilon() -> Decimal {
    Decimal::new(rust_decimal::Decimal::new(1, 6))
}

/// Leverage moves at or below this are treated as noise.
fn leverage_epsilon() -> Decimal {
    Decimal::new(rust_decimal::Decimal::new(1, 8))
}

/// Diff two consecutive tracked snapshots into at most one event per coin.
///
/// With no previous snapshot (cold start) every current position is reported
/// as opened. Events come out ordered by coin.
///
/// A same-direction size change only counts when the notional it moved, at
/// the current mark price, is at least `thresholds.change` of the current
/// account value. The boundary is inclusive: a move of exactly
/// `thresholds.change` is reported, matching the reconciler's tolerance band.
/// Sub-threshold changes fall through to the `modified` check.
pub fn detect_changes(
    previous: Option<&PositionSnapshot>,
    current: &PositionSnapshot,
    thresholds: &Thresholds,
) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    let Some(previous) = previous else {
        events.extend(current.positions().map(|p| opened(p, current)));
        return events;
    };

    let mut coins: Vec<_> = previous.coins().chain(current.coins()).cloned().collect();
    coins.sort();
    coins.dedup();

    for coin in coins {
        let event = match (previous.get(&coin), current.get(&coin)) {
            (None, Some(new)) => Some(opened(new, current)),
            (Some(old), None) => Some(ChangeEvent {
                coin: coin.clone(),
                kind: ChangeKind::Closed,
                old_size: Some(old.signed_size),
                new_size: Decimal::zero(),
                old_notional: Some(old.notional()),
                new_notional: Decimal::zero(),
                timestamp: current.timestamp,
            }),
            (Some(old), Some(new)) => classify(old, new, current, thresholds),
            (None, None) => None,
        };
        events.extend(event);
    }

    events
}

fn opened(position: &Position, snapshot: &PositionSnapshot) -> ChangeEvent {
    let kind = match position.direction() {
        Direction::Long => ChangeKind::OpenedLong,
        Direction::Short => ChangeKind::OpenedShort,
    };
    ChangeEvent {
        coin: position.coin.clone(),
        kind,
        old_size: None,
        new_size: position.signed_size,
        old_notional: None,
        new_notional: position.notional(),
        timestamp: snapshot.timestamp,
    }
}

fn classify(
    old: &Position,
    new: &Position,
    current: &PositionSnapshot,
    thresholds: &Thresholds,
) -> Option<ChangeEvent> {
    let kind = if old.direction() != new.direction() {
        ChangeKind::Flipped
    } else if let Some(kind) = size_change(old, new, current, thresholds) {
        kind
    } else if (new.entry_price - old.entry_price).abs() > entry_price_epsilon()
        || (new.leverage - old.leverage).abs() > leverage_epsilon()
    {
        ChangeKind::Modified
    } else {
        return None;
    };

    Some(ChangeEvent {
        coin: new.coin.clone(),
        kind,
        old_size: Some(old.signed_size),
        new_size: new.signed_size,
        old_notional: Some(old.notional()),
        new_notional: new.notional(),
        timestamp: current.timestamp,
    })
}

fn size_change(
    old: &Position,
    new: &Position,
    current: &PositionSnapshot,
    thresholds: &Thresholds,
) -> Option<ChangeKind> {
    let delta_abs_size = new.signed_size.abs() - old.signed_size.abs();
    if delta_abs_size.is_zero() {
        return None;
    }

    let mark = new.mark_price()?;
    let moved_notional = delta_abs_size.abs() * mark;
    let share = current.share_of_equity(moved_notional)?;
    if share < thresholds.change {
        return None;
    }

    if delta_abs_size.is_positive() {
        Some(ChangeKind::Increased)
    } else {
        Some(ChangeKind::Decreased)
    }
}
