//! Point-in-time position sets for one account.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Address, Coin, Decimal, Direction, TimeMs};
use crate::error::EngineError;

/// One coin's exposure at a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub coin: Coin,
    /// Positive = long, negative = short. Never zero inside a snapshot.
    pub signed_size: Decimal,
    pub entry_price: Decimal,
    /// Position value at the mark price; only its magnitude is used.
    pub notional_value: Decimal,
    pub leverage: Decimal,
    #[serde(default)]
    pub unrealized_pnl: Decimal,
    #[serde(default)]
    pub margin_used: Decimal,
}

impl Position {
    pub fn new(
        coin: Coin,
        signed_size: Decimal,
        entry_price: Decimal,
        notional_value: Decimal,
        leverage: Decimal,
    ) -> Self {
        Self {
            coin,
            signed_size,
            entry_price,
            notional_value,
            leverage,
            unrealized_pnl: Decimal::zero(),
            margin_used: Decimal::zero(),
        }
    }

    pub fn with_pnl(mut self, unrealized_pnl: Decimal, margin_used: Decimal) -> Self {
        self.unrealized_pnl = unrealized_pnl;
        self.margin_used = margin_used;
        self
    }

    /// Snapshots never hold zero sizes, so the fallback is unreachable there.
    pub fn direction(&self) -> Direction {
        Direction::of_size(self.signed_size).unwrap_or(Direction::Long)
    }

    /// Absolute notional value.
    pub fn notional(&self) -> Decimal {
        self.notional_value.abs()
    }

    /// Mark price implied by notional and size, if the size is non-zero.
    pub fn mark_price(&self) -> Option<Decimal> {
        self.notional().checked_div(self.signed_size.abs())
    }

    fn validate(&self) -> Result<(), EngineError> {
        if !self.entry_price.is_positive() {
            return Err(EngineError::MalformedPosition {
                coin: self.coin.clone(),
                reason: format!("entry price {} is not positive", self.entry_price),
            });
        }
        if !self.leverage.is_positive() {
            return Err(EngineError::MalformedPosition {
                coin: self.coin.clone(),
                reason: format!("leverage {} is not positive", self.leverage),
            });
        }
        Ok(())
    }
}

/// A complete position set for one account at one observation time.
///
/// Construction enforces one entry per coin and drops closed (zero-size)
/// positions, so every `Position` held here has a definite direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionSnapshot {
    pub account: Address,
    pub account_value: Decimal,
    pub timestamp: TimeMs,
    positions: BTreeMap<Coin, Position>,
}

impl PositionSnapshot {
    pub fn new(
        account: Address,
        account_value: Decimal,
        timestamp: TimeMs,
        positions: Vec<Position>,
    ) -> Result<Self, EngineError> {
        let mut by_coin = BTreeMap::new();
        for position in positions {
            if position.signed_size.is_zero() {
                continue;
            }
            position.validate()?;
            if by_coin.contains_key(&position.coin) {
                return Err(EngineError::AmbiguousPosition {
                    account,
                    coin: position.coin,
                });
            }
            by_coin.insert(position.coin.clone(), position);
        }

        Ok(Self {
            account,
            account_value,
            timestamp,
            positions: by_coin,
        })
    }

    /// Snapshot of an account holding nothing.
    pub fn empty(account: Address, account_value: Decimal, timestamp: TimeMs) -> Self {
        Self {
            account,
            account_value,
            timestamp,
            positions: BTreeMap::new(),
        }
    }

    pub fn get(&self, coin: &Coin) -> Option<&Position> {
        self.positions.get(coin)
    }

    pub fn contains(&self, coin: &Coin) -> bool {
        self.positions.contains_key(coin)
    }

    /// Positions ordered by coin symbol.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn coins(&self) -> impl Iterator<Item = &Coin> {
        self.positions.keys()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Share of account value represented by `notional`, or `None` when the
    /// account value is not positive.
    pub fn share_of_equity(&self, notional: Decimal) -> Option<Decimal> {
        if !self.account_value.is_positive() {
            return None;
        }
        notional.abs().checked_div(self.account_value)
    }
}
