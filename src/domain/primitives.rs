//! Domain primitives: TimeMs, Address, Coin, Direction.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Time in milliseconds since Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_ms(&self) -> i64 {
        self.0
    }

    /// Shift forward by `ms` milliseconds (saturating).
    pub fn plus_ms(&self, ms: i64) -> Self {
        TimeMs(self.0.saturating_add(ms))
    }

    /// Human readable UTC time, `%Y-%m-%d %H:%M:%S`.
    pub fn to_human(&self) -> String {
        match Utc.timestamp_millis_opt(self.0).single() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => self.0.to_string(),
        }
    }
}

impl std::fmt::Display for TimeMs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wallet address (hex string).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address: {0}")]
pub struct AddressParseError(pub String);

impl Address {
    /// Create an Address from a string without validation.
    pub fn new(addr: String) -> Self {
        Address(addr)
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    /// Accepts `0x` followed by 40 hex digits; normalizes to lowercase.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let hex_part = s
            .strip_prefix("0x")
            .ok_or_else(|| AddressParseError(s.to_string()))?;
        if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressParseError(s.to_string()));
        }
        Ok(Address(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coin/asset symbol (e.g., "BTC", "HYPE").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coin(pub String);

impl Coin {
    /// Create a Coin from a string.
    pub fn new(coin: impl Into<String>) -> Self {
        Coin(coin.into())
    }

    /// Extract the base coin from a pair name such as `HYPE/USDC:USDC`.
    /// A bare symbol is returned unchanged.
    pub fn from_pair(pair: &str) -> Self {
        let base = pair.trim().split('/').next().unwrap_or_default();
        Coin(base.to_string())
    }

    /// Format as a pair name with the given quote suffix (e.g. `/USDC:USDC`).
    pub fn to_pair(&self, suffix: &str) -> String {
        format!("{}{}", self.0, suffix)
    }

    /// Get the coin as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position direction in one-way mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Direction implied by a signed size. Zero has no direction.
    pub fn of_size(signed_size: crate::domain::Decimal) -> Option<Direction> {
        if signed_size.is_positive() {
            Some(Direction::Long)
        } else if signed_size.is_negative() {
            Some(Direction::Short)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Decimal;

    #[test]
    fn test_address_parse() {
        let addr: Address = "0x95B8B411653328DB32F59B143C6D45F8501E2B35".parse().unwrap();
        assert_eq!(addr.as_str(), "0x95b8b411653328db32f59b143c6d45f8501e2b35");

        assert!("95b8b411653328db32f59b143c6d45f8501e2b35".parse::<Address>().is_err());
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xzzb8b411653328db32f59b143c6d45f8501e2b35"
            .parse::<Address>()
            .is_err());
    }

    #[test]
    fn test_coin_from_pair() {
        assert_eq!(Coin::from_pair("HYPE/USDC:USDC"), Coin::new("HYPE"));
        assert_eq!(Coin::from_pair("BTC"), Coin::new("BTC"));
        assert_eq!(Coin::new("ETH").to_pair("/USDC:USDC"), "ETH/USDC:USDC");
    }

    #[test]
    fn test_direction_of_size() {
        assert_eq!(
            Direction::of_size(Decimal::from_str_canonical("1.5").unwrap()),
            Some(Direction::Long)
        );
        assert_eq!(
            Direction::of_size(Decimal::from_str_canonical("-0.1").unwrap()),
            Some(Direction::Short)
        );
        assert_eq!(Direction::of_size(Decimal::zero()), None);
    }

    #[test]
    fn test_timems_human() {
        assert_eq!(TimeMs::new(0).to_human(), "1970-01-01 00:00:00");
        assert_eq!(TimeMs::new(1_000).plus_ms(500), TimeMs::new(1_500));
        assert!(TimeMs::new(1000) < TimeMs::new(2000));
    }

    #[test]
    fn test_direction_serialization() {
        let json = serde_json::to_string(&Direction::Short).unwrap();
        assert_eq!(json, "\"short\"");
    }
}
