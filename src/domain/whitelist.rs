//! Set of coins the local account may open positions in.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::Coin;

/// Read-only gate on entries. Exits and adjustments ignore it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Whitelist {
    /// Every coin is tradable.
    #[default]
    All,
    Coins(BTreeSet<Coin>),
}

impl Whitelist {
    /// Build from pair names or bare symbols. A `*` entry allows everything.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut coins = BTreeSet::new();
        for pair in pairs {
            let pair = pair.as_ref().trim();
            if pair == "*" {
                return Whitelist::All;
            }
            if pair.is_empty() {
                continue;
            }
            coins.insert(Coin::from_pair(pair));
        }
        Whitelist::Coins(coins)
    }

    pub fn contains(&self, coin: &Coin) -> bool {
        match self {
            Whitelist::All => true,
            Whitelist::Coins(coins) => coins.contains(coin),
        }
    }

    pub fn coin_count(&self) -> Option<usize> {
        match self {
            Whitelist::All => None,
            Whitelist::Coins(coins) => Some(coins.len()),
        }
    }
}
