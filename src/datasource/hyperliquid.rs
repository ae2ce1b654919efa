//! Hyperliquid API client implementation.

use super::{DataSourceError, SnapshotFetcher};
use crate::domain::{Address, Coin, Decimal, Position, PositionSnapshot, TimeMs};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Hyperliquid data source using the public Info API.
#[derive(Debug, Clone)]
pub struct HyperliquidDataSource {
    client: Client,
    base_url: String,
}

impl HyperliquidDataSource {
    /// Create a new Hyperliquid data source.
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn post_info(
        &self,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, DataSourceError> {
        let url = format!("{}/info", self.base_url);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .post(&url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                warn!("Info API rate limited, backing off");
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl SnapshotFetcher for HyperliquidDataSource {
    async fn fetch_snapshot(
        &self,
        address: &Address,
    ) -> Result<Option<PositionSnapshot>, DataSourceError> {
        debug!("Fetching clearinghouse state for user={}", address);

        let payload = serde_json::json!({
            "type": "clearinghouseState",
            "user": address.as_str()
        });

        let response = self.post_info(payload).await?;
        parse_clearinghouse_state(&response, address).map(Some)
    }
}

/// Build a snapshot from a `clearinghouseState` response.
///
/// Only one-way positions are read; zero-size entries are dropped. A missing
/// `time` falls back to the local clock.
pub fn parse_clearinghouse_state(
    state: &serde_json::Value,
    address: &Address,
) -> Result<PositionSnapshot, DataSourceError> {
    let account_value = state
        .get("marginSummary")
        .and_then(|m| m.get("accountValue"))
        .ok_or_else(|| DataSourceError::ParseError("Missing marginSummary.accountValue".into()))
        .and_then(|v| parse_decimal(v, "accountValue"))?;

    let timestamp = state
        .get("time")
        .and_then(|v| v.as_i64())
        .map(TimeMs::new)
        .unwrap_or_else(TimeMs::now);

    let asset_positions: &[serde_json::Value] = match state.get("assetPositions") {
        Some(v) => v
            .as_array()
            .ok_or_else(|| DataSourceError::ParseError("assetPositions is not an array".into()))?
            .as_slice(),
        None => &[],
    };

    let mut positions = Vec::with_capacity(asset_positions.len());
    for entry in asset_positions {
        if entry.get("type").and_then(|t| t.as_str()) != Some("oneWay") {
            continue;
        }
        let Some(position) = entry.get("position") else {
            continue;
        };
        positions.push(parse_position(position)?);
    }

    Ok(PositionSnapshot::new(
        address.clone(),
        account_value,
        timestamp,
        positions,
    )?)
}

fn parse_position(position: &serde_json::Value) -> Result<Position, DataSourceError> {
    let coin = position
        .get("coin")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataSourceError::ParseError("Missing coin field".to_string()))?;

    let field = |name: &str| -> Result<Decimal, DataSourceError> {
        let value = position
            .get(name)
            .ok_or_else(|| DataSourceError::ParseError(format!("Missing {} field", name)))?;
        parse_decimal(value, name)
    };
    let optional = |name: &str| -> Result<Decimal, DataSourceError> {
        match position.get(name) {
            Some(value) if !value.is_null() => parse_decimal(value, name),
            _ => Ok(Decimal::zero()),
        }
    };

    // Leverage is either {"type": "cross", "value": 5} or a bare number.
    let leverage = match position.get("leverage") {
        Some(serde_json::Value::Object(obj)) => obj
            .get("value")
            .ok_or_else(|| DataSourceError::ParseError("Missing leverage.value".to_string()))
            .and_then(|v| parse_decimal(v, "leverage"))?,
        Some(other) => parse_decimal(other, "leverage")?,
        None => return Err(DataSourceError::ParseError("Missing leverage field".to_string())),
    };

    Ok(Position::new(
        Coin::new(coin),
        field("szi")?,
        field("entryPx")?,
        field("positionValue")?,
        leverage,
    )
    .with_pnl(optional("unrealizedPnl")?, optional("marginUsed")?))
}

/// The Info API sends decimals as strings, occasionally as JSON numbers.
fn parse_decimal(value: &serde_json::Value, name: &str) -> Result<Decimal, DataSourceError> {
    let raw = match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        other => {
            return Err(DataSourceError::ParseError(format!(
                "Invalid {}: {}",
                name, other
            )))
        }
    };
    Decimal::from_str_canonical(&raw)
        .map_err(|e| DataSourceError::ParseError(format!("Invalid {}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use crate::error::EngineError;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn addr() -> Address {
        Address::new("0xabc".to_string())
    }

    fn sample() -> serde_json::Value {
        serde_json::json!({
            "marginSummary": {"accountValue": "2054213.79", "totalNtlPos": "0"},
            "time": 1_700_000_000_000_i64,
            "assetPositions": [
                {
                    "type": "oneWay",
                    "position": {
                        "coin": "HYPE",
                        "szi": "120000.5",
                        "entryPx": "44.1",
                        "positionValue": "5933252.41",
                        "unrealizedPnl": "-1200.5",
                        "leverage": {"type": "cross", "value": 5},
                        "marginUsed": "1186650.48"
                    }
                },
                {
                    "type": "oneWay",
                    "position": {
                        "coin": "ETH",
                        "szi": "-3",
                        "entryPx": "3000",
                        "positionValue": "9000",
                        "unrealizedPnl": "0",
                        "leverage": 10,
                        "marginUsed": "900"
                    }
                },
                {
                    "type": "oneWay",
                    "position": {
                        "coin": "SOL",
                        "szi": "0.0",
                        "entryPx": "100",
                        "positionValue": "0",
                        "unrealizedPnl": "0",
                        "leverage": {"type": "isolated", "value": 3},
                        "marginUsed": "0"
                    }
                }
            ]
        })
    }

    #[test]
    fn test_parse_clearinghouse_state() {
        let snapshot = parse_clearinghouse_state(&sample(), &addr()).unwrap();

        assert_eq!(snapshot.account_value, d("2054213.79"));
        assert_eq!(snapshot.timestamp, TimeMs::new(1_700_000_000_000));
        assert_eq!(snapshot.len(), 2);

        let hype = snapshot.get(&Coin::new("HYPE")).unwrap();
        assert_eq!(hype.notional(), d("5933252.41"));
        assert_eq!(hype.leverage, d("5"));
        assert_eq!(hype.unrealized_pnl, d("-1200.5"));

        let eth = snapshot.get(&Coin::new("ETH")).unwrap();
        assert_eq!(eth.direction(), Direction::Short);
        assert_eq!(eth.leverage, d("10"));
    }

    #[test]
    fn test_parse_rejects_duplicate_coin() {
        let mut state = sample();
        let dup = state["assetPositions"][0].clone();
        state["assetPositions"].as_array_mut().unwrap().push(dup);

        let err = parse_clearinghouse_state(&state, &addr()).unwrap_err();
        assert!(matches!(
            err,
            DataSourceError::InvalidSnapshot(EngineError::AmbiguousPosition { .. })
        ));
    }

    #[test]
    fn test_parse_missing_account_value() {
        let state = serde_json::json!({"assetPositions": []});
        let err = parse_clearinghouse_state(&state, &addr()).unwrap_err();
        assert!(matches!(err, DataSourceError::ParseError(_)));
    }

    #[test]
    fn test_parse_empty_account() {
        let state = serde_json::json!({
            "marginSummary": {"accountValue": "1085.99"},
            "time": 5
        });
        let snapshot = parse_clearinghouse_state(&state, &addr()).unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.account_value, d("1085.99"));
    }
}
