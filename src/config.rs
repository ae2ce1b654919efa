use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::domain::{Address, Decimal, Whitelist};
use crate::engine::{CopyMode, EngineConfig, SizingConfig, Thresholds};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub hyperliquid_api_url: String,
    pub data_dir: String,
    pub tracked_address: Address,
    pub local_address: Address,
    pub poll_interval: Duration,
    pub copy_mode: CopyMode,
    pub leverage: Decimal,
    pub max_leverage: Decimal,
    pub copy_leverage: bool,
    /// Percent of tracked equity.
    pub change_threshold_pct: Decimal,
    /// Percent tolerance between target and actual.
    pub adjustment_threshold_pct: Decimal,
    pub max_open_trades: usize,
    pub min_stake: Decimal,
    pub dust_usdc: Decimal,
    pub adjustment_cooldown: Duration,
    pub whitelist: Whitelist,
    pub whitelist_url: Option<String>,
    pub pair_suffix: String,
    pub max_pairs: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", 8080u16, "must be a valid u16")?;

        let hyperliquid_api_url = env_map
            .get("HYPERLIQUID_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.hyperliquid.xyz".to_string());

        let data_dir = env_map
            .get("DATA_DIR")
            .cloned()
            .unwrap_or_else(|| "position_data".to_string());

        let tracked_address = required_address(&env_map, "TRACKED_ADDRESS")?;
        let local_address = required_address(&env_map, "LOCAL_ADDRESS")?;

        let poll_secs: u64 = parse_or(&env_map, "POLL_INTERVAL_SECS", 30, "must be a valid u64")?;
        if poll_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "POLL_INTERVAL_SECS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        let copy_mode = match env_map
            .get("COPY_MODE")
            .map(|s| s.as_str())
            .unwrap_or("long_only")
        {
            "long_only" => CopyMode::LongOnly,
            "long_short" => CopyMode::LongShort,
            other => {
                return Err(ConfigError::InvalidValue(
                    "COPY_MODE".to_string(),
                    format!("must be long_only or long_short, got {}", other),
                ))
            }
        };

        let leverage = positive_decimal(&env_map, "LEV", "6")?;
        let max_leverage = positive_decimal(&env_map, "MAX_LEVERAGE", "50")?;

        let copy_leverage = match env_map
            .get("COPY_LEVERAGE")
            .map(|s| s.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(other) => {
                return Err(ConfigError::InvalidValue(
                    "COPY_LEVERAGE".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        let change_threshold_pct = non_negative_decimal(&env_map, "CHANGE_THRESHOLD_PCT", "0.5")?;
        let adjustment_threshold_pct =
            non_negative_decimal(&env_map, "ADJUSTMENT_THRESHOLD_PCT", "10")?;

        let max_open_trades = parse_or(&env_map, "MAX_OPEN_TRADES", 10usize, "must be a valid usize")?;
        let min_stake = non_negative_decimal(&env_map, "MIN_STAKE", "10")?;
        let dust_usdc = non_negative_decimal(&env_map, "DUST_USDC", "0.51")?;

        let cooldown_secs: u64 =
            parse_or(&env_map, "ADJUSTMENT_COOLDOWN_SECS", 120, "must be a valid u64")?;

        let whitelist = Whitelist::from_pairs(
            env_map
                .get("WHITELIST")
                .map(|s| s.as_str())
                .unwrap_or("*")
                .split(','),
        );

        let whitelist_url = env_map
            .get("WHITELIST_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let pair_suffix = env_map
            .get("PAIR_SUFFIX")
            .cloned()
            .unwrap_or_else(|| "/USDC:USDC".to_string());

        let max_pairs = parse_or(&env_map, "MAX_PAIRS", 50usize, "must be a valid usize")?;

        Ok(Config {
            port,
            hyperliquid_api_url,
            data_dir,
            tracked_address,
            local_address,
            poll_interval: Duration::from_secs(poll_secs),
            copy_mode,
            leverage,
            max_leverage,
            copy_leverage,
            change_threshold_pct,
            adjustment_threshold_pct,
            max_open_trades,
            min_stake,
            dust_usdc,
            adjustment_cooldown: Duration::from_secs(cooldown_secs),
            whitelist,
            whitelist_url,
            pair_suffix,
            max_pairs,
        })
    }

    /// Engine parameters with percentages converted to fractions.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            thresholds: Thresholds::from_percent(
                self.change_threshold_pct,
                self.adjustment_threshold_pct,
            ),
            mode: self.copy_mode,
            sizing: SizingConfig {
                leverage: self.leverage,
                max_leverage: self.max_leverage,
                copy_leverage: self.copy_leverage,
                min_stake: self.min_stake,
                dust: self.dust_usdc,
            },
            max_open_trades: self.max_open_trades,
            adjustment_cooldown_ms: i64::try_from(self.adjustment_cooldown.as_millis())
                .unwrap_or(i64::MAX),
        }
    }
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    hint: &str,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), hint.to_string())),
    }
}

fn required_address(env_map: &HashMap<String, String>, key: &str) -> Result<Address, ConfigError> {
    let raw = env_map
        .get(key)
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))?;
    raw.parse::<Address>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn decimal(env_map: &HashMap<String, String>, key: &str, default: &str) -> Result<Decimal, ConfigError> {
    let raw = env_map.get(key).map(|s| s.as_str()).unwrap_or(default);
    Decimal::from_str_canonical(raw)
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), "must be a decimal".to_string()))
}

fn positive_decimal(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Decimal, ConfigError> {
    let value = decimal(env_map, key, default)?;
    if !value.is_positive() {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "must be greater than 0".to_string(),
        ));
    }
    Ok(value)
}

fn non_negative_decimal(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Decimal, ConfigError> {
    let value = decimal(env_map, key, default)?;
    if value.is_negative() {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(value)
}
