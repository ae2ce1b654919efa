//! Row-oriented CSV history in a data directory.
//!
//! - `positions_history.csv` (append): tracked positions of coins that changed
//! - `changes_log.csv` (append): one row per change event
//! - `decisions_log.csv` (append): one row per emitted intent
//! - `last_positions.csv` (overwrite): the current tracked snapshot

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{HistorySink, PersistenceError};
use crate::domain::{Address, Coin, Decimal, Position, PositionSnapshot, TimeMs};
use crate::orchestration::cycle::CycleOutcome;

pub const POSITIONS_HISTORY_FILE: &str = "positions_history.csv";
pub const CHANGES_LOG_FILE: &str = "changes_log.csv";
pub const DECISIONS_LOG_FILE: &str = "decisions_log.csv";
pub const LAST_POSITIONS_FILE: &str = "last_positions.csv";

#[derive(Debug, Serialize, Deserialize)]
struct PositionRow {
    coin: String,
    size: String,
    entry_price: String,
    position_value: String,
    unrealized_pnl: String,
    leverage: String,
    margin_used: String,
    account_value: String,
    timestamp: i64,
    human_time: String,
}

impl PositionRow {
    fn new(position: &Position, snapshot: &PositionSnapshot) -> Self {
        Self {
            coin: position.coin.to_string(),
            size: position.signed_size.to_canonical_string(),
            entry_price: position.entry_price.to_canonical_string(),
            position_value: position.notional_value.to_canonical_string(),
            unrealized_pnl: position.unrealized_pnl.to_canonical_string(),
            leverage: position.leverage.to_canonical_string(),
            margin_used: position.margin_used.to_canonical_string(),
            account_value: snapshot.account_value.to_canonical_string(),
            timestamp: snapshot.timestamp.as_ms(),
            human_time: snapshot.timestamp.to_human(),
        }
    }

    fn closed(coin: &Coin, snapshot: &PositionSnapshot) -> Self {
        let zero = Decimal::zero().to_canonical_string();
        Self {
            coin: coin.to_string(),
            size: zero.clone(),
            entry_price: zero.clone(),
            position_value: zero.clone(),
            unrealized_pnl: zero.clone(),
            leverage: zero.clone(),
            margin_used: zero,
            account_value: snapshot.account_value.to_canonical_string(),
            timestamp: snapshot.timestamp.as_ms(),
            human_time: snapshot.timestamp.to_human(),
        }
    }

    fn to_position(&self) -> Result<Position, PersistenceError> {
        let num = |field: &str, value: &str| {
            Decimal::from_str_canonical(value).map_err(|e| PersistenceError::Parse {
                file: LAST_POSITIONS_FILE.to_string(),
                reason: format!("{} for {}: {}", field, self.coin, e),
            })
        };
        Ok(Position::new(
            Coin::new(self.coin.as_str()),
            num("size", &self.size)?,
            num("entry_price", &self.entry_price)?,
            num("position_value", &self.position_value)?,
            num("leverage", &self.leverage)?,
        )
        .with_pnl(
            num("unrealized_pnl", &self.unrealized_pnl)?,
            num("margin_used", &self.margin_used)?,
        ))
    }
}

#[derive(Debug, Serialize)]
struct ChangeRow {
    coin: String,
    change_type: &'static str,
    old_size: String,
    new_size: String,
    old_position_value: String,
    new_position_value: String,
    timestamp: i64,
    human_time: String,
}

#[derive(Debug, Serialize)]
struct DecisionRow {
    key: String,
    coin: String,
    action: &'static str,
    priority: u8,
    notional_delta: String,
    stake: String,
    leverage: String,
    reason: &'static str,
    timestamp: i64,
    human_time: String,
}

fn opt(value: Option<Decimal>) -> String {
    value.map(|v| v.to_canonical_string()).unwrap_or_default()
}

/// CSV files under one directory, created on `open`.
#[derive(Debug, Clone)]
pub struct CsvHistorySink {
    dir: PathBuf,
}

impl CsvHistorySink {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append<R: Serialize>(&self, file: &str, rows: &[R]) -> Result<(), PersistenceError> {
        if rows.is_empty() {
            return Ok(());
        }
        let path = self.dir.join(file);
        let handle = OpenOptions::new().create(true).append(true).open(&path)?;
        let is_new = handle.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(handle);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        debug!("Appended {} rows to {}", rows.len(), path.display());
        Ok(())
    }

    fn overwrite_last(&self, snapshot: &PositionSnapshot) -> Result<(), PersistenceError> {
        let path = self.dir.join(LAST_POSITIONS_FILE);
        let mut writer = csv::Writer::from_writer(File::create(&path)?);
        for position in snapshot.positions() {
            writer.serialize(PositionRow::new(position, snapshot))?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl HistorySink for CsvHistorySink {
    fn record_cycle(
        &self,
        outcome: &CycleOutcome,
        tracked: &PositionSnapshot,
    ) -> Result<(), PersistenceError> {
        let history: Vec<PositionRow> = outcome
            .changes
            .iter()
            .map(|change| match tracked.get(&change.coin) {
                Some(position) => PositionRow::new(position, tracked),
                None => PositionRow::closed(&change.coin, tracked),
            })
            .collect();
        self.append(POSITIONS_HISTORY_FILE, &history)?;

        let changes: Vec<ChangeRow> = outcome
            .changes
            .iter()
            .map(|change| ChangeRow {
                coin: change.coin.to_string(),
                change_type: change.kind.as_str(),
                old_size: opt(change.old_size),
                new_size: change.new_size.to_canonical_string(),
                old_position_value: opt(change.old_notional),
                new_position_value: change.new_notional.to_canonical_string(),
                timestamp: change.timestamp.as_ms(),
                human_time: change.timestamp.to_human(),
            })
            .collect();
        self.append(CHANGES_LOG_FILE, &changes)?;

        let decisions: Vec<DecisionRow> = outcome
            .intents
            .iter()
            .map(|intent| DecisionRow {
                key: intent.key.clone(),
                coin: intent.coin.to_string(),
                action: intent.action.as_str(),
                priority: intent.priority,
                notional_delta: intent.notional_delta.to_canonical_string(),
                stake: intent.stake.to_canonical_string(),
                leverage: intent.leverage.to_canonical_string(),
                reason: intent.reason.as_str(),
                timestamp: outcome.timestamp.as_ms(),
                human_time: outcome.timestamp.to_human(),
            })
            .collect();
        self.append(DECISIONS_LOG_FILE, &decisions)?;

        self.overwrite_last(tracked)
    }

    /// An empty or missing `last_positions.csv` yields `None`: a flat
    /// account restores the same way as a cold start.
    fn load_last_snapshot(
        &self,
        account: &Address,
    ) -> Result<Option<PositionSnapshot>, PersistenceError> {
        let path = self.dir.join(LAST_POSITIONS_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let mut positions = Vec::new();
        let mut header: Option<(Decimal, TimeMs)> = None;
        for record in reader.deserialize::<PositionRow>() {
            let row = record?;
            if header.is_none() {
                let value = Decimal::from_str_canonical(&row.account_value).map_err(|e| {
                    PersistenceError::Parse {
                        file: LAST_POSITIONS_FILE.to_string(),
                        reason: format!("account_value: {}", e),
                    }
                })?;
                header = Some((value, TimeMs::new(row.timestamp)));
            }
            positions.push(row.to_position()?);
        }

        let Some((account_value, timestamp)) = header else {
            return Ok(None);
        };
        Ok(Some(PositionSnapshot::new(
            account.clone(),
            account_value,
            timestamp,
            positions,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Whitelist;
    use crate::engine::EngineConfig;
    use crate::orchestration::cycle::{step, CopyState, Observation};
    use tempfile::TempDir;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn snapshot(addr: &str, value: &str, ts: i64, positions: Vec<Position>) -> PositionSnapshot {
        PositionSnapshot::new(Address::new(addr.to_string()), d(value), TimeMs::new(ts), positions)
            .unwrap()
    }

    fn btc(size: &str, value: &str) -> Position {
        Position::new(Coin::new("BTC"), d(size), d("50000"), d(value), d("5"))
            .with_pnl(d("-12.5"), d("2000"))
    }

    fn outcome(tracked: PositionSnapshot, previous: Option<PositionSnapshot>) -> CycleOutcome {
        let mut state = CopyState::new(tracked.account.clone(), Address::new("0xbbb".into()));
        state.tracked = previous;
        let obs = Observation {
            tracked: Some(tracked.clone()),
            local: Some(snapshot("0xbbb", "1000", tracked.timestamp.as_ms(), vec![])),
            whitelist: Whitelist::All,
        };
        step(&state, obs, &EngineConfig::default()).unwrap().1
    }

    fn lines(dir: &Path, file: &str) -> Vec<String> {
        fs::read_to_string(dir.join(file))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_record_cycle_writes_all_files() {
        let tmp = TempDir::new().unwrap();
        let sink = CsvHistorySink::open(tmp.path().join("data")).unwrap();

        let tracked = snapshot("0xaaa", "100000", 0, vec![btc("0.2", "10000")]);
        sink.record_cycle(&outcome(tracked.clone(), None), &tracked).unwrap();

        let changes = lines(sink.dir(), CHANGES_LOG_FILE);
        assert_eq!(
            changes[0],
            "coin,change_type,old_size,new_size,old_position_value,new_position_value,timestamp,human_time"
        );
        assert_eq!(changes[1], "BTC,opened_long,,0.2,,10000,0,1970-01-01 00:00:00");

        let history = lines(sink.dir(), POSITIONS_HISTORY_FILE);
        assert_eq!(history.len(), 2);
        assert!(history[1].starts_with("BTC,0.2,50000,10000,-12.5,5,2000,100000,0,"));

        let decisions = lines(sink.dir(), DECISIONS_LOG_FILE);
        assert_eq!(decisions.len(), 2);
        assert!(decisions[1].contains(",BTC,enter_long,4,100,"));
        assert!(decisions[1].contains(",tracked_opened,"));

        assert_eq!(lines(sink.dir(), LAST_POSITIONS_FILE).len(), 2);
    }

    #[test]
    fn test_history_appends_and_last_positions_overwrites() {
        let tmp = TempDir::new().unwrap();
        let sink = CsvHistorySink::open(tmp.path()).unwrap();

        let first = snapshot("0xaaa", "100000", 1_000, vec![btc("0.2", "10000")]);
        sink.record_cycle(&outcome(first.clone(), None), &first).unwrap();

        let second = snapshot("0xaaa", "100000", 2_000, vec![]);
        sink.record_cycle(&outcome(second.clone(), Some(first)), &second)
            .unwrap();

        let changes = lines(sink.dir(), CHANGES_LOG_FILE);
        assert_eq!(changes.len(), 3, "one header, two appended rows");
        assert!(changes[2].starts_with("BTC,closed,0.2,0,10000,0,2000,"));

        let history = lines(sink.dir(), POSITIONS_HISTORY_FILE);
        assert!(history[2].starts_with("BTC,0,0,0,0,0,0,100000,2000,"));

        // Flat account: header only, restores as nothing.
        assert_eq!(lines(sink.dir(), LAST_POSITIONS_FILE).len(), 1);
        assert!(sink
            .load_last_snapshot(&Address::new("0xaaa".into()))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_load_last_snapshot_round_trips_fields() {
        let tmp = TempDir::new().unwrap();
        let sink = CsvHistorySink::open(tmp.path()).unwrap();
        let account = Address::new("0xaaa".into());
        assert!(sink.load_last_snapshot(&account).unwrap().is_none());

        let eth = Position::new(Coin::new("ETH"), d("-3"), d("3000"), d("9000"), d("10"));
        let tracked = snapshot("0xaaa", "2054213.79", 7_000, vec![btc("0.2", "10000"), eth]);
        sink.record_cycle(&outcome(tracked.clone(), None), &tracked).unwrap();

        let restored = sink.load_last_snapshot(&account).unwrap().unwrap();
        assert_eq!(restored, tracked);
    }
}
