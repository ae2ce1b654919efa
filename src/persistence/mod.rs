//! History sinks: consumers of cycle outcomes, kept apart from decision logic.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use crate::domain::{Address, PositionSnapshot};
use crate::error::EngineError;
use crate::orchestration::cycle::CycleOutcome;

pub mod csv_sink;

pub use csv_sink::CsvHistorySink;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(String),
    #[error("invalid value in {file}: {reason}")]
    Parse { file: String, reason: String },
    #[error("stored snapshot is invalid: {0}")]
    InvalidSnapshot(#[from] EngineError),
}

impl From<csv::Error> for PersistenceError {
    fn from(err: csv::Error) -> Self {
        PersistenceError::Csv(err.to_string())
    }
}

/// Append-only history plus the overwrite-in-place current snapshot.
pub trait HistorySink: Send + Sync + fmt::Debug {
    /// Record one successful cycle. `tracked` is the snapshot the cycle used.
    fn record_cycle(
        &self,
        outcome: &CycleOutcome,
        tracked: &PositionSnapshot,
    ) -> Result<(), PersistenceError>;

    /// The last tracked snapshot written, if any, attributed to `account`.
    fn load_last_snapshot(
        &self,
        account: &Address,
    ) -> Result<Option<PositionSnapshot>, PersistenceError>;
}

/// In-memory sink for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    outcomes: Vec<CycleOutcome>,
    last: Option<PositionSnapshot>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcomes recorded so far, oldest first.
    pub fn outcomes(&self) -> Result<Vec<CycleOutcome>, PersistenceError> {
        Ok(self.lock()?.outcomes.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryInner>, PersistenceError> {
        self.inner
            .lock()
            .map_err(|e| PersistenceError::Io(std::io::Error::other(e.to_string())))
    }
}

impl HistorySink for MemorySink {
    fn record_cycle(
        &self,
        outcome: &CycleOutcome,
        tracked: &PositionSnapshot,
    ) -> Result<(), PersistenceError> {
        let mut inner = self.lock()?;
        inner.outcomes.push(outcome.clone());
        inner.last = Some(tracked.clone());
        Ok(())
    }

    fn load_last_snapshot(
        &self,
        _account: &Address,
    ) -> Result<Option<PositionSnapshot>, PersistenceError> {
        Ok(self.lock()?.last.clone())
    }
}
