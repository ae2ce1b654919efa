//! Mock data source for testing without network calls.

use super::{DataSourceError, SnapshotFetcher};
use crate::domain::{Address, PositionSnapshot};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

type Scripted = Result<Option<PositionSnapshot>, DataSourceError>;

/// Mock data source that replays scripted responses per address.
///
/// Each call pops the next response for the address; once the script is
/// exhausted it answers "nothing new".
#[derive(Debug, Default)]
pub struct MockDataSource {
    scripts: Mutex<HashMap<Address, VecDeque<Scripted>>>,
}

impl MockDataSource {
    /// Create a new mock data source with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a snapshot for its account.
    pub fn with_snapshot(self, snapshot: PositionSnapshot) -> Self {
        let address = snapshot.account.clone();
        self.push(address, Ok(Some(snapshot)));
        self
    }

    /// Queue a "nothing new" answer for `address`.
    pub fn with_no_data(self, address: Address) -> Self {
        self.push(address, Ok(None));
        self
    }

    /// Queue a failure for `address`.
    pub fn with_error(self, address: Address, error: DataSourceError) -> Self {
        self.push(address, Err(error));
        self
    }

    fn push(&self, address: Address, response: Scripted) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.entry(address).or_default().push_back(response);
        }
    }
}

#[async_trait]
impl SnapshotFetcher for MockDataSource {
    async fn fetch_snapshot(
        &self,
        address: &Address,
    ) -> Result<Option<PositionSnapshot>, DataSourceError> {
        let mut scripts = self
            .scripts
            .lock()
            .map_err(|e| DataSourceError::Other(e.to_string()))?;
        scripts
            .get_mut(address)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Ok(None))
    }
}
