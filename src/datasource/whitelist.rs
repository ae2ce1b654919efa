//! Whitelist providers: a fixed list from configuration or a remote pairlist.

use super::{DataSourceError, WhitelistProvider};
use crate::domain::Whitelist;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Whitelist fixed at start-up.
#[derive(Debug, Clone)]
pub struct StaticWhitelist {
    whitelist: Whitelist,
}

impl StaticWhitelist {
    pub fn new(whitelist: Whitelist) -> Self {
        Self { whitelist }
    }

    /// Allow every coin.
    pub fn all() -> Self {
        Self::new(Whitelist::All)
    }
}

#[async_trait]
impl WhitelistProvider for StaticWhitelist {
    async fn fetch_whitelist(&self) -> Result<Whitelist, DataSourceError> {
        Ok(self.whitelist.clone())
    }
}

#[derive(Debug, Deserialize)]
struct PairlistResponse {
    pairs: Vec<String>,
}

/// Whitelist read from a pairlist endpoint serving `{"pairs": [...]}`.
#[derive(Debug, Clone)]
pub struct RemotePairlist {
    client: Client,
    url: String,
}

impl RemotePairlist {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }
}

#[async_trait]
impl WhitelistProvider for RemotePairlist {
    async fn fetch_whitelist(&self) -> Result<Whitelist, DataSourceError> {
        debug!("Fetching pairlist from {}", self.url);

        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let body = retry(backoff, || async {
            let response = self.client.get(&self.url).send().await.map_err(|e| {
                backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status == 429 {
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
                .json::<PairlistResponse>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await?;

        Ok(Whitelist::from_pairs(body.pairs))
    }
}
