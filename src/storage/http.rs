//! Client for the remote counter API.
//!
//! `GET {url}` returns the stored record (or `null` before the first write);
//! `POST {url}` upserts the full pair and echoes the stored record back.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::CounterStore;
use crate::core::domain::Counters;
use crate::core::errors::SweepError;

/// POST body. The counts service reads the check counter as `countNumber`;
/// `checkCount` is sent alongside for readers of the current field name.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveBody {
    check_count: u64,
    count_number: u64,
    transfer_count: u64,
}

impl From<&Counters> for SaveBody {
    fn from(c: &Counters) -> Self {
        Self { check_count: c.check_count, count_number: c.check_count, transfer_count: c.transfer_count }
    }
}

#[derive(Debug, Clone)]
pub struct HttpCounterStore {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl HttpCounterStore {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, SweepError> {
        let url = reqwest::Url::parse(url.trim())
            .map_err(|e| SweepError::Config(format!("Invalid counters url '{}': {}", url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SweepError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl CounterStore for HttpCounterStore {
    async fn load(&self) -> Result<Counters, SweepError> {
        let counters = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<Option<Counters>>()
            .await?
            .unwrap_or_default();
        debug!(?counters, "Fetched counters");
        Ok(counters)
    }

    async fn save(&self, counters: &Counters) -> Result<Counters, SweepError> {
        let stored = self
            .client
            .post(self.url.clone())
            .json(&SaveBody::from(counters))
            .send()
            .await?
            .error_for_status()?
            .json::<Counters>()
            .await?;
        Ok(stored)
    }
}
