// src/tools/async_support.rs
//! Timeout helpers for network-bound futures.

use crate::core::errors::SweepError;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Timeout configuration for a single named operation
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    pub duration: Duration,
    pub operation_name: String,
}

impl TimeoutConfig {
    pub fn new(duration: Duration, operation_name: impl Into<String>) -> Self {
        Self { duration, operation_name: operation_name.into() }
    }
}

/// Run `future`, failing with `SweepError::Timeout` if it does not finish in time.
pub async fn execute_with_timeout<F, T>(future: F, config: TimeoutConfig) -> Result<T, SweepError>
where
    F: Future<Output = Result<T, SweepError>>,
{
    match timeout(config.duration, future).await {
        Ok(result) => result,
        Err(_) => Err(SweepError::Timeout(format!(
            "Operation '{}' timed out after {:?}",
            config.operation_name, config.duration
        ))),
    }
}
