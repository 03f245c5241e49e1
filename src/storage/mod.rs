//! Durable counters: the store abstraction, its backends, and the single
//! task that owns every counter mutation.

use async_trait::async_trait;

use crate::core::domain::Counters;
use crate::core::errors::SweepError;

mod counter_service;
mod http;
mod memory;
mod sqlite;

pub use counter_service::{CounterEvent, CounterHandle, CounterService};
pub use http::HttpCounterStore;
pub use memory::MemoryCounterStore;
pub use sqlite::SqliteCounterStore;

/// Key-value persistence for the two running counters.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Fetch the current durable record; zeros when none exists yet.
    async fn load(&self) -> Result<Counters, SweepError>;

    /// Upsert the full pair of values and return what was stored.
    async fn save(&self, counters: &Counters) -> Result<Counters, SweepError>;
}
