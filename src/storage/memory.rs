// In-process counter store, used for dry runs and tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::CounterStore;
use crate::core::domain::Counters;
use crate::core::errors::SweepError;

#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    current: Mutex<Counters>,
    saved: Mutex<Vec<Counters>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counters(counters: Counters) -> Self {
        Self { current: Mutex::new(counters), ..Self::default() }
    }

    /// Make subsequent loads fail with `SweepError::Persistence`.
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent saves fail with `SweepError::Persistence`.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Last successfully stored value.
    pub fn current(&self) -> Counters {
        *self.current.lock()
    }

    /// Every successfully stored value, oldest first.
    pub fn saved(&self) -> Vec<Counters> {
        self.saved.lock().clone()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn load(&self) -> Result<Counters, SweepError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(SweepError::Persistence("simulated load failure".to_string()));
        }
        Ok(self.current())
    }

    async fn save(&self, counters: &Counters) -> Result<Counters, SweepError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(SweepError::Persistence("simulated save failure".to_string()));
        }
        *self.current.lock() = *counters;
        self.saved.lock().push(*counters);
        Ok(*counters)
    }
}
