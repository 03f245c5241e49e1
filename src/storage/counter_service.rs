use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::CounterStore;
use crate::core::domain::Counters;

const COMMAND_BUFFER: usize = 1024;

/// Something worth counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterEvent {
    CheckPerformed,
    TransferSucceeded,
}

struct CounterCommand {
    event: CounterEvent,
    ack: oneshot::Sender<Counters>,
}

/// Counters tagged with the number of events applied so far.
#[derive(Debug, Clone, Copy, Default)]
struct Tracked {
    version: u64,
    counters: Counters,
}

/// Cloneable front end of the counter task.
#[derive(Clone)]
pub struct CounterHandle {
    tx: mpsc::Sender<CounterCommand>,
    snapshot: watch::Receiver<Counters>,
    tracked: watch::Receiver<Tracked>,
    persisted: watch::Receiver<u64>,
}

impl CounterHandle {
    /// Apply `event` and return the new in-memory values, or `None` if the
    /// task is gone. Returns as soon as the increment is applied; the store
    /// write happens in the background.
    pub async fn record(&self, event: CounterEvent) -> Option<Counters> {
        let (ack, rx) = oneshot::channel();
        if self.tx.send(CounterCommand { event, ack }).await.is_err() {
            warn!(?event, "Counter task stopped; event dropped");
            return None;
        }
        rx.await.ok()
    }

    pub async fn record_check(&self) -> Option<Counters> {
        self.record(CounterEvent::CheckPerformed).await
    }

    pub async fn record_transfer(&self) -> Option<Counters> {
        self.record(CounterEvent::TransferSucceeded).await
    }

    /// Wait until every event recorded so far has had a store write
    /// attempted, successful or not.
    pub async fn flush(&self) {
        let target = self.tracked.borrow().version;
        let mut persisted = self.persisted.clone();
        // errors only once the task is gone, and then nothing is pending
        let _ = persisted.wait_for(|done| *done >= target).await;
    }

    /// Latest in-memory values.
    pub fn snapshot(&self) -> Counters {
        *self.snapshot.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Counters> {
        self.snapshot.clone()
    }
}

/// Owns the counters. All increments go through one task, so concurrent
/// workers never race on a read-modify-write of the durable record.
///
/// Writes are coalesced: the store always receives the latest full pair,
/// and a slow or failing store never delays an acknowledgement.
pub struct CounterService {
    tracked: Tracked,
    snapshot: watch::Sender<Counters>,
    updates: watch::Sender<Tracked>,
}

impl CounterService {
    /// Load the durable counters once and spawn the owning task.
    ///
    /// A failed load is logged and the counters start from zero.
    pub async fn start(store: Arc<dyn CounterStore>) -> (CounterHandle, JoinHandle<()>) {
        let counters = match store.load().await {
            Ok(c) => {
                info!(check_count = c.check_count, transfer_count = c.transfer_count, "Loaded counters");
                c
            }
            Err(e) => {
                warn!(error = %e, "Failed to load counters, starting from zero");
                Counters::default()
            }
        };

        let tracked = Tracked { version: 0, counters };
        let (snapshot_tx, snapshot_rx) = watch::channel(counters);
        let (updates_tx, updates_rx) = watch::channel(tracked);
        let (persisted_tx, persisted_rx) = watch::channel(0u64);
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);

        let service = CounterService { tracked, snapshot: snapshot_tx, updates: updates_tx };
        let writer = persist_latest(store, updates_rx.clone(), persisted_tx);
        let task = tokio::spawn(async move {
            tokio::join!(service.run(rx), writer);
        });

        let handle = CounterHandle { tx, snapshot: snapshot_rx, tracked: updates_rx, persisted: persisted_rx };
        (handle, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<CounterCommand>) {
        while let Some(cmd) = rx.recv().await {
            self.apply(cmd.event);
            self.snapshot.send_replace(self.tracked.counters);
            self.updates.send_replace(self.tracked);
            // sender may have been cancelled
            let _ = cmd.ack.send(self.tracked.counters);
        }
        debug!("Counter task stopped");
    }

    fn apply(&mut self, event: CounterEvent) {
        let counters = &mut self.tracked.counters;
        match event {
            CounterEvent::CheckPerformed => counters.check_count = counters.check_count.saturating_add(1),
            CounterEvent::TransferSucceeded => {
                counters.transfer_count = counters.transfer_count.saturating_add(1)
            }
        }
        self.tracked.version += 1;
    }
}

/// Write the newest counters whenever they change; intermediate values that
/// were superseded while a write was in flight are skipped.
async fn persist_latest(
    store: Arc<dyn CounterStore>,
    mut updates: watch::Receiver<Tracked>,
    persisted: watch::Sender<u64>,
) {
    let mut written = updates.borrow_and_update().version;
    loop {
        let closed = updates.changed().await.is_err();
        let latest = *updates.borrow_and_update();
        if latest.version > written {
            if let Err(e) = store.save(&latest.counters).await {
                // in-memory values stay authoritative; the next successful save catches up
                warn!(error = %e, "Failed to persist counters");
            }
            written = latest.version;
            persisted.send_replace(written);
        }
        if closed {
            break;
        }
    }
    debug!(version = written, "Counter writer stopped");
}
