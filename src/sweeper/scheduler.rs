//! Periodic cycle driver.
//!
//! Cycles are strictly serialized; within a cycle every (account, endpoint)
//! pair runs as its own task and the cycle ends only once all of them have.

use ethers::types::U256;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use super::worker::SweepWorker;
use crate::blockchain::traits::ChainProvider;
use crate::core::derivation::AccountDeriver;
use crate::core::domain::SweepOutcome;
use crate::core::errors::SweepError;
use crate::monitoring::SweepMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick.
    Idle,
    /// One cycle in flight.
    Running,
}

/// Outcomes of one cycle, ordered by account index.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub outcomes: Vec<(usize, SweepOutcome)>,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn checked(&self) -> usize {
        self.outcomes.len()
    }

    pub fn swept(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, SweepOutcome::TransferFailed | SweepOutcome::CheckFailed))
            .count()
    }

    /// Sum of all confirmed transfer amounts, in wei.
    pub fn swept_amount(&self) -> U256 {
        self.outcomes.iter().fold(U256::zero(), |acc, (_, o)| match o {
            SweepOutcome::TransferSucceeded { amount, .. } => acc.saturating_add(*amount),
            _ => acc,
        })
    }
}

pub struct CycleScheduler {
    deriver: Arc<dyn AccountDeriver>,
    providers: Vec<Arc<dyn ChainProvider>>,
    worker: Arc<SweepWorker>,
    interval: Duration,
    metrics: Option<Arc<SweepMetrics>>,
    state: watch::Sender<SchedulerState>,
}

impl CycleScheduler {
    /// `providers[i]` is the endpoint for account `i`; the number of providers
    /// fixes the number of accounts derived per cycle.
    pub fn new(
        deriver: Arc<dyn AccountDeriver>,
        providers: Vec<Arc<dyn ChainProvider>>,
        worker: Arc<SweepWorker>,
        interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self { deriver, providers, worker, interval, metrics: None, state }
    }

    pub fn with_metrics(mut self, metrics: Arc<SweepMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    pub fn account_count(&self) -> usize {
        self.providers.len()
    }

    /// Run one cycle to completion.
    ///
    /// Returns `SweepError::Derivation` when no account set could be produced;
    /// the cycle is then skipped without touching any endpoint.
    pub async fn run_cycle(&self, cycle: u64) -> Result<CycleReport, SweepError> {
        let started = Instant::now();
        self.state.send_replace(SchedulerState::Running);
        if let Some(m) = &self.metrics {
            m.cycles_started.inc();
        }

        let result = self.sweep_all(cycle, started).await;

        self.state.send_replace(SchedulerState::Idle);
        if let Some(m) = &self.metrics {
            m.record_cycle(started.elapsed().as_secs_f64());
            if result.is_err() {
                m.cycles_skipped.inc();
            }
        }
        result
    }

    async fn sweep_all(&self, cycle: u64, started: Instant) -> Result<CycleReport, SweepError> {
        let count = self.providers.len();
        let deriver = self.deriver.clone();
        let accounts = tokio::task::spawn_blocking(move || deriver.derive_accounts(count))
            .await
            .map_err(|e| SweepError::Derivation(format!("Derivation task failed: {}", e)))?
            .map_err(|e| {
                error!(cycle, error = %e, "Account derivation failed, skipping cycle");
                e
            })?;

        if accounts.len() != count {
            error!(cycle, derived = accounts.len(), expected = count, "Incomplete account set, skipping cycle");
            return Err(SweepError::Derivation(format!(
                "Expected {} accounts, derived {}",
                count,
                accounts.len()
            )));
        }

        info!(cycle, accounts = count, "Cycle started");

        // Dropping the set (e.g. on shutdown) aborts every outstanding worker.
        let mut tasks = JoinSet::new();
        for (account, provider) in accounts.into_iter().zip(self.providers.iter().cloned()) {
            let worker = self.worker.clone();
            let index = account.index as usize;
            let span = info_span!("sweep", cycle, index, endpoint = %provider.endpoint());
            tasks.spawn(
                async move {
                    let outcome = worker.sweep(account, provider.as_ref()).await;
                    (index, outcome)
                }
                .instrument(span),
            );
        }

        let mut outcomes = Vec::with_capacity(count);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(pair) => outcomes.push(pair),
                Err(e) => error!(cycle, error = %e, "Sweep task did not complete"),
            }
        }

        // a panicked task still counts as one failed check
        let seen: HashSet<usize> = outcomes.iter().map(|(i, _)| *i).collect();
        for index in (0..count).filter(|i| !seen.contains(i)) {
            outcomes.push((index, SweepOutcome::CheckFailed));
        }
        outcomes.sort_by_key(|(i, _)| *i);

        if let Some(m) = &self.metrics {
            for (_, outcome) in &outcomes {
                m.accounts_checked.inc();
                m.record_outcome(outcome);
            }
        }

        let report = CycleReport { cycle, outcomes, elapsed: started.elapsed() };
        info!(
            cycle,
            checked = report.checked(),
            swept = report.swept(),
            failed = report.failed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Cycle finished"
        );
        Ok(report)
    }

    /// A single cycle, outside the periodic loop.
    pub async fn run_once(&self) -> Result<CycleReport, SweepError> {
        self.run_cycle(1).await
    }

    /// Run cycles on the fixed period until `shutdown` is cancelled.
    ///
    /// A tick that comes due while a cycle is still running is delayed, never
    /// overlapped. Cancelling during a cycle aborts its outstanding workers;
    /// a transfer already broadcast is not recalled, only left uncounted.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycle: u64 = 0;

        info!(interval_secs = self.interval.as_secs(), accounts = self.providers.len(), "Scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            cycle += 1;
            tokio::select! {
                _ = shutdown.cancelled() => {
                    warn!(cycle, "Shutdown requested, aborting in-flight cycle");
                    break;
                }
                result = self.run_cycle(cycle) => {
                    if let Err(e) = result {
                        warn!(cycle, error = %e, fatal = e.is_cycle_fatal(), "Cycle skipped");
                    }
                }
            }
        }

        self.state.send_replace(SchedulerState::Idle);
        info!("Scheduler stopped");
    }
}
