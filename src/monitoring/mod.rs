use anyhow::Result;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::info;

use crate::core::domain::SweepOutcome;

/// Prometheus metrics for the sweep loop.
pub struct SweepMetrics {
    registry: Registry,

    pub cycles_started: IntCounter,
    pub cycles_skipped: IntCounter,
    pub accounts_checked: IntCounter,
    pub outcomes: IntCounterVec,
    pub cycle_duration: Histogram,
}

impl SweepMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let cycles_started = IntCounter::new("sweeper_cycles_total", "Total number of cycles started")?;
        let cycles_skipped = IntCounter::new(
            "sweeper_cycles_skipped_total",
            "Cycles skipped because account derivation failed",
        )?;
        let accounts_checked =
            IntCounter::new("sweeper_accounts_checked_total", "Total number of account checks")?;
        let outcomes = IntCounterVec::new(
            Opts::new("sweeper_outcomes_total", "Sweep outcomes by kind"),
            &["outcome"],
        )?;
        let cycle_duration = Histogram::with_opts(HistogramOpts::new(
            "sweeper_cycle_duration_seconds",
            "Wall time of one full cycle in seconds",
        ))?;

        registry.register(Box::new(cycles_started.clone()))?;
        registry.register(Box::new(cycles_skipped.clone()))?;
        registry.register(Box::new(accounts_checked.clone()))?;
        registry.register(Box::new(outcomes.clone()))?;
        registry.register(Box::new(cycle_duration.clone()))?;

        info!("Sweep metrics initialized");

        Ok(Self { registry, cycles_started, cycles_skipped, accounts_checked, outcomes, cycle_duration })
    }

    pub fn export_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        Ok(encoder.encode_to_string(&metric_families)?)
    }

    pub fn record_outcome(&self, outcome: &SweepOutcome) {
        self.outcomes.with_label_values(&[outcome.label()]).inc();
    }

    pub fn record_cycle(&self, seconds: f64) {
        self.cycle_duration.observe(seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_contains_recorded_outcomes() {
        let metrics = SweepMetrics::new().unwrap();
        metrics.cycles_started.inc();
        metrics.record_outcome(&SweepOutcome::NoFunds);
        metrics.record_outcome(&SweepOutcome::NoFunds);
        metrics.record_cycle(1.5);

        let text = metrics.export_metrics().unwrap();
        assert!(text.contains("sweeper_cycles_total 1"));
        assert!(text.contains("sweeper_outcomes_total{outcome=\"no_funds\"} 2"));
        assert!(text.contains("sweeper_cycle_duration_seconds_count 1"));
    }
}
