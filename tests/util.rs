// tests/util.rs
// Shared helpers for the integration tests: an in-process chain provider and
// derivers with predictable behaviour.
#![allow(dead_code)]

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, TxHash, U256};
use hd_sweeper::blockchain::traits::{ChainProvider, TransactionStatus};
use hd_sweeper::core::derivation::{derive_accounts_from, AccountDeriver, SeedPhrase};
use hd_sweeper::core::domain::{Account, Counters, PrivateKey};
use hd_sweeper::core::errors::SweepError;
use hd_sweeper::storage::CounterStore;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Well-known test mnemonic; index 0 is 0x9858EfFD232B4033E47d90003D41EC34EcaEda94.
pub const TEST_PHRASE: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

pub const GWEI: u64 = 1_000_000_000;

pub fn destination() -> Address {
    "0x742d35Cc6634C0532925a3b844Bc454e4438f44e".parse().unwrap()
}

/// A transfer handed to `FakeProvider::submit_transfer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub gas_price: U256,
}

/// How the fake answers `wait_for_confirmation`.
#[derive(Debug, Clone, Copy)]
pub enum Confirmation {
    Status(TransactionStatus),
    Error,
    /// Never returns; exercises the confirmation timeout.
    Hang,
}

/// Counts balance queries currently in flight across a set of providers.
#[derive(Debug, Default)]
pub struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct GaugeGuard(Arc<Gauge>);

impl GaugeGuard {
    fn enter(gauge: &Arc<Gauge>) -> Self {
        let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
        gauge.peak.fetch_max(now, Ordering::SeqCst);
        Self(gauge.clone())
    }
}

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Scripted `ChainProvider`. `None` balance or fee means the call fails.
pub struct FakeProvider {
    name: String,
    balance: Option<U256>,
    fee_rate: Option<U256>,
    submit_fails: bool,
    confirmation: Confirmation,
    balance_delay: Option<Duration>,
    gauge: Option<Arc<Gauge>>,
    balance_queries: Mutex<Vec<Address>>,
    submitted: Mutex<Vec<Submitted>>,
}

impl FakeProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            balance: Some(U256::zero()),
            fee_rate: Some(U256::from(GWEI)),
            submit_fails: false,
            confirmation: Confirmation::Status(TransactionStatus::Confirmed),
            balance_delay: None,
            gauge: None,
            balance_queries: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_balance(mut self, wei: u64) -> Self {
        self.balance = Some(U256::from(wei));
        self
    }

    pub fn with_fee_rate(mut self, wei: u64) -> Self {
        self.fee_rate = Some(U256::from(wei));
        self
    }

    pub fn failing_balance(mut self) -> Self {
        self.balance = None;
        self
    }

    pub fn failing_fee(mut self) -> Self {
        self.fee_rate = None;
        self
    }

    pub fn failing_submit(mut self) -> Self {
        self.submit_fails = true;
        self
    }

    pub fn with_confirmation(mut self, confirmation: Confirmation) -> Self {
        self.confirmation = confirmation;
        self
    }

    /// Balance queries take `delay` before answering.
    pub fn with_balance_delay(mut self, delay: Duration) -> Self {
        self.balance_delay = Some(delay);
        self
    }

    pub fn with_gauge(mut self, gauge: Arc<Gauge>) -> Self {
        self.gauge = Some(gauge);
        self
    }

    pub fn balance_queries(&self) -> Vec<Address> {
        self.balance_queries.lock().clone()
    }

    pub fn submitted(&self) -> Vec<Submitted> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl ChainProvider for FakeProvider {
    fn endpoint(&self) -> &str {
        &self.name
    }

    async fn get_balance(&self, address: Address) -> Result<U256, SweepError> {
        self.balance_queries.lock().push(address);
        let _in_flight = self.gauge.as_ref().map(GaugeGuard::enter);
        if let Some(delay) = self.balance_delay {
            tokio::time::sleep(delay).await;
        }
        self.balance.ok_or_else(|| SweepError::BalanceQuery(format!("{}: unreachable", self.name)))
    }

    async fn get_fee_rate(&self) -> Result<U256, SweepError> {
        self.fee_rate.ok_or_else(|| SweepError::FeeQuery(format!("{}: unreachable", self.name)))
    }

    async fn submit_transfer(
        &self,
        private_key: &PrivateKey,
        to: Address,
        amount: U256,
        gas_price: U256,
    ) -> Result<TxHash, SweepError> {
        if self.submit_fails {
            return Err(SweepError::TransferSubmission("rejected".to_string()));
        }
        let from = private_key
            .with_secret(|bytes| LocalWallet::from_bytes(bytes))
            .map_err(|e| SweepError::TransferSubmission(e.to_string()))?
            .address();
        let mut submitted = self.submitted.lock();
        submitted.push(Submitted { from, to, amount, gas_price });
        Ok(TxHash::from_low_u64_be(submitted.len() as u64))
    }

    async fn wait_for_confirmation(
        &self,
        _tx_hash: TxHash,
        _poll_interval: Duration,
    ) -> Result<TransactionStatus, SweepError> {
        match self.confirmation {
            Confirmation::Status(status) => Ok(status),
            Confirmation::Error => Err(SweepError::Confirmation("receipt lookup failed".to_string())),
            Confirmation::Hang => std::future::pending().await,
        }
    }
}

/// Derives from a fixed phrase so tests know every address in advance.
pub struct FixedDeriver {
    seed: SeedPhrase,
    pub calls: AtomicUsize,
}

impl FixedDeriver {
    pub fn new() -> Self {
        Self { seed: SeedPhrase::from_phrase(TEST_PHRASE).unwrap(), calls: AtomicUsize::new(0) }
    }

    pub fn expected(&self, count: usize) -> Vec<Account> {
        derive_accounts_from(&self.seed, count).unwrap()
    }
}

impl AccountDeriver for FixedDeriver {
    fn derive_accounts(&self, count: usize) -> Result<Vec<Account>, SweepError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        derive_accounts_from(&self.seed, count)
    }
}

/// Fails the first `failures` calls, then behaves like `FixedDeriver`.
pub struct FlakyDeriver {
    inner: FixedDeriver,
    failures: usize,
}

impl FlakyDeriver {
    pub fn new(failures: usize) -> Self {
        Self { inner: FixedDeriver::new(), failures }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

impl AccountDeriver for FlakyDeriver {
    fn derive_accounts(&self, count: usize) -> Result<Vec<Account>, SweepError> {
        let call = self.inner.calls.load(Ordering::SeqCst);
        if call < self.failures {
            self.inner.calls.fetch_add(1, Ordering::SeqCst);
            return Err(SweepError::Derivation("entropy source unavailable".to_string()));
        }
        self.inner.derive_accounts(count)
    }
}

/// `FixedDeriver` that notes every call made while balance queries of an
/// earlier cycle were still running.
pub struct OverlapDeriver {
    inner: FixedDeriver,
    gauge: Arc<Gauge>,
    overlaps: AtomicUsize,
}

impl OverlapDeriver {
    pub fn new(gauge: Arc<Gauge>) -> Self {
        Self { inner: FixedDeriver::new(), gauge, overlaps: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }
}

impl AccountDeriver for OverlapDeriver {
    fn derive_accounts(&self, count: usize) -> Result<Vec<Account>, SweepError> {
        if self.gauge.current() > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.derive_accounts(count)
    }
}

/// Counter store whose every save takes `delay`.
pub struct SlowCounterStore {
    delay: Duration,
    saved: Mutex<Vec<Counters>>,
}

impl SlowCounterStore {
    pub fn new(delay: Duration) -> Self {
        Self { delay, saved: Mutex::new(Vec::new()) }
    }

    pub fn saved(&self) -> Vec<Counters> {
        self.saved.lock().clone()
    }
}

#[async_trait]
impl CounterStore for SlowCounterStore {
    async fn load(&self) -> Result<Counters, SweepError> {
        Ok(Counters::default())
    }

    async fn save(&self, counters: &Counters) -> Result<Counters, SweepError> {
        tokio::time::sleep(self.delay).await;
        self.saved.lock().push(*counters);
        Ok(*counters)
    }
}
