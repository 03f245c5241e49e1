//! Per-account check and transfer.

use ethers::types::{Address, U256};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::blockchain::traits::{ChainProvider, TransactionStatus, TRANSFER_GAS_UNITS};
use crate::core::domain::{Account, SweepOutcome};
use crate::storage::CounterHandle;
use crate::tools::async_support::{execute_with_timeout, TimeoutConfig};

/// Amount left after paying `fee_rate * TRANSFER_GAS_UNITS`, or `None` when
/// nothing would be left.
pub fn net_transfer_amount(balance: U256, fee_rate: U256) -> Option<U256> {
    let fee = fee_rate.checked_mul(U256::from(TRANSFER_GAS_UNITS))?;
    balance.checked_sub(fee).filter(|amount| !amount.is_zero())
}

/// Fixed parameters shared by every worker.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub destination: Address,
    pub request_timeout: Duration,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
}

pub struct SweepWorker {
    settings: WorkerSettings,
    counters: CounterHandle,
}

impl SweepWorker {
    pub fn new(settings: WorkerSettings, counters: CounterHandle) -> Self {
        Self { settings, counters }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    fn request(&self, name: &str) -> TimeoutConfig {
        TimeoutConfig::new(self.settings.request_timeout, name)
    }

    /// Check one account against its paired endpoint and sweep whatever it
    /// can. Every failure ends here as an outcome; nothing is retried.
    ///
    /// Takes the account by value: its key is dropped before this returns.
    pub async fn sweep(&self, account: Account, provider: &dyn ChainProvider) -> SweepOutcome {
        let index = account.index;

        // counted as an attempt, before any network traffic
        self.counters.record_check().await;

        let (balance, fee_rate) = tokio::join!(
            execute_with_timeout(provider.get_balance(account.address), self.request("get_balance")),
            execute_with_timeout(provider.get_fee_rate(), self.request("get_fee_rate")),
        );
        let (balance, fee_rate) = match (balance, fee_rate) {
            (Ok(b), Ok(f)) => (b, f),
            (Err(e), _) | (_, Err(e)) => {
                warn!(
                    index,
                    endpoint = provider.endpoint(),
                    error = %e,
                    network = e.is_network(),
                    "Balance check failed"
                );
                return SweepOutcome::CheckFailed;
            }
        };

        if balance.is_zero() {
            debug!(index, "No balance");
            return SweepOutcome::NoFunds;
        }

        info!(
            index,
            address = ?account.address,
            balance = %ethers::utils::format_ether(balance),
            "Found balance, attempting transfer"
        );

        let Some(amount) = net_transfer_amount(balance, fee_rate) else {
            info!(index, balance = %balance, fee_rate = %fee_rate, "Balance does not cover the transfer fee");
            return SweepOutcome::NoFunds;
        };

        let submitted = execute_with_timeout(
            provider.submit_transfer(&account.private_key, self.settings.destination, amount, fee_rate),
            self.request("submit_transfer"),
        )
        .await;
        // the key is not needed past submission
        drop(account);

        let tx_hash = match submitted {
            Ok(hash) => hash,
            Err(e) => {
                warn!(index, endpoint = provider.endpoint(), error = %e, "Transfer submission failed");
                return SweepOutcome::TransferFailed;
            }
        };
        info!(index, tx_hash = ?tx_hash, amount = %amount, "Transaction sent");

        let confirmation = execute_with_timeout(
            provider.wait_for_confirmation(tx_hash, self.settings.poll_interval),
            TimeoutConfig::new(self.settings.confirmation_timeout, "wait_for_confirmation"),
        )
        .await;

        match confirmation {
            Ok(TransactionStatus::Confirmed) => {
                self.counters.record_transfer().await;
                info!(
                    index,
                    tx_hash = ?tx_hash,
                    amount = %ethers::utils::format_ether(amount),
                    "Transaction confirmed"
                );
                SweepOutcome::TransferSucceeded { tx_hash, amount }
            }
            Ok(TransactionStatus::Failed) => {
                warn!(index, tx_hash = ?tx_hash, "Transaction reverted");
                SweepOutcome::TransferFailed
            }
            Err(e) => {
                warn!(index, tx_hash = ?tx_hash, error = %e, "Confirmation failed");
                SweepOutcome::TransferFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GWEI: u64 = 1_000_000_000;

    #[test]
    fn net_amount_subtracts_fixed_gas_cost() {
        let balance = U256::from(5_000_000_000_000_000u64);
        let amount = net_transfer_amount(balance, U256::from(GWEI)).unwrap();
        assert_eq!(amount, U256::from(4_979_000_000_000_000u64));
    }

    #[test]
    fn net_amount_none_below_fee() {
        assert_eq!(net_transfer_amount(U256::from(100u64), U256::from(GWEI)), None);
    }

    #[test]
    fn net_amount_none_when_exactly_fee() {
        let fee = U256::from(21_000u64 * GWEI);
        assert_eq!(net_transfer_amount(fee, U256::from(GWEI)), None);
    }

    #[test]
    fn net_amount_none_on_overflowing_fee() {
        assert_eq!(net_transfer_amount(U256::MAX, U256::MAX), None);
    }

    #[test]
    fn zero_fee_sweeps_everything() {
        assert_eq!(net_transfer_amount(U256::from(7u64), U256::zero()), Some(U256::from(7u64)));
    }
}
