use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};
use std::time::Duration;

use crate::core::domain::PrivateKey;
use crate::core::errors::SweepError;

/// Gas consumed by a plain value transfer with no calldata.
pub const TRANSFER_GAS_UNITS: u64 = 21_000;

/// Final status of a mined transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Confirmed,
    /// Mined but reverted.
    Failed,
}

/// The operations the sweeper needs from one network endpoint.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Endpoint this provider talks to, for logs.
    fn endpoint(&self) -> &str;

    /// Current balance of `address`, in wei.
    async fn get_balance(&self, address: Address) -> Result<U256, SweepError>;

    /// Current fee per unit of gas, in wei.
    async fn get_fee_rate(&self) -> Result<U256, SweepError>;

    /// Sign locally and broadcast a plain transfer of `amount` wei to `to`,
    /// paying exactly `gas_price` per gas for `TRANSFER_GAS_UNITS` gas.
    async fn submit_transfer(
        &self,
        private_key: &PrivateKey,
        to: Address,
        amount: U256,
        gas_price: U256,
    ) -> Result<TxHash, SweepError>;

    /// Wait until the transaction is mined and report its status.
    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        poll_interval: Duration,
    ) -> Result<TransactionStatus, SweepError>;
}
