//! Core domain types: keys, accounts, sweep outcomes and counters.

use ethers::types::{Address, TxHash, U256};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte secp256k1 secret scalar. Zeroized when dropped.
pub struct PrivateKey(Secret<[u8; 32]>);

impl PrivateKey {
    pub fn new(k: [u8; 32]) -> Self {
        Self(Secret::new(k))
    }

    /// Scoped access to the underlying secret bytes. Prefer this over holding
    /// on to a copy so secret data never outlives a small scope.
    pub fn with_secret<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[u8; 32]) -> R,
    {
        f(self.0.expose_secret())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

/// One derived key pair plus its public address.
///
/// Not `Clone`: an account is moved into exactly one sweep attempt and its
/// secret goes away with it.
#[derive(Debug)]
pub struct Account {
    pub index: u32,
    pub derivation_path: String,
    pub private_key: PrivateKey,
    pub address: Address,
}

/// Result of one sweep attempt for one (cycle, index) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Zero balance, or a balance that does not cover the transfer fee.
    NoFunds,
    TransferSucceeded { tx_hash: TxHash, amount: U256 },
    TransferFailed,
    CheckFailed,
}

impl SweepOutcome {
    /// Stable label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SweepOutcome::NoFunds => "no_funds",
            SweepOutcome::TransferSucceeded { .. } => "transfer_succeeded",
            SweepOutcome::TransferFailed => "transfer_failed",
            SweepOutcome::CheckFailed => "check_failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SweepOutcome::TransferSucceeded { .. })
    }
}

/// The two durable running counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    /// Accounts examined, across all cycles.
    #[serde(alias = "countNumber", default)]
    pub check_count: u64,
    /// Confirmed successful transfers.
    #[serde(default)]
    pub transfer_count: u64,
}
