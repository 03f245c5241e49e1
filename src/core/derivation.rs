//! HD account derivation
//!
//! One fresh BIP39 seed phrase per cycle, and from it N Ethereum accounts
//! along m/44'/60'/0'/0/<index>.
//!
//! ## Security
//! - The phrase lives in a `SecretString` and is dropped right after derivation
//! - Private keys are wrapped in `PrivateKey` and zeroized on drop
//! - Neither is ever logged

use coins_bip32::prelude::*;
use coins_bip39::{English, Mnemonic};
use ethers::signers::{LocalWallet, Signer};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use tracing::debug;
use zeroize::Zeroize;

use crate::core::bip44::Bip44Path;
use crate::core::domain::{Account, PrivateKey};
use crate::core::errors::SweepError;

/// Default mnemonic length.
pub const DEFAULT_WORD_COUNT: usize = 12;

/// A BIP39 mnemonic, valid for the duration of one cycle.
pub struct SeedPhrase {
    phrase: SecretString,
}

impl SeedPhrase {
    /// Generate a new random 12-word phrase.
    pub fn generate() -> Result<Self, SweepError> {
        Self::generate_with_count(DEFAULT_WORD_COUNT)
    }

    pub fn generate_with_count(word_count: usize) -> Result<Self, SweepError> {
        let mut rng = rand::thread_rng();
        let mnemonic = Mnemonic::<English>::new_with_count(&mut rng, word_count)
            .map_err(|e| SweepError::Derivation(format!("Failed to generate mnemonic: {}", e)))?;
        Ok(Self { phrase: SecretString::new(mnemonic.to_phrase()) })
    }

    /// Parse and validate an existing phrase.
    pub fn from_phrase(phrase: &str) -> Result<Self, SweepError> {
        Mnemonic::<English>::new_from_phrase(phrase)
            .map_err(|e| SweepError::Derivation(format!("Invalid mnemonic: {}", e)))?;
        Ok(Self { phrase: SecretString::new(phrase.to_string()) })
    }

    pub fn word_count(&self) -> usize {
        self.phrase.expose_secret().split_whitespace().count()
    }

    fn master_key(&self) -> Result<XPriv, SweepError> {
        let mnemonic = Mnemonic::<English>::new_from_phrase(self.phrase.expose_secret())
            .map_err(|e| SweepError::Derivation(format!("Invalid mnemonic: {}", e)))?;
        mnemonic
            .master_key(None)
            .map_err(|e| SweepError::Derivation(format!("Failed to derive master key: {}", e)))
    }
}

impl fmt::Debug for SeedPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SeedPhrase([REDACTED])")
    }
}

/// Derive the child account at `index` below an already computed master key.
fn derive_from_master(master: &XPriv, index: u32) -> Result<Account, SweepError> {
    let path = Bip44Path::ethereum(index).to_string();

    let child = master
        .derive_path(path.as_str())
        .map_err(|e| SweepError::Derivation(format!("Failed to derive {}: {}", path, e)))?;

    let signing_key: &SigningKey = child.as_ref();
    let mut raw = [0u8; 32];
    raw.copy_from_slice(signing_key.to_bytes().as_slice());

    let address = LocalWallet::from_bytes(&raw)
        .map_err(|e| SweepError::Derivation(format!("Invalid child key at {}: {}", path, e)))?
        .address();
    let private_key = PrivateKey::new(raw);
    raw.zeroize();

    debug!(index, address = ?address, "Derived account");

    Ok(Account { index, derivation_path: path, private_key, address })
}

/// Derive a single account. Pure function of (seed, index).
pub fn derive_account(seed: &SeedPhrase, index: u32) -> Result<Account, SweepError> {
    let master = seed.master_key()?;
    derive_from_master(&master, index)
}

/// Derive accounts `0..count` from the given seed, all or nothing.
pub fn derive_accounts_from(seed: &SeedPhrase, count: usize) -> Result<Vec<Account>, SweepError> {
    let master = seed.master_key()?;
    (0..count)
        .map(|i| {
            let index = u32::try_from(i)
                .map_err(|_| SweepError::Derivation(format!("Index {} out of range", i)))?;
            derive_from_master(&master, index)
        })
        .collect()
}

/// Source of a cycle's account set.
pub trait AccountDeriver: Send + Sync {
    fn derive_accounts(&self, count: usize) -> Result<Vec<Account>, SweepError>;
}

/// Generates a fresh seed phrase on every call and derives from it.
#[derive(Debug, Clone)]
pub struct DerivationEngine {
    word_count: usize,
}

impl DerivationEngine {
    pub fn new(word_count: usize) -> Self {
        Self { word_count }
    }
}

impl Default for DerivationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_WORD_COUNT)
    }
}

impl AccountDeriver for DerivationEngine {
    fn derive_accounts(&self, count: usize) -> Result<Vec<Account>, SweepError> {
        let seed = SeedPhrase::generate_with_count(self.word_count)?;
        derive_accounts_from(&seed, count)
    }
}
