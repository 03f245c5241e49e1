pub mod bip44;
pub mod config;
pub mod derivation;
pub mod domain;
pub mod errors;

pub use derivation::{AccountDeriver, DerivationEngine, SeedPhrase};
pub use domain::{Account, Counters, PrivateKey, SweepOutcome};
pub use errors::SweepError;
