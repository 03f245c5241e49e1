use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::core::errors::SweepError;

/// Core sweeper settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperSection {
    /// Address every discovered balance is swept to. Required.
    #[serde(default)]
    pub destination: Option<String>,

    /// Seconds between cycle starts
    #[serde(default = "SweeperSection::default_interval_secs")]
    pub interval_secs: u64,

    /// Chain id used when signing transfers
    #[serde(default = "SweeperSection::default_chain_id")]
    pub chain_id: u64,

    /// Mnemonic length for generated seed phrases
    #[serde(default = "SweeperSection::default_word_count")]
    pub word_count: usize,
}

impl SweeperSection {
    fn default_interval_secs() -> u64 { 60 }
    fn default_chain_id() -> u64 { 1 }
    fn default_word_count() -> usize { 12 }
}

impl Default for SweeperSection {
    fn default() -> Self {
        Self {
            destination: None,
            interval_secs: Self::default_interval_secs(),
            chain_id: Self::default_chain_id(),
            word_count: Self::default_word_count(),
        }
    }
}

/// Network call bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Per-request timeout for balance, fee and submission calls (seconds)
    #[serde(default = "TimeoutConfig::default_request_secs")]
    pub request_secs: u64,

    /// Upper bound on waiting for a transfer to be mined (seconds)
    #[serde(default = "TimeoutConfig::default_confirmation_secs")]
    pub confirmation_secs: u64,

    /// Receipt polling interval while waiting for confirmation (seconds)
    #[serde(default = "TimeoutConfig::default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl TimeoutConfig {
    fn default_request_secs() -> u64 { 15 }
    fn default_confirmation_secs() -> u64 { 180 }
    fn default_poll_interval_secs() -> u64 { 4 }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn confirmation(&self) -> Duration {
        Duration::from_secs(self.confirmation_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: Self::default_request_secs(),
            confirmation_secs: Self::default_confirmation_secs(),
            poll_interval_secs: Self::default_poll_interval_secs(),
        }
    }
}

/// Which counter store backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterBackend {
    Http,
    Sqlite,
    Memory,
}

/// Counter store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterConfig {
    #[serde(default = "CounterConfig::default_backend")]
    pub backend: CounterBackend,

    /// Counter API URL for the http backend
    #[serde(default)]
    pub url: Option<String>,

    /// Database URL for the sqlite backend
    #[serde(default = "CounterConfig::default_database_url")]
    pub database_url: String,
}

impl CounterConfig {
    fn default_backend() -> CounterBackend { CounterBackend::Sqlite }
    fn default_database_url() -> String { "sqlite://./data/counters.db?mode=rwc".to_string() }
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            backend: Self::default_backend(),
            url: None,
            database_url: Self::default_database_url(),
        }
    }
}

/// Read-only status server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusConfig {
    /// e.g. "127.0.0.1:8787"; disabled when absent
    #[serde(default)]
    pub bind: Option<String>,
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweeperConfig {
    #[serde(default)]
    pub sweeper: SweeperSection,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub counters: CounterConfig,
    #[serde(default)]
    pub status: StatusConfig,
    /// Overrides the built-in endpoint registry when present
    #[serde(default)]
    pub endpoints: Option<Vec<String>>,
}

impl SweeperConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, SweepError> {
        toml::from_str(content).map_err(|e| SweepError::Config(format!("Invalid config: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self, SweepError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SweepError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sweeper.interval_secs)
    }

    /// Parsed destination address.
    pub fn destination(&self) -> Result<Address, SweepError> {
        let raw = self
            .sweeper
            .destination
            .as_deref()
            .ok_or_else(|| SweepError::Config("sweeper.destination is required".to_string()))?;
        Address::from_str(raw.trim())
            .map_err(|e| SweepError::Config(format!("Invalid destination address '{}': {}", raw, e)))
    }

    /// Check everything that can be checked without touching the network.
    pub fn validate(&self) -> Result<(), SweepError> {
        self.destination()?;
        if self.sweeper.interval_secs == 0 {
            return Err(SweepError::Config("sweeper.interval_secs must be positive".to_string()));
        }
        if self.timeouts.request_secs == 0 || self.timeouts.confirmation_secs == 0 {
            return Err(SweepError::Config("timeouts must be positive".to_string()));
        }
        if self.timeouts.poll_interval_secs == 0 {
            return Err(SweepError::Config("timeouts.poll_interval_secs must be positive".to_string()));
        }
        if self.counters.backend == CounterBackend::Http && self.counters.url.is_none() {
            return Err(SweepError::Config("counters.url is required for the http backend".to_string()));
        }
        Ok(())
    }
}
