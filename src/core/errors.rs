//! Error types shared by the derivation, sweep and persistence layers.

use thiserror::Error;

/// Errors raised inside the sweeper.
///
/// Everything except `Derivation` and `Config` is contained at the worker or
/// counter-actor boundary and only ever ends up in a log line.
#[derive(Debug, Error)]
pub enum SweepError {
    /// The seed phrase or one of its child keys could not be produced.
    #[error("Derivation error: {0}")]
    Derivation(String),

    /// The endpoint could not be reached or constructed.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Balance query failed: {0}")]
    BalanceQuery(String),

    #[error("Fee query failed: {0}")]
    FeeQuery(String),

    #[error("Transfer submission failed: {0}")]
    TransferSubmission(String),

    #[error("Confirmation failed: {0}")]
    Confirmation(String),

    /// Counter store read or write failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SweepError {
    /// Whether the error should abort the current cycle as a whole.
    pub fn is_cycle_fatal(&self) -> bool {
        matches!(self, SweepError::Derivation(_))
    }

    /// Whether the error happened while talking to an endpoint.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            SweepError::ProviderUnavailable(_)
                | SweepError::BalanceQuery(_)
                | SweepError::FeeQuery(_)
                | SweepError::TransferSubmission(_)
                | SweepError::Confirmation(_)
                | SweepError::Timeout(_)
        )
    }
}

impl From<sqlx::Error> for SweepError {
    fn from(err: sqlx::Error) -> Self {
        SweepError::Persistence(err.to_string())
    }
}

impl From<reqwest::Error> for SweepError {
    fn from(err: reqwest::Error) -> Self {
        SweepError::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_derivation_error() {
        let err = SweepError::Derivation("bad index".to_string());
        assert_eq!(format!("{}", err), "Derivation error: bad index");
    }

    #[test]
    fn test_display_persistence_error() {
        let err = SweepError::Persistence("connection refused".to_string());
        assert_eq!(format!("{}", err), "Persistence error: connection refused");
    }

    #[test]
    fn test_only_derivation_is_cycle_fatal() {
        assert!(SweepError::Derivation(String::new()).is_cycle_fatal());
        assert!(!SweepError::BalanceQuery(String::new()).is_cycle_fatal());
        assert!(!SweepError::Persistence(String::new()).is_cycle_fatal());
    }

    #[test]
    fn test_network_classification() {
        assert!(SweepError::FeeQuery(String::new()).is_network());
        assert!(SweepError::Timeout(String::new()).is_network());
        assert!(!SweepError::Config(String::new()).is_network());
        assert!(!SweepError::Persistence(String::new()).is_network());
    }
}
