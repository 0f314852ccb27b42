//! Error types for the strategy core

use thiserror::Error;

/// Result type alias using our StrategyError
pub type Result<T> = std::result::Result<T, StrategyError>;

/// Main error type for strategy operations
#[derive(Error, Debug)]
pub enum StrategyError {
    /// Invalid or missing configuration (fatal at startup)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Lookup beyond the retained history of a series or signal
    #[error("Index {index} out of range (history length {len})")]
    OutOfRange { index: usize, len: usize },

    /// Zero delta or zero chunk count handed to the order planner
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Order submission, cancellation or report write failures
    #[error("External I/O error: {0}")]
    ExternalIo(String),

    /// Account or session state could not be read
    #[error("Account error: {0}")]
    Account(String),

    /// Event not accepted in the current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Channel send errors
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<std::io::Error> for StrategyError {
    fn from(err: std::io::Error) -> Self {
        StrategyError::ExternalIo(err.to_string())
    }
}

impl From<csv::Error> for StrategyError {
    fn from(err: csv::Error) -> Self {
        StrategyError::ExternalIo(err.to_string())
    }
}

impl StrategyError {
    /// Whether the error must abort strategy start rather than a single event
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StrategyError::Configuration(_) | StrategyError::Account(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(StrategyError::Configuration("bad".into()).is_fatal());
        assert!(StrategyError::Account("no balances".into()).is_fatal());
        assert!(!StrategyError::InvalidQuantity("zero".into()).is_fatal());
        assert!(!StrategyError::ExternalIo("timeout".into()).is_fatal());
    }

    #[test]
    fn test_io_error_maps_to_external_io() {
        let err: StrategyError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, StrategyError::ExternalIo(_)));
    }
}
