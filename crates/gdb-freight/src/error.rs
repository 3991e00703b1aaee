//! Error types for the exchange library.

use thiserror::Error;

/// Main error type for exchange operations.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Protocol precondition failure (missing control table, bad protocol
    /// identifier, bad role value). Always fatal, raised before any transfer.
    #[error("Protocol precondition failed: {0}")]
    Precondition(String),

    /// Workspace/storage layer error.
    #[error("Workspace error: {0}")]
    Store(String),

    /// Transfer failed for a specific data object.
    #[error("Transfer failed for {object}: {message}")]
    Transfer { object: String, message: String },

    /// Notification delivery error.
    #[error("Notification error: {0}")]
    Notify(String),

    /// IO error (log file, workspace snapshots).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExchangeError {
    /// Create a Store error.
    pub fn store(message: impl Into<String>) -> Self {
        ExchangeError::Store(message.into())
    }

    /// Create a Transfer error.
    pub fn transfer(object: impl Into<String>, message: impl Into<String>) -> Self {
        ExchangeError::Transfer {
            object: object.into(),
            message: message.into(),
        }
    }

    /// Process exit code for the CLI.
    ///
    /// Precondition and configuration failures exit with 2 (nothing was
    /// touched); everything else exits with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            ExchangeError::Config(_) | ExchangeError::Precondition(_) => 2,
            _ => 1,
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for exchange operations.
pub type Result<T> = std::result::Result<T, ExchangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExchangeError::Precondition("x".into()).exit_code(), 2);
        assert_eq!(ExchangeError::Config("x".into()).exit_code(), 2);
        assert_eq!(ExchangeError::store("x").exit_code(), 1);
        assert_eq!(ExchangeError::transfer("roads", "boom").exit_code(), 1);
    }

    #[test]
    fn test_transfer_error_display() {
        let e = ExchangeError::transfer("GIS.roads", "append failed");
        assert_eq!(e.to_string(), "Transfer failed for GIS.roads: append failed");
    }
}
