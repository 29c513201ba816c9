//! Error types for CLI operations.

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Neither a config file nor a host address was given
    #[error("no host configured: pass --host or --config")]
    MissingHost,

    /// Configuration file could not be loaded
    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: ContractError,
    },

    /// Configuration invalid after applying overrides
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(#[source] ContractError),
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
