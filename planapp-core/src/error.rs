//! Error types for the planapp ecosystem.

use thiserror::Error;

/// Errors that can occur in planapp operations.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider '{0}' not found in PATH")]
    ProviderNotInstalled(String),

    #[error("Provider request timed out after {0}s")]
    ProviderTimeout(u64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for planapp operations.
pub type PlanResult<T> = Result<T, PlanError>;
