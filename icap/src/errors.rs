//! Error types for the ICAP provisioning service

use thiserror::Error;

/// A problem with what the caller asked for.
///
/// These are the only errors a lifecycle task recovers from: they end up in
/// the `error` field of the task envelope. Everything else is an
/// infrastructure fault and propagates to the worker host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0} is not a valid network")]
    InvalidNetwork(String),

    #[error("{0} is not a valid image version")]
    InvalidImage(String),

    #[error("{0} does not exist")]
    ObjectNotFound(String),

    /// The backend refused the request (bad input or missing object)
    #[error("{0}")]
    Rejected(String),
}

/// Main error type for the ICAP service
#[derive(Error, Debug)]
pub enum ProvisionerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Catalog error: {0}")]
    CatalogError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Dispatch error: {0}")]
    DispatchError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProvisionerError {
    /// The domain error this wraps, if any
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ProvisionerError::Domain(e) => Some(e),
            _ => None,
        }
    }
}
