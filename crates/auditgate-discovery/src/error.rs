//! Discovery error types.
//!
//! Only caller or configuration mistakes are errors. A probe that times out,
//! fails to resolve or gets a bad HTTP status is recorded as data on the
//! returned patch.

use thiserror::Error;

/// Errors that can occur when setting up or starting a discovery run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The probe registry is malformed.
    #[error("invalid probe registry: {0}")]
    InvalidRegistry(String),

    /// The domain given for footprint discovery is not a valid host name.
    #[error("invalid domain: {0:?}")]
    InvalidDomain(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}
