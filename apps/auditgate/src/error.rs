//! Application error type.
//!
//! Wraps the library errors and adds the failures only the binary can hit
//! (configuration, terminal I/O, socket binding).

use auditgate_core::AuditError;
use auditgate_discovery::DiscoveryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// The configuration file or an override is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Command-line arguments are inconsistent.
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("I/O error: {0}")]
    Io(String),
}
