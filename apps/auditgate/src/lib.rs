//! # AuditGate application library
//!
//! The HTTP server, CLI and configuration behind the `auditgate` binary,
//! exposed as a library for integration tests.

pub mod api;
pub mod cli;
pub mod config;
pub mod enrichment;
pub mod error;

pub use config::AppConfig;
pub use error::AppError;
