//! # Formats Module
//!
//! Serialization formats for persisted audit state.

mod persistence;

pub use persistence::{session_from_bytes, session_to_bytes};
