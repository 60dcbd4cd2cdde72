//! # System Module
//!
//! The audit stage sequence, the gates guarding each transition, and the
//! version check used in summaries.
//!
//! All of it is pure and deterministic: the [`StageGateManager`](crate::StageGateManager)
//! is the only component that acts on their answers.

mod gate;
mod stage;
mod versions;

pub use gate::*;
pub use stage::*;
pub use versions::*;
