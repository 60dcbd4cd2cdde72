//! # auditgate-core
//!
//! The Stage-Gate Orchestration Core for technology audits - THE LOGIC.
//!
//! An audit moves collected facts (tools, integrations, automation
//! candidates) through four fixed stages. Each transition is guarded by a
//! gate that blocks progress until completeness criteria are met, and every
//! change is persisted before it becomes visible.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is the ONLY place audit state is mutated ([`StageGateManager`])
//! - Never removes or overwrites supplied facts (non-destructive merge)
//! - Uses integer arithmetic and ordered collections only (deterministic)
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod formats;
pub mod ingestor;
pub mod manager;
pub mod primitives;
pub mod session;
pub mod storage;
pub mod summary;
pub mod system;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ApiStatus, AuditError, DiscoveryMethod, HealthStatus, IntegrationRecord, IntegrationType,
    OpportunityRecord, ToolPatch, ToolRecord, normalize_tool_name,
};

// =============================================================================
// RE-EXPORTS: Session, Manager, Storage
// =============================================================================

pub use ingestor::Ingestor;
pub use manager::{MergeOutcome, StageGateManager};
pub use session::{AuditSession, generate_session_id, validate_session_id};
pub use storage::{BackendKind, FileStore, MemoryStore, RedbStore, SessionStore, StorageBackend};
pub use summary::AuditSummary;

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{session_from_bytes, session_to_bytes};

// =============================================================================
// RE-EXPORTS: System (from system module)
// =============================================================================

pub use system::{
    CoverageStats, GatePolicy, GateReport, GateValidator, Stage, VersionCatalog, VersionCheck,
    VersionStatus, compare_versions,
};
