//! # Storage Module
//!
//! Durable homes for audit sessions.
//!
//! Stores move opaque session documents (see [`crate::formats`]) in and out
//! of a backend; they hold no business logic. Three backends are provided:
//! - `File`: one JSON document per session, replaced atomically
//! - `Redb`: one `sessions` table in an embedded ACID database
//! - `InMemory`: volatile, for tests and ephemeral server runs

mod file_store;
mod redb_store;

pub use file_store::FileStore;
pub use redb_store::RedbStore;

use crate::formats::{session_from_bytes, session_to_bytes};
use crate::session::validate_session_id;
use crate::{AuditError, AuditSession};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// File name of the redb database inside a data directory.
pub const REDB_FILE_NAME: &str = "sessions.redb";

// =============================================================================
// SESSION STORE TRAIT
// =============================================================================

/// Persistence seam used by the [`StageGateManager`](crate::StageGateManager).
pub trait SessionStore {
    /// Load a session, or `None` if nothing is stored under `session_id`.
    ///
    /// Stored data that cannot be decoded is `CorruptState`, never `None`.
    fn load(&self, session_id: &str) -> Result<Option<AuditSession>, AuditError>;

    /// Persist a session, replacing any previous version atomically.
    fn save(&mut self, session: &AuditSession) -> Result<(), AuditError>;

    /// Ids of all stored sessions, sorted.
    fn list(&self) -> Result<Vec<String>, AuditError>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// Volatile store keeping encoded documents in a map.
///
/// Documents go through the same codec as the durable backends.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    documents: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw document bytes under an id, bypassing the encoder.
    pub fn insert_raw(&mut self, session_id: impl Into<String>, bytes: Vec<u8>) {
        self.documents.insert(session_id.into(), bytes);
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, session_id: &str) -> Result<Option<AuditSession>, AuditError> {
        validate_session_id(session_id)?;
        self.documents
            .get(session_id)
            .map(|bytes| session_from_bytes(session_id, bytes))
            .transpose()
    }

    fn save(&mut self, session: &AuditSession) -> Result<(), AuditError> {
        validate_session_id(&session.session_id)?;
        let bytes = session_to_bytes(session)?;
        self.documents.insert(session.session_id.clone(), bytes);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, AuditError> {
        Ok(self.documents.keys().cloned().collect())
    }
}

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Backend selector, as named in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    File,
    Redb,
    Memory,
}

impl FromStr for BackendKind {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(BackendKind::File),
            "redb" => Ok(BackendKind::Redb),
            "memory" | "inmemory" | "in-memory" => Ok(BackendKind::Memory),
            other => Err(AuditError::Storage(format!(
                "unknown storage backend '{other}' (use file, redb, memory)"
            ))),
        }
    }
}

/// Storage backend for audit sessions.
#[derive(Debug)]
pub enum StorageBackend {
    /// One JSON document per session in a directory.
    File(FileStore),
    /// Disk-backed redb database (ACID).
    Redb(RedbStore),
    /// In-memory documents (volatile).
    InMemory(MemoryStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    /// Open the backend `kind` rooted at `data_dir`.
    ///
    /// The directory is created if missing; the memory backend ignores it.
    pub fn open(kind: BackendKind, data_dir: impl AsRef<Path>) -> Result<Self, AuditError> {
        match kind {
            BackendKind::File => Ok(Self::File(FileStore::open(data_dir)?)),
            BackendKind::Redb => {
                let dir = data_dir.as_ref();
                std::fs::create_dir_all(dir)
                    .map_err(|e| AuditError::Storage(format!("create {}: {e}", dir.display())))?;
                Ok(Self::Redb(RedbStore::open(dir.join(REDB_FILE_NAME))?))
            }
            BackendKind::Memory => Ok(Self::InMemory(MemoryStore::new())),
        }
    }

    /// Check if using durable storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        !matches!(self, StorageBackend::InMemory(_))
    }

    #[must_use]
    pub fn kind(&self) -> BackendKind {
        match self {
            StorageBackend::File(_) => BackendKind::File,
            StorageBackend::Redb(_) => BackendKind::Redb,
            StorageBackend::InMemory(_) => BackendKind::Memory,
        }
    }
}

impl SessionStore for StorageBackend {
    fn load(&self, session_id: &str) -> Result<Option<AuditSession>, AuditError> {
        match self {
            StorageBackend::File(store) => store.load(session_id),
            StorageBackend::Redb(store) => store.load(session_id),
            StorageBackend::InMemory(store) => store.load(session_id),
        }
    }

    fn save(&mut self, session: &AuditSession) -> Result<(), AuditError> {
        match self {
            StorageBackend::File(store) => store.save(session),
            StorageBackend::Redb(store) => store.save(session),
            StorageBackend::InMemory(store) => store.save(session),
        }
    }

    fn list(&self) -> Result<Vec<String>, AuditError> {
        match self {
            StorageBackend::File(store) => store.list(),
            StorageBackend::Redb(store) => store.list(),
            StorageBackend::InMemory(store) => store.list(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        let session = AuditSession::new("audit_mem", "Acme", None);
        store.save(&session).expect("save");
        assert_eq!(store.load("audit_mem").expect("load"), Some(session));
        assert_eq!(store.load("audit_none").expect("load"), None);
        assert_eq!(store.list().expect("list"), vec!["audit_mem".to_string()]);
    }

    #[test]
    fn memory_store_surfaces_corruption() {
        let mut store = MemoryStore::new();
        store.insert_raw("audit_bad", b"][".to_vec());
        let err = store.load("audit_bad").expect_err("corrupt");
        assert!(matches!(err, AuditError::CorruptState { .. }));
    }

    #[test]
    fn invalid_id_rejected_before_lookup() {
        let store = MemoryStore::new();
        let err = store.load("../escape").expect_err("bad id");
        assert!(matches!(err, AuditError::InvalidSessionId(_)));
    }

    #[test]
    fn backend_kind_parses() {
        assert_eq!("REDB".parse::<BackendKind>().expect("parse"), BackendKind::Redb);
        assert_eq!("in-memory".parse::<BackendKind>().expect("parse"), BackendKind::Memory);
        assert!("sqlite".parse::<BackendKind>().is_err());
    }

    #[test]
    fn default_backend_is_volatile() {
        let backend = StorageBackend::default();
        assert!(!backend.is_persistent());
        assert_eq!(backend.kind(), BackendKind::Memory);
    }
}
