//! # File Storage
//!
//! One JSON document per session: `<dir>/<session_id>.json`.
//!
//! Writes go to a temporary file in the same directory which is then renamed
//! over the target, so a reader sees either the old or the new document.

use super::SessionStore;
use crate::formats::{session_from_bytes, session_to_bytes};
use crate::session::validate_session_id;
use crate::{AuditError, AuditSession};
use std::io::Write;
use std::path::{Path, PathBuf};

const DOCUMENT_EXTENSION: &str = "json";

/// Directory of session documents.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a session directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, AuditError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|e| AuditError::Storage(format!("create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `session_id`.
    pub fn path_for(&self, session_id: &str) -> Result<PathBuf, AuditError> {
        validate_session_id(session_id)?;
        Ok(self
            .dir
            .join(format!("{session_id}.{DOCUMENT_EXTENSION}")))
    }
}

impl SessionStore for FileStore {
    fn load(&self, session_id: &str) -> Result<Option<AuditSession>, AuditError> {
        let path = self.path_for(session_id)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuditError::Storage(format!("read {}: {e}", path.display())));
            }
        };
        session_from_bytes(session_id, &bytes).map(Some)
    }

    fn save(&mut self, session: &AuditSession) -> Result<(), AuditError> {
        let path = self.path_for(&session.session_id)?;
        let bytes = session_to_bytes(session)?;

        let io_err = |e: std::io::Error| AuditError::Storage(format!("write {}: {e}", path.display()));
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, AuditError> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| AuditError::Storage(format!("list {}: {e}", self.dir.display())))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AuditError::Storage(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && validate_session_id(stem).is_ok()
            {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load() {
        let temp = tempdir().expect("temp dir");
        let mut store = FileStore::open(temp.path().join("sessions")).expect("open");
        let session = AuditSession::new("audit_file", "Acme", Some("acme.com".into()));

        store.save(&session).expect("save");
        assert!(store.dir().join("audit_file.json").exists());
        assert_eq!(store.load("audit_file").expect("load"), Some(session));
    }

    #[test]
    fn missing_document_is_none() {
        let temp = tempdir().expect("temp dir");
        let store = FileStore::open(temp.path()).expect("open");
        assert_eq!(store.load("audit_absent").expect("load"), None);
    }

    #[test]
    fn save_replaces_previous_version() {
        let temp = tempdir().expect("temp dir");
        let mut store = FileStore::open(temp.path()).expect("open");
        let mut session = AuditSession::new("audit_file", "Acme", None);
        store.save(&session).expect("first save");

        session.client_name = "Acme Corp".into();
        store.save(&session).expect("second save");

        let loaded = store.load("audit_file").expect("load").expect("present");
        assert_eq!(loaded.client_name, "Acme Corp");
        assert_eq!(store.list().expect("list"), vec!["audit_file".to_string()]);
    }

    #[test]
    fn corrupt_file_is_reported_not_replaced() {
        let temp = tempdir().expect("temp dir");
        let store = FileStore::open(temp.path()).expect("open");
        std::fs::write(temp.path().join("audit_bad.json"), b"{\"format_version\":1")
            .expect("write");

        let err = store.load("audit_bad").expect_err("corrupt");
        assert!(matches!(err, AuditError::CorruptState { .. }));
        let on_disk = std::fs::read(temp.path().join("audit_bad.json")).expect("read");
        assert_eq!(on_disk, b"{\"format_version\":1");
    }

    #[test]
    fn list_ignores_foreign_files() {
        let temp = tempdir().expect("temp dir");
        let mut store = FileStore::open(temp.path()).expect("open");
        std::fs::write(temp.path().join("notes.txt"), b"hi").expect("write");
        store
            .save(&AuditSession::new("audit_b", "B", None))
            .expect("save");
        store
            .save(&AuditSession::new("audit_a", "A", None))
            .expect("save");
        assert_eq!(
            store.list().expect("list"),
            vec!["audit_a".to_string(), "audit_b".to_string()]
        );
    }
}
