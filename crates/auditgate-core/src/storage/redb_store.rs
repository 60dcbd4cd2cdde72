//! # redb-backed Session Storage
//!
//! A disk-backed session store using the redb embedded database.
//!
//! Provides:
//! - ACID transactions (a save is all-or-nothing)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Each session is one row of the `sessions` table, holding the same JSON
//! document the file store writes.

use super::SessionStore;
use crate::formats::{session_from_bytes, session_to_bytes};
use crate::session::validate_session_id;
use crate::{AuditError, AuditSession};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;

/// Table for sessions: session id -> document bytes
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

fn storage_err(e: impl std::fmt::Display) -> AuditError {
    AuditError::Storage(e.to_string())
}

/// A disk-backed session store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a session database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        // Initialize the table if it doesn't exist
        {
            let write_txn = db.begin_write().map_err(storage_err)?;
            let _ = write_txn.open_table(SESSIONS).map_err(storage_err)?;
            write_txn.commit().map_err(storage_err)?;
        }

        Ok(Self { db })
    }

    /// Compact the database (optional optimization).
    pub fn compact(&mut self) -> Result<(), AuditError> {
        self.db.compact().map_err(storage_err)?;
        Ok(())
    }
}

impl SessionStore for RedbStore {
    fn load(&self, session_id: &str) -> Result<Option<AuditSession>, AuditError> {
        validate_session_id(session_id)?;
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(SESSIONS).map_err(storage_err)?;
        let bytes = table
            .get(session_id)
            .map_err(storage_err)?
            .map(|v| v.value().to_vec());
        bytes
            .map(|bytes| session_from_bytes(session_id, &bytes))
            .transpose()
    }

    fn save(&mut self, session: &AuditSession) -> Result<(), AuditError> {
        validate_session_id(&session.session_id)?;
        let bytes = session_to_bytes(session)?;

        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(SESSIONS).map_err(storage_err)?;
            table
                .insert(session.session_id.as_str(), bytes.as_slice())
                .map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, AuditError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(SESSIONS).map_err(storage_err)?;
        let mut ids = Vec::new();
        for entry in table.iter().map_err(storage_err)? {
            let (key, _) = entry.map_err(storage_err)?;
            ids.push(key.value().to_string());
        }
        Ok(ids)
    }
}

// =============================================================================
// TESTS
// =============================================================================
