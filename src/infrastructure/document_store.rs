use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Storage key for the single application document. Kept verbatim from the
/// original release line so exported snapshots stay interchangeable.
pub const DOCUMENT_KEY: &str = "zentask_ai_premium_v6";

/// Opaque key-value blob store holding the persisted document as raw JSON
/// text. Last write wins; the caller owns serialization.
pub trait DocumentStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, InfraError>;
    fn save(&self, body: &str, updated_at: DateTime<Utc>) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    db_path: PathBuf,
    key: String,
}

impl SqliteDocumentStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            key: DOCUMENT_KEY.to_string(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn load(&self) -> Result<Option<String>, InfraError> {
        let connection = self.connect()?;
        let body: Option<String> = connection
            .query_row(
                "SELECT body FROM documents WHERE key = ?1",
                params![self.key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body)
    }

    fn save(&self, body: &str, updated_at: DateTime<Utc>) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO documents (key, body, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               body = excluded.body,
               updated_at = excluded.updated_at",
            params![self.key, body, updated_at.to_rfc3339()],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    body: Mutex<Option<String>>,
}

impl DocumentStore for InMemoryDocumentStore {
    fn load(&self) -> Result<Option<String>, InfraError> {
        let body = self
            .body
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("document lock poisoned: {error}")))?;
        Ok(body.clone())
    }

    fn save(&self, body: &str, _updated_at: DateTime<Utc>) -> Result<(), InfraError> {
        let mut guard = self
            .body
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("document lock poisoned: {error}")))?;
        *guard = Some(body.to_string());
        Ok(())
    }
}
