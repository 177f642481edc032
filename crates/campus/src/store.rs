//! Document store
//!
//! A single SQLite file holds all five collections. Each document is kept
//! as a JSON body in the `documents` table, keyed by `(collection, id)`.
//!
//! ## Features
//!
//! - **Explicit handle**: the connection is opened once by [`Store::open`] and
//!   shared by reference; there is no global connection cache.
//! - **Typed collections**: [`Store::collection`] returns a [`Collection`]
//!   handle that reads and writes one [`Document`] type.
//! - **Uniqueness**: a partial unique index on `(collection, unique_key)`
//!   rejects duplicate taxonomy names with [`StoreError::Conflict`].
//! - **Schema rules**: [`Document::schema_violations`] runs before every
//!   insert and replace.
//!
//! Writes are last-write-wins. There are no multi-document transactions.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::{DocId, Document};

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        unique_key TEXT,
        body TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (collection, id)
    );
    CREATE UNIQUE INDEX IF NOT EXISTS documents_unique_key
        ON documents (collection, unique_key)
        WHERE unique_key IS NOT NULL;
";

/// How long a writer waits on a locked database file
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the document database
pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Store {
    /// Open or create the store at `path`, creating parent directories.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::connection(format!("failed to create database directory: {e}"))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| StoreError::connection(format!("failed to open database: {e}")))?;
        let store = Self::init(conn, Some(path.to_path_buf()))?;

        info!(path = %path.display(), "Document store opened");
        Ok(store)
    }

    /// Open a private in-memory store
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::connection(format!("failed to open database: {e}")))?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| StoreError::connection(format!("failed to set busy timeout: {e}")))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::connection(format!("failed to create schema: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Path of the database file, `None` for in-memory stores
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Typed access to one collection
    #[must_use]
    pub fn collection<T: Document>(&self) -> Collection<'_, T> {
        Collection {
            store: self,
            _marker: PhantomData,
        }
    }
}

/// Typed handle to one collection of a [`Store`]
pub struct Collection<'a, T> {
    store: &'a Store,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> Collection<'_, T> {
    /// Insert a new document.
    pub fn insert(&self, doc: &T) -> StoreResult<()> {
        check_schema(doc)?;
        let body = encode(doc)?;
        let id = doc.id().to_string();
        let now = Utc::now().to_rfc3339();

        let conn = self.store.conn.lock();
        conn.execute(
            "INSERT INTO documents (collection, id, unique_key, body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![T::COLLECTION.as_str(), id, doc.unique_key(), body, now],
        )
        .map_err(|e| map_write_error::<T>(doc, &e))?;

        debug!(collection = %T::COLLECTION, id = %id, "Document inserted");
        Ok(())
    }

    /// Fetch a document by id. Malformed ids read as missing.
    pub fn get(&self, id: &str) -> StoreResult<Option<T>> {
        let Some(id) = DocId::parse(id) else {
            debug!(collection = %T::COLLECTION, id = %id, "Malformed id on read");
            return Ok(None);
        };

        let conn = self.store.conn.lock();
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![T::COLLECTION.as_str(), id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::connection(format!("failed to read document: {e}")))?;

        body.as_deref().map(decode::<T>).transpose()
    }

    /// Overwrite an existing document with the same id.
    pub fn replace(&self, doc: &T) -> StoreResult<()> {
        check_schema(doc)?;
        let body = encode(doc)?;
        let id = doc.id().to_string();
        let now = Utc::now().to_rfc3339();

        let conn = self.store.conn.lock();
        let rows = conn
            .execute(
                "UPDATE documents SET unique_key = ?3, body = ?4, updated_at = ?5
                 WHERE collection = ?1 AND id = ?2",
                params![T::COLLECTION.as_str(), id, doc.unique_key(), body, now],
            )
            .map_err(|e| map_write_error::<T>(doc, &e))?;

        if rows == 0 {
            return Err(StoreError::not_found(T::COLLECTION, id));
        }

        debug!(collection = %T::COLLECTION, id = %id, "Document replaced");
        Ok(())
    }

    /// Delete a document. Returns whether it existed.
    pub fn delete(&self, id: &str) -> StoreResult<bool> {
        let parsed = DocId::parse(id).ok_or_else(|| StoreError::invalid_id(T::COLLECTION, id))?;

        let conn = self.store.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![T::COLLECTION.as_str(), parsed.to_string()],
            )
            .map_err(|e| StoreError::connection(format!("failed to delete document: {e}")))?;

        debug!(collection = %T::COLLECTION, id = %id, removed = rows > 0, "Document removal attempted");
        Ok(rows > 0)
    }

    /// All documents in insertion order
    pub fn list(&self) -> StoreResult<Vec<T>> {
        let conn = self.store.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT body FROM documents WHERE collection = ?1 ORDER BY created_at, rowid",
            )
            .map_err(|e| StoreError::connection(format!("failed to prepare statement: {e}")))?;

        let bodies = stmt
            .query_map(params![T::COLLECTION.as_str()], |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::connection(format!("failed to query documents: {e}")))?;

        let mut docs = Vec::new();
        for body in bodies {
            let body =
                body.map_err(|e| StoreError::connection(format!("failed to read row: {e}")))?;
            docs.push(decode(&body)?);
        }
        Ok(docs)
    }

    /// Number of documents in the collection
    pub fn count(&self) -> StoreResult<usize> {
        let conn = self.store.conn.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                params![T::COLLECTION.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::connection(format!("failed to count documents: {e}")))?;

        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn check_schema<T: Document>(doc: &T) -> StoreResult<()> {
    let violations = doc.schema_violations();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Schema {
            collection: T::COLLECTION,
            message: Arc::from(violations.join(", ")),
        })
    }
}

fn encode<T: Document>(doc: &T) -> StoreResult<String> {
    serde_json::to_string(doc)
        .map_err(|e| StoreError::corrupt(format!("failed to encode {}: {e}", T::COLLECTION)))
}

fn decode<T: Document>(body: &str) -> StoreResult<T> {
    serde_json::from_str(body)
        .map_err(|e| StoreError::corrupt(format!("failed to decode {}: {e}", T::COLLECTION)))
}

fn map_write_error<T: Document>(doc: &T, err: &rusqlite::Error) -> StoreError {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => StoreError::Conflict {
            collection: T::COLLECTION,
            key: Arc::from(doc.unique_key().unwrap_or_default()),
        },
        _ => StoreError::connection(format!("failed to write {}: {err}", T::COLLECTION)),
    }
}
