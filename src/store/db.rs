// SPDX-License-Identifier: MPL-2.0

use crate::store::StoreError;
use crate::store::schema::SCHEMA;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Handle to the feed database. Cheap to clone; all clones share the same
/// underlying connections.
///
/// File-backed databases hold two connections: one writer for ingest commits
/// and one read-only reader for feed pages. With WAL journaling the reader
/// works from the last committed snapshot, so a page read never waits out an
/// in-flight batch commit. In-memory databases (tests) see only their own
/// connection, so there the reader and writer are the same handle.
#[derive(Clone)]
pub struct FeedDb {
    writer: Arc<Mutex<Connection>>,
    reader: Arc<Mutex<Connection>>,
}

impl FeedDb {
    /// Open or create the feed database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Path(format!("failed to create data dir: {}", e)))?;
        }

        let writer = Connection::open(path)?;

        // WAL so the read connection sees a committed snapshot instead of
        // waiting on the writer's transaction.
        writer.pragma_update(None, "journal_mode", "wal")?;

        Self::migrate(&writer)?;

        // Opened after migration so the schema already exists.
        let reader = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )?;

        Ok(Self {
            writer: Arc::new(Mutex::new(writer)),
            reader: Arc::new(Mutex::new(reader)),
        })
    }

    /// Open at the default location: `~/.local/share/flxfeed/feed.db`.
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(Self::default_path()?)
    }

    /// In-memory database, used by tests. A second connection would see a
    /// different database, so reads share the writer connection here.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::migrate(&conn)?;
        let shared = Arc::new(Mutex::new(conn));
        Ok(Self {
            writer: shared.clone(),
            reader: shared,
        })
    }

    /// Run schema migrations
    fn migrate(conn: &Connection) -> Result<(), StoreError> {
        // Execute the schema (all CREATE IF NOT EXISTS)
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn default_path() -> Result<PathBuf, StoreError> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| StoreError::Path("could not find data directory".to_string()))?;
        Ok(data_dir.join("flxfeed").join("feed.db"))
    }

    /// Writer connection, for ingest mutations and migrations.
    pub(crate) fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.writer.lock().expect("feed db lock poisoned")
    }

    /// Read connection, for page queries and lookups.
    pub(crate) fn read_conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.reader.lock().expect("feed db lock poisoned")
    }

    /// Current wall clock as unix milliseconds.
    pub fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
