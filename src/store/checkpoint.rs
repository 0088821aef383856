// SPDX-License-Identifier: MPL-2.0

use crate::store::{FeedDb, StoreError};
use rusqlite::params;

/// Upsert the checkpoint row inside an existing transaction. Used by the
/// ingest commit so the cursor only advances with the batch it belongs to.
pub(crate) fn upsert(
    conn: &rusqlite::Connection,
    service: &str,
    cursor: i64,
) -> Result<(), StoreError> {
    conn.execute(
        r#"
        INSERT INTO subscription_state (service, cursor)
        VALUES (?1, ?2)
        ON CONFLICT(service) DO UPDATE SET cursor = excluded.cursor
        "#,
        params![service, cursor],
    )?;
    Ok(())
}

/// Read access to the per-subscription checkpoint. The row itself is written
/// only by the ingestion commit; everything else treats it as read-only.
pub struct CheckpointStore<'a> {
    db: &'a FeedDb,
}

impl<'a> CheckpointStore<'a> {
    pub fn new(db: &'a FeedDb) -> Self {
        Self { db }
    }

    /// Last committed upstream cursor for `service`, if any batch has ever
    /// committed.
    pub fn get(&self, service: &str) -> Result<Option<i64>, StoreError> {
        let conn = self.db.read_conn();

        let mut stmt =
            conn.prepare("SELECT cursor FROM subscription_state WHERE service = ?")?;

        match stmt.query_row([service], |row| row.get(0)) {
            Ok(cursor) => Ok(Some(cursor)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }
}
