// SPDX-License-Identifier: MPL-2.0

use crate::store::{FeedDb, StoreError, checkpoint};
use rusqlite::params;

/// A post that passed the relevance filter and lives in the feed.
///
/// Timestamps are unix milliseconds UTC. The engagement counters are
/// persisted but never written by ingestion; they are reserved for a
/// separate ranking pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub uri: String,
    pub cid: String,
    pub reply_parent: Option<String>,
    pub reply_root: Option<String>,
    pub author: String,
    pub text: String,
    pub has_media: bool,
    pub created_at: i64,
    pub indexed_at: i64,
    pub like_count: i64,
    pub repost_count: i64,
    pub reply_count: i64,
    pub score: f64,
}

impl Post {
    /// A fresh candidate with zeroed engagement counters.
    pub fn new(
        uri: impl Into<String>,
        cid: impl Into<String>,
        author: impl Into<String>,
        text: impl Into<String>,
        created_at: i64,
        indexed_at: i64,
    ) -> Self {
        Self {
            uri: uri.into(),
            cid: cid.into(),
            reply_parent: None,
            reply_root: None,
            author: author.into(),
            text: text.into(),
            has_media: false,
            created_at,
            indexed_at,
            like_count: 0,
            repost_count: 0,
            reply_count: 0,
            score: 0.0,
        }
    }
}

/// Just enough of a post to build a feed page and its cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRef {
    pub uri: String,
    pub cid: String,
    pub created_at: i64,
}

/// Store operations for posts
pub struct PostStore<'a> {
    db: &'a FeedDb,
}

impl<'a> PostStore<'a> {
    pub fn new(db: &'a FeedDb) -> Self {
        Self { db }
    }

    /// Insert a set of posts in one transaction (upserts by uri). Either
    /// every post becomes visible or, on any failure, none do.
    pub fn insert_batch(&self, posts: &[Post]) -> Result<(), StoreError> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        for post in posts {
            Self::insert_one(&tx, post)?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Insert a set of posts and advance the subscription checkpoint in the
    /// same transaction. This is the ingest commit: the checkpoint only moves
    /// if every insert lands.
    pub fn commit_creates(
        &self,
        posts: &[Post],
        service: &str,
        cursor: i64,
    ) -> Result<(), StoreError> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        for post in posts {
            Self::insert_one(&tx, post)?;
        }
        checkpoint::upsert(&tx, service, cursor)?;

        tx.commit()?;
        Ok(())
    }

    /// Delete posts by uri in one atomic statement. Unknown uris are fine;
    /// returns how many rows actually went away.
    pub fn delete_by_uris(&self, uris: &[String]) -> Result<usize, StoreError> {
        if uris.is_empty() {
            return Ok(0);
        }

        let conn = self.db.conn();

        let placeholders: Vec<_> = (1..=uris.len()).map(|i| format!("?{}", i)).collect();
        let query = format!(
            "DELETE FROM posts WHERE uri IN ({})",
            placeholders.join(", ")
        );

        let sql_params: Vec<&dyn rusqlite::ToSql> =
            uris.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

        let deleted = conn.execute(&query, sql_params.as_slice())?;
        Ok(deleted)
    }

    /// Get post by uri
    pub fn get(&self, uri: &str) -> Result<Post, StoreError> {
        let conn = self.db.read_conn();

        let mut stmt = conn.prepare(
            r#"
            SELECT uri, cid, reply_parent, reply_root, author, text, has_media,
                   created_at, indexed_at, like_count, repost_count, reply_count, score
            FROM posts
            WHERE uri = ?
            "#,
        )?;

        stmt.query_row([uri], Self::row_to_post).map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            other => StoreError::Database(other),
        })
    }

    pub fn contains(&self, uri: &str) -> Result<bool, StoreError> {
        let conn = self.db.read_conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE uri = ?",
            [uri],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.db.read_conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Page of posts strictly before `boundary` in `(created_at desc, cid
    /// desc)` order, newest first. `None` starts from the top of the feed.
    /// The boundary is a pure comparison point; it need not name a post that
    /// still exists.
    pub fn page_before(
        &self,
        boundary: Option<(i64, &str)>,
        limit: i64,
    ) -> Result<Vec<PostRef>, StoreError> {
        let conn = self.db.read_conn();
        let mut out = Vec::new();

        match boundary {
            None => {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT uri, cid, created_at FROM posts
                    ORDER BY created_at DESC, cid DESC
                    LIMIT ?1
                    "#,
                )?;
                let mut rows = stmt.query(params![limit])?;
                while let Some(row) = rows.next()? {
                    out.push(Self::row_to_ref(row)?);
                }
            }
            Some((created_at, cid)) => {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT uri, cid, created_at FROM posts
                    WHERE created_at < ?1 OR (created_at = ?1 AND cid < ?2)
                    ORDER BY created_at DESC, cid DESC
                    LIMIT ?3
                    "#,
                )?;
                let mut rows = stmt.query(params![created_at, cid, limit])?;
                while let Some(row) = rows.next()? {
                    out.push(Self::row_to_ref(row)?);
                }
            }
        }

        Ok(out)
    }

    fn insert_one(conn: &rusqlite::Connection, post: &Post) -> Result<(), StoreError> {
        // Engagement counters are deliberately absent: a redelivered batch
        // must not clobber whatever a ranking pass has written.
        conn.execute(
            r#"
            INSERT INTO posts (
                uri, cid, reply_parent, reply_root, author, text, has_media,
                created_at, indexed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(uri) DO UPDATE SET
                cid = excluded.cid,
                reply_parent = excluded.reply_parent,
                reply_root = excluded.reply_root,
                author = excluded.author,
                text = excluded.text,
                has_media = excluded.has_media,
                created_at = excluded.created_at,
                indexed_at = excluded.indexed_at
            "#,
            params![
                post.uri,
                post.cid,
                post.reply_parent,
                post.reply_root,
                post.author,
                post.text,
                post.has_media as i64,
                post.created_at,
                post.indexed_at,
            ],
        )?;
        Ok(())
    }

    /// Convert a database row to a Post
    fn row_to_post(row: &rusqlite::Row) -> Result<Post, rusqlite::Error> {
        Ok(Post {
            uri: row.get(0)?,
            cid: row.get(1)?,
            reply_parent: row.get(2)?,
            reply_root: row.get(3)?,
            author: row.get(4)?,
            text: row.get(5)?,
            has_media: row.get::<_, i64>(6)? != 0,
            created_at: row.get(7)?,
            indexed_at: row.get(8)?,
            like_count: row.get(9)?,
            repost_count: row.get(10)?,
            reply_count: row.get(11)?,
            score: row.get(12)?,
        })
    }

    fn row_to_ref(row: &rusqlite::Row) -> Result<PostRef, rusqlite::Error> {
        Ok(PostRef {
            uri: row.get(0)?,
            cid: row.get(1)?,
            created_at: row.get(2)?,
        })
    }
}
