// SPDX-License-Identifier: MPL-2.0

//! Cursor-paginated, reverse-chronological feed pages.
//!
//! The feed is the total order over stored posts sorted by `created_at`
//! descending with `cid` descending as tie-break. A cursor names a position
//! in that order (`"<unix_millis>::<cid>"`) or the terminal sentinel `"eof"`;
//! it is a comparison boundary, never a lookup key, so it keeps working after
//! the post it was minted from is deleted.

use crate::store::{FeedDb, PostRef, PostStore, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// End-of-feed sentinel cursor.
pub const CURSOR_EOF: &str = "eof";

/// Largest page a consumer may request, per the feed skeleton contract.
pub const MAX_LIMIT: i64 = 100;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("malformed cursor: {0}")]
    MalformedCursor(String),
    #[error("limit out of range: {0}")]
    InvalidLimit(i64),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Position in the feed's total order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    Eof,
    Position { created_at: i64, cid: String },
}

impl Cursor {
    /// Parse a wire cursor. `"eof"` is the sentinel; anything else must be
    /// exactly `"<unix_millis>::<cid>"`.
    pub fn parse(raw: &str) -> Result<Self, FeedError> {
        if raw == CURSOR_EOF {
            return Ok(Cursor::Eof);
        }

        let parts: Vec<&str> = raw.split("::").collect();
        if parts.len() != 2 {
            return Err(FeedError::MalformedCursor(raw.to_string()));
        }

        let created_at: i64 = parts[0]
            .parse()
            .map_err(|_| FeedError::MalformedCursor(raw.to_string()))?;

        Ok(Cursor::Position {
            created_at,
            cid: parts[1].to_string(),
        })
    }

    pub fn encode(&self) -> String {
        match self {
            Cursor::Eof => CURSOR_EOF.to_string(),
            Cursor::Position { created_at, cid } => format!("{}::{}", created_at, cid),
        }
    }

    fn from_ref(post: &PostRef) -> Self {
        Cursor::Position {
            created_at: post.created_at,
            cid: post.cid.clone(),
        }
    }
}

/// One feed entry on the wire: a bare post reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub post: String,
}

/// Wire response: `{ "cursor": ..., "feed": [{ "post": uri }, ...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub cursor: String,
    pub feed: Vec<FeedItem>,
}

impl Page {
    fn eof() -> Self {
        Self {
            cursor: CURSOR_EOF.to_string(),
            feed: Vec::new(),
        }
    }
}

/// Read-only pagination over the stored feed. Safe to share and call
/// concurrently with ingestion.
pub struct FeedPaginator {
    db: FeedDb,
}

impl FeedPaginator {
    pub fn new(db: FeedDb) -> Self {
        Self { db }
    }

    /// One page of the feed starting strictly after `cursor`, newest first.
    /// An absent or empty cursor starts from the most recent post.
    pub fn get_page(&self, cursor: Option<&str>, limit: i64) -> Result<Page, FeedError> {
        // The terminal page is idempotent for any limit, valid or not.
        if cursor == Some(CURSOR_EOF) {
            return Ok(Page::eof());
        }

        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(FeedError::InvalidLimit(limit));
        }

        let boundary = match cursor {
            None | Some("") => None,
            Some(raw) => match Cursor::parse(raw)? {
                Cursor::Eof => return Ok(Page::eof()),
                Cursor::Position { created_at, cid } => Some((created_at, cid)),
            },
        };

        let refs = PostStore::new(&self.db)
            .page_before(boundary.as_ref().map(|(t, c)| (*t, c.as_str())), limit)?;

        // Fewer rows than asked for means the feed is exhausted.
        let next = match refs.last() {
            Some(last) if refs.len() as i64 >= limit => Cursor::from_ref(last),
            _ => Cursor::Eof,
        };

        Ok(Page {
            cursor: next.encode(),
            feed: refs
                .into_iter()
                .map(|r| FeedItem { post: r.uri })
                .collect(),
        })
    }
}
