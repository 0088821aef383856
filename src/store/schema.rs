// SPDX-License-Identifier: MPL-2.0

/// SQL schema for the feed database
pub const SCHEMA: &str = r#"
-- Database version for migrations
PRAGMA user_version = 1;

-- posts: filtered posts that made it into the feed.
-- created_at/indexed_at are unix milliseconds UTC.
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uri TEXT NOT NULL UNIQUE CHECK(length(uri) > 0),
    cid TEXT NOT NULL,
    reply_parent TEXT,
    reply_root TEXT,
    author TEXT NOT NULL,
    text TEXT NOT NULL,
    has_media INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    indexed_at INTEGER NOT NULL,
    like_count INTEGER NOT NULL DEFAULT 0,
    repost_count INTEGER NOT NULL DEFAULT 0,
    reply_count INTEGER NOT NULL DEFAULT 0,
    score REAL NOT NULL DEFAULT 0.0
);

CREATE INDEX IF NOT EXISTS idx_posts_created_score ON posts(created_at, score);
CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author);
CREATE INDEX IF NOT EXISTS idx_posts_feed_order ON posts(created_at DESC, cid DESC);

-- subscription_state: last-applied upstream cursor per subscription source.
CREATE TABLE IF NOT EXISTS subscription_state (
    service TEXT PRIMARY KEY,
    cursor INTEGER NOT NULL
);
"#;
