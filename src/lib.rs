// SPDX-License-Identifier: MPL-2.0

//! Core of a regional Bluesky feed generator.
//!
//! Upstream firehose plumbing hands this crate batches of already-decoded
//! create/delete events. The crate filters creates against a configurable
//! region predicate, persists the survivors to SQLite, and serves them back
//! as a reverse-chronological, cursor-paginated feed skeleton.
//!
//! The three moving parts:
//!
//! - [`IngestPipeline`] applies one event batch: deletes, then filtered
//!   inserts plus the subscription checkpoint, each as an atomic step.
//! - [`FeedPaginator`] answers `getFeedSkeleton`-shaped page requests.
//! - [`FeedDb`] owns the SQLite connection both of them share.

pub mod config;
pub mod event;
pub mod feed;
pub mod filter;
pub mod ingest;
pub mod store;

pub use config::{ConfigError, FilterConfig};
pub use event::{CreateEvent, DeleteEvent, EmbedKind, EventBatch};
pub use feed::{CURSOR_EOF, Cursor, FeedError, FeedItem, FeedPaginator, MAX_LIMIT, Page};
pub use filter::RegionFilter;
pub use ingest::{BatchStats, IngestError, IngestPipeline};
pub use store::{CheckpointStore, FeedDb, Post, PostRef, PostStore, StoreError};
