// SPDX-License-Identifier: MPL-2.0

//! Durable post storage and the per-subscription checkpoint.

mod checkpoint;
mod db;
mod posts;
mod schema;

pub use checkpoint::CheckpointStore;
pub use db::FeedDb;
pub use posts::{Post, PostRef, PostStore};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("not found")]
    NotFound,
    #[error("database path error: {0}")]
    Path(String),
}
