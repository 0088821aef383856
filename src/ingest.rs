// SPDX-License-Identifier: MPL-2.0

//! Ingestion pipeline: applies one upstream event batch to the store.
//!
//! A batch is two atomic steps. Deletes land first as one statement, then all
//! filtered creates commit in a single transaction together with the
//! subscription checkpoint. If the create commit fails nothing from it is
//! visible and the checkpoint stays put, so the upstream can redeliver the
//! batch safely (deletes are idempotent, inserts upsert by uri).

use crate::event::EventBatch;
use crate::filter::RegionFilter;
use crate::store::{CheckpointStore, FeedDb, Post, PostStore, StoreError};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// What a batch did, for operator logs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Posts written to the feed.
    pub created: usize,
    /// Posts removed from the feed.
    pub deleted: usize,
    /// Create events dropped before filtering: undecodable or archived.
    /// Irrelevant posts are not counted here; dropping those is the job.
    pub skipped: usize,
}

/// Sequential consumer of event batches for one upstream subscription.
pub struct IngestPipeline {
    db: FeedDb,
    filter: RegionFilter,
    service: String,
}

impl IngestPipeline {
    pub fn new(db: FeedDb, filter: RegionFilter, service: impl Into<String>) -> Self {
        Self {
            db,
            filter,
            service: service.into(),
        }
    }

    /// Last committed upstream cursor for this subscription.
    pub fn checkpoint(&self) -> Result<Option<i64>, IngestError> {
        Ok(CheckpointStore::new(&self.db).get(&self.service)?)
    }

    /// Apply one batch: delete-set, then filtered insert-set plus checkpoint.
    pub fn apply_batch(&self, batch: &EventBatch) -> Result<BatchStats, IngestError> {
        let posts = PostStore::new(&self.db);

        let delete_uris: Vec<String> =
            batch.deletes.iter().map(|d| d.uri.clone()).collect();
        let deleted = posts.delete_by_uris(&delete_uris)?;
        if deleted > 0 {
            tracing::debug!(deleted, "removed deleted posts from feed");
        }

        let now = Utc::now();
        let now_millis = now.timestamp_millis();

        let mut candidates = Vec::new();
        let mut skipped = 0usize;

        for event in &batch.creates {
            if event.uri.is_empty() {
                tracing::warn!("skipping create event with empty uri");
                skipped += 1;
                continue;
            }

            let created_at = match DateTime::parse_from_rfc3339(&event.created_at) {
                Ok(t) => t.with_timezone(&Utc),
                Err(e) => {
                    tracing::warn!(
                        uri = %event.uri,
                        created_at = %event.created_at,
                        error = %e,
                        "skipping create event with undecodable timestamp"
                    );
                    skipped += 1;
                    continue;
                }
            };

            tracing::debug!(
                uri = %event.uri,
                author = %event.author,
                created_at = %event.created_at,
                has_media = event.embed_kind.has_media(),
                text = %event.text.replace('\n', " "),
                "new post"
            );

            if self.filter.should_ignore(created_at, now) {
                tracing::debug!(uri = %event.uri, "ignoring archived post");
                skipped += 1;
                continue;
            }

            if !self.filter.is_relevant(&event.text, &event.author) {
                continue;
            }

            let mut post = Post::new(
                &event.uri,
                &event.cid,
                &event.author,
                &event.text,
                created_at.timestamp_millis(),
                now_millis,
            );
            post.has_media = event.embed_kind.has_media();
            post.reply_parent = event.reply_parent.clone();
            post.reply_root = event.reply_root.clone();
            candidates.push(post);
        }

        let created = candidates.len();
        posts.commit_creates(&candidates, &self.service, batch.cursor)?;
        if created > 0 {
            tracing::debug!(created, "added posts to feed");
        }

        Ok(BatchStats {
            created,
            deleted,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::event::{CreateEvent, DeleteEvent, EmbedKind};
    use chrono::Duration;

    const SERVICE: &str = "wss://bsky.network";

    fn pipeline(db: &FeedDb) -> IngestPipeline {
        IngestPipeline::new(
            db.clone(),
            RegionFilter::new(&FilterConfig::default()),
            SERVICE,
        )
    }

    fn create(uri: &str, cid: &str, text: &str, created_at: DateTime<Utc>) -> CreateEvent {
        CreateEvent {
            uri: uri.to_string(),
            cid: cid.to_string(),
            author: "did:plc:someone".to_string(),
            text: text.to_string(),
            created_at: created_at.to_rfc3339(),
            embed_kind: EmbedKind::None,
            reply_parent: None,
            reply_root: None,
        }
    }

    fn batch(creates: Vec<CreateEvent>, deletes: Vec<DeleteEvent>, cursor: i64) -> EventBatch {
        EventBatch {
            creates,
            deletes,
            cursor,
        }
    }

    #[test]
    fn test_relevant_create_is_stored() {
        let db = FeedDb::open_in_memory().unwrap();
        let now = Utc::now();

        let stats = pipeline(&db)
            .apply_batch(&batch(
                vec![
                    create("at://a/1", "c1", "Ithaca parade", now),
                    create("at://a/2", "c2", "unrelated", now + Duration::seconds(1)),
                ],
                vec![],
                7,
            ))
            .unwrap();

        assert_eq!(stats, BatchStats { created: 1, deleted: 0, skipped: 0 });

        let posts = PostStore::new(&db);
        assert!(posts.contains("at://a/1").unwrap());
        assert!(!posts.contains("at://a/2").unwrap());
    }

    #[test]
    fn test_stored_post_fields() {
        let db = FeedDb::open_in_memory().unwrap();
        let now = Utc::now();

        let mut event = create("at://a/1", "c1", "tompkins county news", now);
        event.embed_kind = EmbedKind::Image;
        event.reply_parent = Some("at://parent".to_string());
        event.reply_root = Some("at://root".to_string());

        pipeline(&db)
            .apply_batch(&batch(vec![event], vec![], 1))
            .unwrap();

        let post = PostStore::new(&db).get("at://a/1").unwrap();
        assert_eq!(post.author, "did:plc:someone");
        assert!(post.has_media);
        assert_eq!(post.reply_parent.as_deref(), Some("at://parent"));
        assert_eq!(post.reply_root.as_deref(), Some("at://root"));
        assert_eq!(post.created_at, now.timestamp_millis());
        assert_eq!(post.like_count, 0);
        assert_eq!(post.score, 0.0);
    }

    #[test]
    fn test_deletes_applied_and_idempotent() {
        let db = FeedDb::open_in_memory().unwrap();
        let pipeline = pipeline(&db);
        let now = Utc::now();

        pipeline
            .apply_batch(&batch(
                vec![create("at://a/1", "c1", "cayuga lake sunrise", now)],
                vec![],
                1,
            ))
            .unwrap();

        let deletes = vec![
            DeleteEvent { uri: "at://a/1".to_string() },
            DeleteEvent { uri: "at://never-stored".to_string() },
        ];
        let stats = pipeline.apply_batch(&batch(vec![], deletes.clone(), 2)).unwrap();
        assert_eq!(stats.deleted, 1);

        // Redelivery deletes nothing and still succeeds.
        let stats = pipeline.apply_batch(&batch(vec![], deletes, 3)).unwrap();
        assert_eq!(stats.deleted, 0);
        assert!(!PostStore::new(&db).contains("at://a/1").unwrap());
    }

    #[test]
    fn test_undecodable_event_skipped_batch_continues() {
        let db = FeedDb::open_in_memory().unwrap();
        let now = Utc::now();

        let mut bad = create("at://a/1", "c1", "ithaca commons", now);
        bad.created_at = "not a timestamp".to_string();
        let good = create("at://a/2", "c2", "ithaca commons", now);
        let no_uri = create("", "c3", "ithaca commons", now);

        let stats = pipeline(&db)
            .apply_batch(&batch(vec![bad, good, no_uri], vec![], 1))
            .unwrap();

        assert_eq!(stats.created, 1);
        assert_eq!(stats.skipped, 2);
        assert!(PostStore::new(&db).contains("at://a/2").unwrap());
    }

    #[test]
    fn test_archived_post_ignored_even_when_relevant() {
        let db = FeedDb::open_in_memory().unwrap();
        let old = Utc::now() - Duration::hours(48);

        let stats = pipeline(&db)
            .apply_batch(&batch(
                vec![create("at://a/1", "c1", "cornell homecoming", old)],
                vec![],
                1,
            ))
            .unwrap();

        assert_eq!(stats.created, 0);
        assert_eq!(stats.skipped, 1);
        assert_eq!(PostStore::new(&db).count().unwrap(), 0);
    }

    #[test]
    fn test_checkpoint_advances_on_every_commit() {
        let db = FeedDb::open_in_memory().unwrap();
        let pipeline = pipeline(&db);
        let now = Utc::now();

        assert_eq!(pipeline.checkpoint().unwrap(), None);

        // A batch with nothing relevant still checkpoints.
        pipeline
            .apply_batch(&batch(
                vec![create("at://a/1", "c1", "unrelated", now)],
                vec![],
                11,
            ))
            .unwrap();
        assert_eq!(pipeline.checkpoint().unwrap(), Some(11));

        pipeline
            .apply_batch(&batch(
                vec![create("at://a/2", "c2", "trumansburg fair", now)],
                vec![],
                12,
            ))
            .unwrap();
        assert_eq!(pipeline.checkpoint().unwrap(), Some(12));
    }

    #[test]
    fn test_ingest_then_page_end_to_end() {
        use crate::feed::{CURSOR_EOF, FeedPaginator};

        let db = FeedDb::open_in_memory().unwrap();
        let now = Utc::now();

        pipeline(&db)
            .apply_batch(&batch(
                vec![
                    create("at://a/1", "c1", "Ithaca parade", now),
                    create("at://a/2", "c2", "unrelated", now + Duration::seconds(1)),
                ],
                vec![],
                1,
            ))
            .unwrap();

        let page = FeedPaginator::new(db).get_page(None, 10).unwrap();
        let uris: Vec<_> = page.feed.iter().map(|i| i.post.as_str()).collect();
        assert_eq!(uris, ["at://a/1"]);
        assert_eq!(page.cursor, CURSOR_EOF);
    }

    #[test]
    fn test_deleted_post_never_served_again() {
        use crate::feed::FeedPaginator;

        let db = FeedDb::open_in_memory().unwrap();
        let pipeline = pipeline(&db);
        let now = Utc::now();

        pipeline
            .apply_batch(&batch(
                vec![
                    create("at://a/1", "c1", "ithaca waterfall", now),
                    create("at://a/2", "c2", "cayuga heights", now + Duration::seconds(1)),
                ],
                vec![],
                1,
            ))
            .unwrap();
        pipeline
            .apply_batch(&batch(
                vec![],
                vec![DeleteEvent { uri: "at://a/1".to_string() }],
                2,
            ))
            .unwrap();

        let page = FeedPaginator::new(db).get_page(None, 10).unwrap();
        assert!(page.feed.iter().all(|i| i.post != "at://a/1"));
        assert_eq!(page.feed.len(), 1);
    }

    #[test]
    fn test_failed_commit_leaves_store_and_checkpoint_untouched() {
        let db = FeedDb::open_in_memory().unwrap();
        let now = Utc::now();

        // Breaking the posts table makes the insert transaction fail while
        // the delete step still works.
        pipeline(&db)
            .apply_batch(&batch(
                vec![create("at://a/1", "c1", "ithaca farmers market", now)],
                vec![],
                5,
            ))
            .unwrap();
        {
            let conn = db.conn();
            conn.execute_batch("ALTER TABLE posts RENAME TO posts_broken")
                .unwrap();
        }

        let result = pipeline(&db).apply_batch(&batch(
            vec![create("at://a/2", "c2", "ithaca gorges", now)],
            vec![],
            6,
        ));
        assert!(matches!(result, Err(IngestError::Store(_))));

        {
            let conn = db.conn();
            conn.execute_batch("ALTER TABLE posts_broken RENAME TO posts")
                .unwrap();
        }
        let pipeline = pipeline(&db);
        assert_eq!(pipeline.checkpoint().unwrap(), Some(5));
        assert!(!PostStore::new(&db).contains("at://a/2").unwrap());
    }
}
