// SPDX-License-Identifier: MPL-2.0

//! Relevance and archival gating for candidate posts.
//!
//! Two independent decisions: `should_ignore` drops posts that are too old to
//! index at all, `is_relevant` decides whether a post belongs in the regional
//! feed. Both are pure so they can be exercised without a database.

use crate::config::FilterConfig;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

/// Compiled form of [`FilterConfig`]: keywords lowercased once so matching
/// stays allocation-light per post.
#[derive(Debug, Clone)]
pub struct RegionFilter {
    keywords: Vec<String>,
    allow_list: HashSet<String>,
    ignore_archived: bool,
    archive_threshold: Duration,
}

impl RegionFilter {
    pub fn new(config: &FilterConfig) -> Self {
        // Empty keywords would substring-match everything; drop them here.
        let keywords = config
            .keywords
            .iter()
            .filter(|k| !k.is_empty())
            .map(|k| k.to_lowercase())
            .collect();

        Self {
            keywords,
            allow_list: config.allow_list.clone(),
            ignore_archived: config.ignore_archived,
            archive_threshold: Duration::hours(config.archive_threshold_hours),
        }
    }

    /// Whether a post belongs in the feed: allow-listed author, or any
    /// configured keyword appearing in the text (case-insensitive).
    pub fn is_relevant(&self, text: &str, author: &str) -> bool {
        if self.allow_list.contains(author) {
            return true;
        }

        let text_lower = text.to_lowercase();
        self.keywords.iter().any(|k| text_lower.contains(k.as_str()))
    }

    /// Whether a post is too old to index. Evaluated before relevance; an
    /// old-and-relevant post is still ignored. `now` is the ingestion wall
    /// clock; the decision is made once at filter time and never revisited.
    pub fn should_ignore(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.ignore_archived && now - created_at > self.archive_threshold
    }
}

impl Default for RegionFilter {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}
