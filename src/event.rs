// SPDX-License-Identifier: MPL-2.0

//! Normalized event shapes handed to us by the firehose collaborator.
//!
//! Decoupled from any wire/lexicon representation so the ingestion core owns
//! its own boundary; field names follow the collaborator's JSON contract.

use serde::{Deserialize, Serialize};

/// Kind of embed attached to a post record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedKind {
    #[default]
    None,
    Image,
    Video,
}

impl EmbedKind {
    pub fn has_media(self) -> bool {
        !matches!(self, EmbedKind::None)
    }
}

/// A post creation observed on the upstream stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvent {
    pub uri: String,
    pub cid: String,
    /// DID of the post author.
    pub author: String,
    pub text: String,
    /// Author-asserted creation time, RFC 3339. Parsed (and possibly
    /// rejected) by the ingestion pipeline, not here.
    pub created_at: String,
    #[serde(default)]
    pub embed_kind: EmbedKind,
    #[serde(default)]
    pub reply_parent: Option<String>,
    #[serde(default)]
    pub reply_root: Option<String>,
}

/// A post deletion observed on the upstream stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteEvent {
    pub uri: String,
}

/// One bounded set of events delivered together, tagged with the upstream
/// stream position to checkpoint once the batch commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBatch {
    #[serde(default)]
    pub creates: Vec<CreateEvent>,
    #[serde(default)]
    pub deletes: Vec<DeleteEvent>,
    #[serde(rename = "subscriptionCursor")]
    pub cursor: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_kind_media() {
        assert!(!EmbedKind::None.has_media());
        assert!(EmbedKind::Image.has_media());
        assert!(EmbedKind::Video.has_media());
    }

    #[test]
    fn test_batch_decodes_wire_shape() {
        let json = r#"{
            "creates": [{
                "uri": "at://did:plc:abc/app.bsky.feed.post/1",
                "cid": "bafyc1",
                "author": "did:plc:abc",
                "text": "hello ithaca",
                "createdAt": "2026-08-01T12:00:00Z",
                "embedKind": "image",
                "replyParent": null
            }],
            "deletes": [{ "uri": "at://did:plc:abc/app.bsky.feed.post/0" }],
            "subscriptionCursor": 42
        }"#;

        let batch: EventBatch = serde_json::from_str(json).unwrap();
        assert_eq!(batch.cursor, 42);
        assert_eq!(batch.creates.len(), 1);
        assert_eq!(batch.creates[0].embed_kind, EmbedKind::Image);
        assert!(batch.creates[0].reply_root.is_none());
        assert_eq!(batch.deletes[0].uri, "at://did:plc:abc/app.bsky.feed.post/0");
    }

    #[test]
    fn test_embed_kind_defaults_to_none() {
        let json = r#"{
            "uri": "at://x/app.bsky.feed.post/1",
            "cid": "c",
            "author": "did:plc:abc",
            "text": "",
            "createdAt": "2026-08-01T12:00:00Z"
        }"#;
        let event: CreateEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.embed_kind, EmbedKind::None);
    }
}
