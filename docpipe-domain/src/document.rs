// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The document value type: the unit of work that flows through the engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use ulid::Ulid;

/// Default media type assigned to a freshly constructed document.
pub const DEFAULT_MEDIA_TYPE: &str = "text/plain";

/// A document: the unit of work advanced by the engine.
///
/// A `Document` returned from the store is a snapshot. Mutating it has no
/// effect on the stored record; transitions never mutate a document in
/// place, they create children (see [`Document::add_children`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub state: String,
    pub content: Option<String>,
    #[serde(default = "default_media_type")]
    pub media_type: String,
    pub url: Option<String>,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, JsonValue>,
    /// Ids of this document's children, as seen by the store at read time.
    /// Not a persisted column: the store derives it from `parent_id` on
    /// other rows and populates it on `get`/`get_batch`/`list`.
    #[serde(default)]
    pub children: Vec<String>,
}

fn default_media_type() -> String {
    DEFAULT_MEDIA_TYPE.to_string()
}

impl Document {
    /// Construct a new document in the given state, assigning a fresh id.
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            state: state.into(),
            content: None,
            media_type: DEFAULT_MEDIA_TYPE.to_string(),
            url: None,
            parent_id: None,
            metadata: HashMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style content setter.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Builder-style media type setter.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    /// Builder-style metadata setter.
    pub fn with_metadata(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Assign an id if one is not already set. Used by the store and executor
    /// when persisting documents whose `id` was left for the engine to fill
    /// in.
    pub fn ensure_id(&mut self) {
        if self.id.is_empty() {
            self.id = Ulid::new().to_string();
        }
    }

    /// True iff this document has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// True iff the store has populated at least one child for this snapshot.
    ///
    /// This reflects the `children` view as of the read that produced this
    /// snapshot; it is never derived from any field intrinsic to the document
    /// itself.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Deduplicating append of child ids to the in-memory snapshot.
    ///
    /// Persistence of the parent/child relationship is always via
    /// `parent_id` on the children themselves; this only keeps an in-memory
    /// parent snapshot (e.g. the one returned to a caller after an executor
    /// run) consistent with what was just written.
    pub fn add_children(&mut self, ids: impl IntoIterator<Item = String>) {
        for id in ids {
            if !self.children.contains(&id) {
                self.children.push(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_gets_a_fresh_id() {
        let a = Document::new("link");
        let b = Document::new("link");
        assert_ne!(a.id, b.id);
        assert!(!a.id.is_empty());
    }

    #[test]
    fn new_document_defaults() {
        let d = Document::new("link");
        assert_eq!(d.media_type, "text/plain");
        assert!(d.is_root());
        assert!(!d.has_children());
    }

    #[test]
    fn with_parent_is_not_root() {
        let mut d = Document::new("download");
        d.parent_id = Some("parent-1".to_string());
        assert!(!d.is_root());
    }

    #[test]
    fn add_children_deduplicates() {
        let mut d = Document::new("raw");
        d.add_children(["a".to_string(), "b".to_string()]);
        d.add_children(["b".to_string(), "c".to_string()]);
        assert_eq!(d.children, vec!["a", "b", "c"]);
        assert!(d.has_children());
    }

    proptest::proptest! {
        /// Running `add_children` a second time with any subset of ids
        /// already present never grows the count past the union's size,
        /// regardless of how the ids are interleaved or repeated.
        #[test]
        fn add_children_is_idempotent_under_repetition(
            first in proptest::collection::vec("[a-z]{1,4}", 0..8),
            second in proptest::collection::vec("[a-z]{1,4}", 0..8),
        ) {
            let mut d = Document::new("raw");
            d.add_children(first.clone());
            d.add_children(second.clone());

            let mut expected: Vec<String> = Vec::new();
            for id in first.into_iter().chain(second) {
                if !expected.contains(&id) {
                    expected.push(id);
                }
            }
            assert_eq!(d.children, expected);
        }
    }
}
