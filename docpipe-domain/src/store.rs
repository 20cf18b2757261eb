// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The document store contract: the durable-persistence port the engine is
//! built against. `docpipe` ships one conforming SQLite implementation; this
//! trait is the seam a caller could substitute another backend at.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value as JsonValue;

use crate::document::Document;
use crate::error::DocPipeError;

/// Filters accepted by [`DocumentStore::list`].
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Required: only documents in this state are returned.
    pub state: String,
    /// If true, exclude documents that have at least one stored child.
    pub leaf: bool,
    /// If false, the returned documents' `content` field is `None`.
    pub include_content: bool,
    /// Every (key, value) pair here must be present in a document's
    /// metadata for it to match.
    pub metadata_filters: HashMap<String, JsonValue>,
}

impl ListQuery {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            leaf: true,
            include_content: true,
            metadata_filters: HashMap::new(),
        }
    }

    pub fn leaf(mut self, leaf: bool) -> Self {
        self.leaf = leaf;
        self
    }

    pub fn include_content(mut self, include: bool) -> Self {
        self.include_content = include;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.metadata_filters.insert(key.into(), value);
        self
    }
}

/// Durable CRUD over documents, with the transactional and query guarantees
/// the executor and driver depend on.
///
/// All operations are safe under concurrent invocation. Every write is
/// atomic at the granularity of a single call; multi-document calls are
/// all-or-nothing.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert one or more documents in a single atomic write. A document
    /// with an absent (empty) `id` is assigned one before the call returns.
    /// Fails with [`DocPipeError::Conflict`] if any id already exists.
    /// `add(&[])` is a no-op returning `Ok(vec![])`.
    async fn add(&self, docs: Vec<Document>) -> Result<Vec<String>, DocPipeError>;

    /// Fetch a document and its children's ids in one read. With
    /// `include_content = false`, the `content` field of the result is
    /// `None` regardless of the stored value.
    async fn get(&self, id: &str, include_content: bool) -> Result<Option<Document>, DocPipeError>;

    /// Fetch several documents by id in one query. Missing ids are silently
    /// omitted. `get_batch(&[])` is a no-op returning `Ok(vec![])`.
    async fn get_batch(&self, ids: &[String]) -> Result<Vec<Document>, DocPipeError>;

    /// Documents matching a [`ListQuery`].
    async fn list(&self, query: ListQuery) -> Result<Vec<Document>, DocPipeError>;

    /// Count of all documents, or of documents in a given state.
    async fn count(&self, state: Option<&str>) -> Result<u64, DocPipeError>;

    /// Remove a document and every descendant (cascade). Idempotent:
    /// deleting a missing id is a no-op.
    async fn delete(&self, id: &str) -> Result<(), DocPipeError>;

    /// Merge `metadata_updates` into the stored document's metadata
    /// (per-key overwrite). Fails with [`DocPipeError::NotFound`] if `id` is
    /// unknown. If `expected` is supplied, fails with
    /// [`DocPipeError::Mismatch`] when its (`state`, `content`,
    /// `media_type`) disagree with the stored record. Neither `state` nor
    /// `content` is mutable via this call.
    async fn update(
        &self,
        id: &str,
        expected: Option<&Document>,
        metadata_updates: HashMap<String, JsonValue>,
    ) -> Result<Document, DocPipeError>;

    /// Stream a document's content in fixed-size chunks, in order. Fails
    /// with [`DocPipeError::NotFound`] if `id` is absent. Empty content
    /// yields a single empty chunk.
    async fn stream_content(
        &self,
        id: &str,
        chunk_size: usize,
    ) -> Result<BoxStream<'static, Result<String, DocPipeError>>, DocPipeError>;

    /// Atomically link and persist a transition's output: assign `parent_id`
    /// and an id (if absent) to every child, then insert them all in one
    /// transaction. Returns the children as persisted (ids and `parent_id`
    /// filled in), in input order.
    ///
    /// This is the executor's step 5 (§4.4) exposed as a single store call
    /// rather than a generic `with_transaction(f)` taking a caller-supplied
    /// closure: a trait object can't take a generic async closure parameter
    /// without losing object-safety, and the executor only ever needs this
    /// one shape of transaction, so naming it directly is both simpler and
    /// still exactly as atomic as the abstract contract requires. Fails
    /// with [`DocPipeError::NotFound`] if `parent_id` does not exist.
    async fn persist_children(
        &self,
        parent_id: &str,
        children: Vec<Document>,
    ) -> Result<Vec<Document>, DocPipeError>;
}
