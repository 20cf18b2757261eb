// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Document Store
//!
//! The one conforming [`DocumentStore`] backend this crate ships. Built
//! directly on `sqlx`'s `SqlitePool`, with `metadata` stored as a JSON text
//! column and cascade delete delegated to SQLite's own
//! `ON DELETE CASCADE`, which requires `PRAGMA foreign_keys = ON` to be set
//! per connection — [`SqliteDocumentStore::connect`] configures that on the
//! pool's connect options rather than relying on callers to remember it.
//!
//! `leaf` and metadata-filter predicates in [`SqliteDocumentStore::list`]
//! are applied in Rust after an indexed `state` lookup, not pushed into SQL:
//! metadata values span the full JSON scalar space (strings, numbers,
//! bools), and comparing arbitrary JSON scalars portably in a `WHERE`
//! clause buys little over filtering a typically small result set in
//! application code once it is already in memory.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, Row, SqlitePool};

use docpipe_domain::{DocPipeError, Document, DocumentStore, ListQuery};

use super::schema;

/// A [`DocumentStore`] backed by a SQLite database, reachable through a
/// pooled `sqlx` connection.
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Connect to `connection_string` (e.g. `sqlite://./docpipe.db` or
    /// `sqlite::memory:`), create the schema if missing, and return a store
    /// backed by a pool of `pool_size` connections.
    ///
    /// `max_overflow` has no direct sqlx equivalent (sqlx has no separate
    /// "overflow" pool above the steady-state size, unlike SQLAlchemy's
    /// `QueuePool`), so it is folded into the pool ceiling as
    /// `pool_size + max_overflow`. `pool_recycle_secs` bounds how long a
    /// pooled connection lives before sqlx recycles it. `echo`, when false,
    /// disables sqlx's statement logging; when true it leaves the default
    /// (every statement logged at `DEBUG` through `tracing`/`log`).
    #[allow(clippy::too_many_arguments)]
    pub async fn connect(
        connection_string: &str,
        pool_size: u32,
        max_overflow: u32,
        pool_timeout: Duration,
        pool_recycle: Duration,
        echo: bool,
    ) -> Result<Self, DocPipeError> {
        let mut options = SqliteConnectOptions::from_str(connection_string)
            .map_err(|e| DocPipeError::PersistenceFailure(format!("invalid connection string: {e}")))?
            .create_if_missing(true)
            .pragma("foreign_keys", "ON");

        if !echo {
            options = options.disable_statement_logging();
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size.saturating_add(max_overflow))
            .acquire_timeout(pool_timeout)
            .max_lifetime(pool_recycle)
            .connect_with(options)
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(format!("connecting to store: {e}")))?;

        schema::ensure_schema(&pool)
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(format!("creating schema: {e}")))?;

        Ok(Self { pool })
    }

    /// Convenience constructor for tests: an in-memory database with a
    /// single pooled connection (SQLite's `:memory:` database is
    /// per-connection, so a pool of more than one would see an empty
    /// database on the second connection).
    pub async fn in_memory() -> Result<Self, DocPipeError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .expect("static connection string is always valid")
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(format!("connecting to store: {e}")))?;

        schema::ensure_schema(&pool)
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(format!("creating schema: {e}")))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn child_ids(pool: &SqlitePool, parent_id: &str) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query("SELECT id FROM documents WHERE parent_id = ?")
            .bind(parent_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>("id")).collect())
    }

    fn row_to_document(row: &sqlx::sqlite::SqliteRow, include_content: bool) -> Result<Document, DocPipeError> {
        let metadata_text: String = row.get("metadata");
        let metadata: HashMap<String, JsonValue> = serde_json::from_str(&metadata_text)?;

        Ok(Document {
            id: row.get("id"),
            state: row.get("state"),
            content: if include_content { row.get("content") } else { None },
            media_type: row.get("media_type"),
            url: row.get("url"),
            parent_id: row.get("parent_id"),
            metadata,
            children: Vec::new(),
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn add(&self, docs: Vec<Document>) -> Result<Vec<String>, DocPipeError> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;

        let mut ids = Vec::with_capacity(docs.len());
        for mut doc in docs {
            doc.ensure_id();
            let metadata_text = serde_json::to_string(&doc.metadata)?;

            let result = sqlx::query(
                "INSERT INTO documents (id, state, content, media_type, url, parent_id, metadata) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&doc.id)
            .bind(&doc.state)
            .bind(&doc.content)
            .bind(&doc.media_type)
            .bind(&doc.url)
            .bind(&doc.parent_id)
            .bind(&metadata_text)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => ids.push(doc.id),
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    return Err(DocPipeError::Conflict(doc.id));
                }
                Err(e) => return Err(DocPipeError::PersistenceFailure(e.to_string())),
            }
        }

        tx.commit()
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;

        Ok(ids)
    }

    async fn get(&self, id: &str, include_content: bool) -> Result<Option<Document>, DocPipeError> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;

        let Some(row) = row else { return Ok(None) };
        let mut doc = Self::row_to_document(&row, include_content)?;
        doc.children = Self::child_ids(&self.pool, id)
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;
        Ok(Some(doc))
    }

    async fn get_batch(&self, ids: &[String]) -> Result<Vec<Document>, DocPipeError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = std::iter::repeat("?").take(ids.len()).collect::<Vec<_>>().join(",");
        let sql = format!("SELECT * FROM documents WHERE id IN ({placeholders})");

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut doc = Self::row_to_document(row, true)?;
            doc.children = Self::child_ids(&self.pool, &doc.id)
                .await
                .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;
            docs.push(doc);
        }
        Ok(docs)
    }

    async fn list(&self, query: ListQuery) -> Result<Vec<Document>, DocPipeError> {
        let rows = sqlx::query("SELECT * FROM documents WHERE state = ?")
            .bind(&query.state)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;

        let mut out = Vec::new();
        for row in &rows {
            let mut doc = Self::row_to_document(row, query.include_content)?;
            doc.children = Self::child_ids(&self.pool, &doc.id)
                .await
                .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;

            if query.leaf && doc.has_children() {
                continue;
            }
            if !query
                .metadata_filters
                .iter()
                .all(|(k, v)| doc.metadata.get(k) == Some(v))
            {
                continue;
            }
            out.push(doc);
        }
        Ok(out)
    }

    async fn count(&self, state: Option<&str>) -> Result<u64, DocPipeError> {
        let count: i64 = match state {
            Some(state) => sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE state = ?")
                .bind(state)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?,
            None => sqlx::query_scalar("SELECT COUNT(*) FROM documents")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?,
        };
        Ok(count as u64)
    }

    async fn delete(&self, id: &str) -> Result<(), DocPipeError> {
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;
        Ok(())
    }

    async fn update(
        &self,
        id: &str,
        expected: Option<&Document>,
        metadata_updates: HashMap<String, JsonValue>,
    ) -> Result<Document, DocPipeError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;

        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;
        let Some(row) = row else {
            return Err(DocPipeError::NotFound(id.to_string()));
        };

        let mut doc = Self::row_to_document(&row, true)?;

        if let Some(expected) = expected {
            if expected.state != doc.state || expected.content != doc.content || expected.media_type != doc.media_type
            {
                return Err(DocPipeError::Mismatch {
                    id: id.to_string(),
                    reason: "state, content, or media_type does not match the stored record".to_string(),
                });
            }
        }

        for (k, v) in metadata_updates {
            doc.metadata.insert(k, v);
        }
        let metadata_text = serde_json::to_string(&doc.metadata)?;

        sqlx::query("UPDATE documents SET metadata = ? WHERE id = ?")
            .bind(&metadata_text)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;

        doc.children = Self::child_ids(&self.pool, id)
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;
        Ok(doc)
    }

    async fn stream_content(
        &self,
        id: &str,
        chunk_size: usize,
    ) -> Result<BoxStream<'static, Result<String, DocPipeError>>, DocPipeError> {
        let content: Option<String> = sqlx::query_scalar("SELECT content FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?
            .ok_or_else(|| DocPipeError::NotFound(id.to_string()))?;

        let content = content.unwrap_or_default();
        let chunk_size = chunk_size.max(1);

        let chunks: Vec<String> = if content.is_empty() {
            vec![String::new()]
        } else {
            content
                .chars()
                .collect::<Vec<char>>()
                .chunks(chunk_size)
                .map(|c| c.iter().collect())
                .collect()
        };

        Ok(stream::iter(chunks.into_iter().map(Ok)).boxed())
    }

    async fn persist_children(
        &self,
        parent_id: &str,
        children: Vec<Document>,
    ) -> Result<Vec<Document>, DocPipeError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;

        let parent_exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM documents WHERE id = ?")
            .bind(parent_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;
        if parent_exists.is_none() {
            return Err(DocPipeError::NotFound(parent_id.to_string()));
        }

        let mut persisted = Vec::with_capacity(children.len());
        for mut child in children {
            child.parent_id = Some(parent_id.to_string());
            child.ensure_id();
            let metadata_text = serde_json::to_string(&child.metadata)?;

            sqlx::query(
                "INSERT INTO documents (id, state, content, media_type, url, parent_id, metadata) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&child.id)
            .bind(&child.state)
            .bind(&child.content)
            .bind(&child.media_type)
            .bind(&child.url)
            .bind(&child.parent_id)
            .bind(&metadata_text)
            .execute(&mut *tx)
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;

            persisted.push(child);
        }

        tx.commit()
            .await
            .map_err(|e| DocPipeError::PersistenceFailure(e.to_string()))?;

        Ok(persisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store() -> SqliteDocumentStore {
        SqliteDocumentStore::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn add_then_get_round_trips() {
        let store = store().await;
        let doc = Document::new("link").with_content("hello");
        let ids = store.add(vec![doc.clone()]).await.unwrap();
        assert_eq!(ids.len(), 1);

        let fetched = store.get(&ids[0], true).await.unwrap().unwrap();
        assert_eq!(fetched.state, "link");
        assert_eq!(fetched.content.as_deref(), Some("hello"));
        assert!(fetched.children.is_empty());
    }

    #[tokio::test]
    async fn add_empty_is_a_noop() {
        let store = store().await;
        let ids = store.add(vec![]).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn add_rejects_duplicate_id() {
        let store = store().await;
        let mut doc = Document::new("link");
        doc.id = "fixed-id".to_string();
        store.add(vec![doc.clone()]).await.unwrap();

        let err = store.add(vec![doc]).await.unwrap_err();
        assert!(matches!(err, DocPipeError::Conflict(_)));
    }

    #[tokio::test]
    async fn get_batch_empty_is_a_noop() {
        let store = store().await;
        assert!(store.get_batch(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_batch_omits_missing_ids() {
        let store = store().await;
        let doc = Document::new("link");
        let ids = store.add(vec![doc]).await.unwrap();

        let found = store
            .get_batch(&[ids[0].clone(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn delete_cascades_to_descendants() {
        let store = store().await;
        let grandparent_ids = store.add(vec![Document::new("a")]).await.unwrap();
        let grandparent_id = grandparent_ids[0].clone();

        let mut parent = Document::new("b");
        parent.parent_id = Some(grandparent_id.clone());
        let parent_id = store.add(vec![parent]).await.unwrap().remove(0);

        let mut child = Document::new("c");
        child.parent_id = Some(parent_id.clone());
        store.add(vec![child]).await.unwrap();

        store.delete(&grandparent_id).await.unwrap();

        assert!(store.get(&grandparent_id, true).await.unwrap().is_none());
        assert!(store.get(&parent_id, true).await.unwrap().is_none());
        assert_eq!(store.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_missing_id_is_a_noop() {
        let store = store().await;
        store.delete("does-not-exist").await.unwrap();
    }

    #[tokio::test]
    async fn update_merges_metadata_preserving_other_keys() {
        let store = store().await;
        let doc = Document::new("link").with_metadata("existing", json!("keep-me"));
        let id = store.add(vec![doc]).await.unwrap().remove(0);

        let mut updates = HashMap::new();
        updates.insert("added".to_string(), json!("new-value"));
        let updated = store.update(&id, None, updates).await.unwrap();

        assert_eq!(updated.metadata.get("existing"), Some(&json!("keep-me")));
        assert_eq!(updated.metadata.get("added"), Some(&json!("new-value")));
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let store = store().await;
        let err = store.update("nope", None, HashMap::new()).await.unwrap_err();
        assert!(matches!(err, DocPipeError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_with_mismatched_expected_fails() {
        let store = store().await;
        let doc = Document::new("link");
        let id = store.add(vec![doc]).await.unwrap().remove(0);

        let wrong = Document::new("download");
        let err = store.update(&id, Some(&wrong), HashMap::new()).await.unwrap_err();
        assert!(matches!(err, DocPipeError::Mismatch { .. }));
    }

    #[tokio::test]
    async fn list_excludes_documents_with_children_when_leaf() {
        let store = store().await;
        let parent_id = store.add(vec![Document::new("raw")]).await.unwrap().remove(0);

        let mut query = ListQuery::new("raw");
        let before = store.list(query.clone()).await.unwrap();
        assert_eq!(before.len(), 1);

        let mut child = Document::new("chunk");
        child.parent_id = Some(parent_id.clone());
        store.add(vec![child]).await.unwrap();

        let after = store.list(query.clone()).await.unwrap();
        assert!(after.is_empty());

        query.leaf = false;
        let unfiltered = store.list(query).await.unwrap();
        assert_eq!(unfiltered.len(), 1);
    }

    #[tokio::test]
    async fn stream_content_yields_one_empty_chunk_for_empty_content() {
        let store = store().await;
        let id = store.add(vec![Document::new("link")]).await.unwrap().remove(0);

        let chunks: Vec<_> = store
            .stream_content(&id, 4)
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec![""]);
    }

    #[tokio::test]
    async fn stream_content_chunks_in_order() {
        let store = store().await;
        let doc = Document::new("link").with_content("ABCDEFG");
        let id = store.add(vec![doc]).await.unwrap().remove(0);

        let chunks: Vec<_> = store
            .stream_content(&id, 3)
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["ABC", "DEF", "G"]);
        assert_eq!(chunks.concat(), "ABCDEFG");
    }

    #[tokio::test]
    async fn persist_children_links_and_refreshes_parent() {
        let store = store().await;
        let parent_id = store.add(vec![Document::new("raw")]).await.unwrap().remove(0);

        let children = vec![
            Document::new("chunk").with_content("A"),
            Document::new("chunk").with_content("B"),
        ];
        let persisted = store.persist_children(&parent_id, children).await.unwrap();
        assert_eq!(persisted.len(), 2);
        assert!(persisted.iter().all(|c| c.parent_id.as_deref() == Some(parent_id.as_str())));

        let leaf_chunks = store.list(ListQuery::new("chunk")).await.unwrap();
        assert_eq!(leaf_chunks.len(), 2);
        for c in &leaf_chunks {
            assert_eq!(c.parent_id.as_deref(), Some(parent_id.as_str()));
        }
    }

    #[tokio::test]
    async fn persist_children_to_missing_parent_is_not_found() {
        let store = store().await;
        let err = store
            .persist_children("missing-parent", vec![Document::new("chunk")])
            .await
            .unwrap_err();
        assert!(matches!(err, DocPipeError::NotFound(_)));
    }
}
