// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Driver & Lifecycle (C6, C7)
//!
//! [`DocPipeEngine`] owns the store connection pool and the bound document
//! type, and exposes `finish` — the loop that drives a batch of documents to
//! a terminal fixed point (§4.6).

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use docpipe_bootstrap::{CancellationToken, ShutdownCoordinator};
use docpipe_domain::{DocPipeError, Document, DocumentStore, DocumentType, ListQuery};

use crate::config::EngineConfig;
use crate::executor::TransitionExecutor;
use crate::scheduler::BatchScheduler;
use crate::store::SqliteDocumentStore;

/// The engine: a bound document type plus the store and scheduler it drives
/// work through.
///
/// Construction takes ownership of the store's connection pool (§4.7);
/// rebinding the document type is rejected with [`DocPipeError::Busy`] while
/// a `finish` call is in flight (§5's "forbids rebinding the type while the
/// driver is active").
pub struct DocPipeEngine {
    store: Arc<dyn DocumentStore>,
    document_type: RwLock<Arc<DocumentType>>,
    error_state: String,
    max_concurrency: usize,
    driver_active: AtomicBool,
    shutdown: ShutdownCoordinator,
}

impl DocPipeEngine {
    /// Connect to the backend named by `config.connection_string`, ensure
    /// its schema, and bind `document_type` (an empty graph if none is
    /// given — useful for a store-only engine that is rebound later).
    pub async fn new(config: EngineConfig, document_type: Option<DocumentType>) -> Result<Self, DocPipeError> {
        config.validate()?;

        let store = SqliteDocumentStore::connect(
            &config.connection_string,
            config.pool_size,
            config.max_overflow,
            Duration::from_secs(config.pool_timeout_secs),
            Duration::from_secs(config.pool_recycle_secs),
            config.echo,
        )
        .await?;

        let document_type = document_type.unwrap_or_else(|| DocumentType::new(Vec::new(), Vec::new()).expect("empty graph is always valid"));

        Ok(Self {
            store: Arc::new(store),
            document_type: RwLock::new(Arc::new(document_type)),
            error_state: config.error_state,
            max_concurrency: config.max_concurrency,
            driver_active: AtomicBool::new(false),
            shutdown: ShutdownCoordinator::default(),
        })
    }

    /// Build an engine directly over an already-open store, for callers that
    /// manage their own connection (e.g. tests, or a shared pool).
    pub fn with_store(store: Arc<dyn DocumentStore>, document_type: DocumentType, error_state: impl Into<String>, max_concurrency: usize) -> Self {
        Self {
            store,
            document_type: RwLock::new(Arc::new(document_type)),
            error_state: error_state.into(),
            max_concurrency,
            driver_active: AtomicBool::new(false),
            shutdown: ShutdownCoordinator::default(),
        }
    }

    /// A cancellation token tied to this engine's shutdown coordinator; pass
    /// to long-lived callers that should observe [`Self::shutdown`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.token()
    }

    /// Begin graceful shutdown: in-flight executors finish their current
    /// transaction, queued ones never start.
    pub fn shutdown(&self) {
        self.shutdown.initiate_shutdown();
    }

    /// Replace the bound document type. Fails with [`DocPipeError::Busy`] if
    /// a `finish` call is currently in flight.
    pub fn rebind(&self, document_type: DocumentType) -> Result<(), DocPipeError> {
        if self.driver_active.load(Ordering::SeqCst) {
            return Err(DocPipeError::Busy);
        }
        *self.document_type.write() = Arc::new(document_type);
        Ok(())
    }

    fn bound_type(&self) -> Arc<DocumentType> {
        self.document_type.read().clone()
    }

    /// Drive `docs` to a terminal fixed point (§4.6) and return every
    /// terminal document reached, including error documents.
    #[tracing::instrument(skip(self, docs), fields(input_len = docs.len()))]
    pub async fn finish(&self, docs: Vec<Document>) -> Result<Vec<Document>, DocPipeError> {
        if self
            .driver_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DocPipeError::Busy);
        }
        let result = self.finish_inner(docs).await;
        self.driver_active.store(false, Ordering::SeqCst);
        result
    }

    async fn finish_inner(&self, docs: Vec<Document>) -> Result<Vec<Document>, DocPipeError> {
        let document_type = self.bound_type();
        let executor = Arc::new(TransitionExecutor::new(document_type.clone(), self.store.clone(), self.error_state.clone()));
        let scheduler = BatchScheduler::new(executor, self.max_concurrency);
        let token = self.shutdown.token();

        let mut terminal_set: HashSet<String> = document_type.final_states();
        terminal_set.insert(self.error_state.clone());

        let known_ids: Vec<String> = docs.iter().filter(|d| !d.id.is_empty()).map(|d| d.id.clone()).collect();
        let existing_ids: HashSet<String> = self
            .store
            .get_batch(&known_ids)
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect();

        let mut working = docs;
        let to_insert_indices: Vec<usize> = working
            .iter()
            .enumerate()
            .filter(|(_, d)| d.id.is_empty() || !existing_ids.contains(&d.id))
            .map(|(i, _)| i)
            .collect();
        if !to_insert_indices.is_empty() {
            let to_insert: Vec<Document> = to_insert_indices.iter().map(|&i| working[i].clone()).collect();
            let assigned_ids = self.store.add(to_insert).await?;
            for (i, id) in to_insert_indices.into_iter().zip(assigned_ids) {
                working[i].id = id;
            }
        }

        loop {
            working.retain(|d| !terminal_set.contains(&d.state));
            if working.is_empty() {
                break;
            }

            let produced = scheduler.run(working, &token).await?;
            if produced.is_empty() {
                break;
            }
            working = produced;
        }

        let mut gathered = Vec::new();
        for state in &terminal_set {
            gathered.extend(self.store.list(ListQuery::new(state.clone()).leaf(false)).await?);
        }

        Ok(gathered)
    }
}
