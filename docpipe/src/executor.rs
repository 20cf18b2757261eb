// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transition Executor
//!
//! Runs one transition for one document (§4.4): selects the transition,
//! invokes its processor, persists the fan-out, and converts any failure
//! into a durable error document instead of propagating it.

use chrono::Utc;
use std::sync::Arc;

use docpipe_domain::{DocPipeError, Document, DocumentStore, DocumentType};

/// Runs single-document transitions against a bound [`DocumentType`] and
/// [`DocumentStore`].
pub struct TransitionExecutor {
    document_type: Arc<DocumentType>,
    store: Arc<dyn DocumentStore>,
    error_state: String,
}

impl TransitionExecutor {
    pub fn new(document_type: Arc<DocumentType>, store: Arc<dyn DocumentStore>, error_state: impl Into<String>) -> Self {
        Self {
            document_type,
            store,
            error_state: error_state.into(),
        }
    }

    /// Advance `doc` by exactly one transition, per §4.4's procedure.
    ///
    /// Returns the produced children (empty if `doc.state` has no outgoing
    /// transition, or exactly one synthesized error document on failure).
    #[tracing::instrument(skip(self, doc), fields(doc_id = %doc.id, state = %doc.state))]
    pub async fn advance(&self, doc: &Document) -> Result<Vec<Document>, DocPipeError> {
        let transitions = self.document_type.transitions_from(&doc.state);
        let Some(transition) = transitions.first() else {
            tracing::debug!("no outgoing transition, document is terminal-by-no-successor");
            return Ok(Vec::new());
        };

        match transition.invoke(doc).await {
            Ok(output) => {
                let children = output.into_vec();
                match self.store.persist_children(&doc.id, children).await {
                    Ok(persisted) => {
                        tracing::debug!(children = persisted.len(), "transition succeeded");
                        Ok(persisted)
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to persist transition output, recording error document");
                        let error_doc = self
                            .build_error_document(doc, transition.to_state(), transition.processor_name(), &err)
                            .await?;
                        Ok(vec![error_doc])
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "processor failed, recording error document");
                let error_doc = self
                    .build_error_document(doc, transition.to_state(), transition.processor_name(), &err)
                    .await?;
                Ok(vec![error_doc])
            }
        }
    }

    /// Synthesizes and persists the error document in its own short
    /// transaction (§4.4's failure-handling contract), separate from the
    /// transition attempt it records.
    async fn build_error_document(
        &self,
        doc: &Document,
        to_state: &str,
        process_function: &str,
        cause: &DocPipeError,
    ) -> Result<Document, DocPipeError> {
        let mut error_doc = Document::new(self.error_state.clone())
            .with_content(cause.to_string())
            .with_media_type("application/json");

        error_doc.metadata.insert("error".to_string(), cause.to_string().into());
        error_doc
            .metadata
            .insert("error_type".to_string(), cause.kind_name().into());
        error_doc
            .metadata
            .insert("transition_from".to_string(), doc.state.clone().into());
        error_doc
            .metadata
            .insert("transition_to".to_string(), to_state.to_string().into());
        error_doc
            .metadata
            .insert("original_media_type".to_string(), doc.media_type.clone().into());
        error_doc
            .metadata
            .insert("timestamp".to_string(), Utc::now().to_rfc3339().into());
        error_doc
            .metadata
            .insert("process_function".to_string(), process_function.to_string().into());

        let persisted = self.store.persist_children(&doc.id, vec![error_doc]).await?;
        persisted
            .into_iter()
            .next()
            .ok_or_else(|| DocPipeError::PersistenceFailure("error document persist returned no rows".to_string()))
    }
}
