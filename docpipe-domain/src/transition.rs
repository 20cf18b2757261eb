// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Transitions and the processor contract they invoke.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::document::Document;
use crate::error::DocPipeError;

/// The result of running a processor on one document: either a single
/// successor or a fan-out of several.
///
/// Mirrors the "one document or list of documents" contract in the external
/// interface; callers that always want a slice should go through
/// [`ProcessorOutput::into_vec`] rather than matching on the variant.
#[derive(Debug, Clone)]
pub enum ProcessorOutput {
    Single(Document),
    Many(Vec<Document>),
}

impl ProcessorOutput {
    /// Normalize into a flat, possibly-empty list of documents.
    pub fn into_vec(self) -> Vec<Document> {
        match self {
            ProcessorOutput::Single(doc) => vec![doc],
            ProcessorOutput::Many(docs) => docs,
        }
    }
}

impl From<Document> for ProcessorOutput {
    fn from(doc: Document) -> Self {
        ProcessorOutput::Single(doc)
    }
}

impl From<Vec<Document>> for ProcessorOutput {
    fn from(docs: Vec<Document>) -> Self {
        ProcessorOutput::Many(docs)
    }
}

/// A user-supplied asynchronous transformation from one document to its
/// successor(s).
///
/// Implementations must not call back into the document store and must not
/// mutate the document passed to [`Processor::process`]; the engine owns
/// persistence and lineage assignment on the output. Implementations need
/// not set `id` or `parent_id` on produced documents — the engine assigns
/// both — but must set `state` to the transition's `to_state`, since the
/// engine does not rewrite it.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, doc: &Document) -> Result<ProcessorOutput, DocPipeError>;
}

/// Adapts any `Fn(&Document) -> Fut` closure into a [`Processor`], so tests
/// and simple pipelines don't need to name a struct per transition.
pub struct FnProcessor<F> {
    func: F,
}

impl<F> FnProcessor<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> Processor for FnProcessor<F>
where
    F: Fn(&Document) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<ProcessorOutput, DocPipeError>> + Send,
{
    async fn process(&self, doc: &Document) -> Result<ProcessorOutput, DocPipeError> {
        (self.func)(doc).await
    }
}

/// A labeled edge in the state graph together with the processor it invokes.
#[derive(Clone)]
pub struct Transition {
    from_state: String,
    to_state: String,
    processor: Arc<dyn Processor>,
    /// A stable, human-readable identifier for the processor, recorded as
    /// the `process_function` reserved metadata key on error documents.
    processor_name: String,
}

impl Transition {
    pub fn new(
        from_state: impl Into<String>,
        to_state: impl Into<String>,
        processor_name: impl Into<String>,
        processor: Arc<dyn Processor>,
    ) -> Self {
        Self {
            from_state: from_state.into(),
            to_state: to_state.into(),
            processor,
            processor_name: processor_name.into(),
        }
    }

    pub fn from_state(&self) -> &str {
        &self.from_state
    }

    pub fn to_state(&self) -> &str {
        &self.to_state
    }

    pub fn processor_name(&self) -> &str {
        &self.processor_name
    }

    pub async fn invoke(&self, doc: &Document) -> Result<ProcessorOutput, DocPipeError> {
        self.processor.process(doc).await
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("from_state", &self.from_state)
            .field("to_state", &self.to_state)
            .field("processor_name", &self.processor_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_transition() -> Transition {
        Transition::new(
            "link",
            "download",
            "noop",
            Arc::new(FnProcessor::new(|doc: &Document| {
                let mut child = doc.clone();
                child.state = "download".to_string();
                child.id = String::new();
                child.parent_id = None;
                async move { Ok(ProcessorOutput::Single(child)) }
            })),
        )
    }

    #[tokio::test]
    async fn invoke_runs_the_processor() {
        let t = noop_transition();
        let input = Document::new("link").with_content("hi");
        let out = t.invoke(&input).await.unwrap();
        let docs = out.into_vec();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].state, "download");
    }

    #[test]
    fn processor_output_normalizes() {
        let single = ProcessorOutput::Single(Document::new("x"));
        assert_eq!(single.into_vec().len(), 1);

        let many = ProcessorOutput::Many(vec![Document::new("x"), Document::new("x")]);
        assert_eq!(many.into_vec().len(), 2);
    }
}
