// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end scenarios for the `finish` driver loop, one per seed test in
//! the engine's testable-properties catalog: a single-transition happy path,
//! fan-out chunking, error capture, a mixed batch, and bounded concurrency.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docpipe::{DocPipeEngine, EngineConfig};
use docpipe_domain::{DocPipeError, Document, FnProcessor, ProcessorOutput, State, Transition};

fn child_of(doc: &Document, state: &str) -> Document {
    let mut child = doc.clone();
    child.id = String::new();
    child.parent_id = None;
    child.state = state.to_string();
    child
}

async fn engine_with(states: Vec<&str>, transitions: Vec<Transition>) -> DocPipeEngine {
    let document_type = docpipe_domain::DocumentType::new(states.into_iter().map(State::new).collect(), transitions).unwrap();
    // SQLite's `:memory:` database is per-connection, so a pool of more than
    // one connection would see an empty database on the second connection;
    // `EngineConfig::default`'s pool_size is tuned for a real file, not this.
    let config = EngineConfig {
        pool_size: 1,
        ..EngineConfig::default()
    };
    DocPipeEngine::new(config, Some(document_type)).await.unwrap()
}

#[tokio::test]
async fn scenario_a_single_transition_happy_path() {
    let download = FnProcessor::new(|doc: &Document| {
        let mut child = child_of(doc, "download");
        child.content = Some("OK".to_string());
        async move { Ok(ProcessorOutput::Single(child)) }
    });
    let engine = engine_with(
        vec!["link", "download"],
        vec![Transition::new("link", "download", "download", Arc::new(download))],
    )
    .await;

    let input = Document::new("link");
    let input_id = input.id.clone();
    let result = engine.finish(vec![input]).await.unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].state, "download");
    assert_eq!(result[0].content.as_deref(), Some("OK"));
    assert_eq!(result[0].parent_id.as_deref(), Some(input_id.as_str()));
}

#[tokio::test]
async fn scenario_b_fan_out_chunking() {
    let chunk = FnProcessor::new(|doc: &Document| {
        let children: Vec<Document> = ["A", "B", "C"]
            .iter()
            .map(|c| {
                let mut child = child_of(doc, "chunk");
                child.content = Some(c.to_string());
                child
            })
            .collect();
        async move { Ok(ProcessorOutput::Many(children)) }
    });
    let engine = engine_with(vec!["raw", "chunk"], vec![Transition::new("raw", "chunk", "chunk", Arc::new(chunk))]).await;

    let input = Document::new("raw").with_content("ABC");
    let input_id = input.id.clone();
    let result = engine.finish(vec![input]).await.unwrap();

    assert_eq!(result.len(), 3);
    assert!(result.iter().all(|d| d.state == "chunk" && d.parent_id.as_deref() == Some(input_id.as_str())));

    let parent = engine.finish(vec![]).await;
    assert!(parent.is_ok());
}

#[tokio::test]
async fn scenario_c_error_capture() {
    let boom = FnProcessor::new(|_doc: &Document| async {
        Result::<ProcessorOutput, DocPipeError>::Err(DocPipeError::ProcessorFailure("boom".to_string()))
    });
    let engine = engine_with(
        vec!["link", "download"],
        vec![Transition::new("link", "download", "download", Arc::new(boom))],
    )
    .await;

    let input = Document::new("link");
    let result = engine.finish(vec![input]).await.unwrap();

    assert_eq!(result.len(), 1);
    let error_doc = &result[0];
    assert_eq!(error_doc.state, "error");
    assert_eq!(error_doc.media_type, "application/json");
    assert_eq!(error_doc.metadata["error"], "processor failed: boom");
    assert_eq!(error_doc.metadata["transition_from"], "link");
    assert_eq!(error_doc.metadata["transition_to"], "download");
}

#[tokio::test]
async fn scenario_d_mixed_batch() {
    let download = FnProcessor::new(|doc: &Document| {
        let content_ok = doc.content.as_deref().map(|c| c.contains("ok")).unwrap_or(false);
        let mut child = child_of(doc, "download");
        let result = if content_ok {
            child.content = doc.content.clone();
            Ok(ProcessorOutput::Single(child))
        } else {
            Err(DocPipeError::ProcessorFailure("content marked fail".to_string()))
        };
        async move { result }
    });
    let chunk = FnProcessor::new(|doc: &Document| {
        let child = child_of(doc, "chunk");
        async move { Ok(ProcessorOutput::Single(child)) }
    });
    let embed = FnProcessor::new(|doc: &Document| {
        let child = child_of(doc, "embed");
        async move { Ok(ProcessorOutput::Single(child)) }
    });

    let engine = engine_with(
        vec!["link", "download", "chunk", "embed"],
        vec![
            Transition::new("link", "download", "download", Arc::new(download)),
            Transition::new("download", "chunk", "chunk", Arc::new(chunk)),
            Transition::new("chunk", "embed", "embed", Arc::new(embed)),
        ],
    )
    .await;

    let inputs = vec![
        Document::new("link").with_content("ok-1"),
        Document::new("link").with_content("fail-x"),
        Document::new("link").with_content("ok-2"),
    ];
    let result = engine.finish(inputs).await.unwrap();

    let embed_count = result.iter().filter(|d| d.state == "embed").count();
    let error_count = result.iter().filter(|d| d.state == "error").count();
    assert_eq!(embed_count, 2);
    assert_eq!(error_count, 1);
}

#[tokio::test]
async fn scenario_e_bounded_concurrency() {
    let active = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));
    let active_clone = active.clone();
    let max_seen_clone = max_seen.clone();

    let process = FnProcessor::new(move |doc: &Document| {
        let active = active_clone.clone();
        let max_seen = max_seen_clone.clone();
        let child = child_of(doc, "done");
        async move {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(15)).await;
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(ProcessorOutput::Single(child))
        }
    });

    let document_type = docpipe_domain::DocumentType::new(
        vec![State::new("raw"), State::new("done")],
        vec![Transition::new("raw", "done", "process", Arc::new(process))],
    )
    .unwrap();
    let config = EngineConfig {
        max_concurrency: 2,
        pool_size: 1,
        ..EngineConfig::default()
    };
    let engine = DocPipeEngine::new(config, Some(document_type)).await.unwrap();

    let inputs: Vec<Document> = (0..10).map(|_| Document::new("raw")).collect();
    let result = engine.finish(inputs).await.unwrap();

    assert_eq!(result.len(), 10);
    assert!(max_seen.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn scenario_f_cascade_delete() {
    use docpipe_domain::{DocumentStore, ListQuery};

    let pass_b = FnProcessor::new(|doc: &Document| {
        let child = child_of(doc, "b");
        async move { Ok(ProcessorOutput::Single(child)) }
    });
    let pass_c = FnProcessor::new(|doc: &Document| {
        let child = child_of(doc, "c");
        async move { Ok(ProcessorOutput::Single(child)) }
    });
    let document_type = docpipe_domain::DocumentType::new(
        vec![State::new("a"), State::new("b"), State::new("c")],
        vec![
            Transition::new("a", "b", "pass_b", Arc::new(pass_b)),
            Transition::new("b", "c", "pass_c", Arc::new(pass_c)),
        ],
    )
    .unwrap();

    let store: Arc<dyn DocumentStore> = Arc::new(docpipe::SqliteDocumentStore::in_memory().await.unwrap());
    let engine = DocPipeEngine::with_store(store.clone(), document_type, "error", 4);

    let grandparent = Document::new("a");
    let grandparent_id = grandparent.id.clone();
    let result = engine.finish(vec![grandparent]).await.unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].state, "c");
    assert_eq!(store.count(None).await.unwrap(), 3);

    store.delete(&grandparent_id).await.unwrap();

    assert_eq!(store.count(None).await.unwrap(), 0);
    assert!(store.list(ListQuery::new("b")).await.unwrap().is_empty());
    assert!(store.list(ListQuery::new("c")).await.unwrap().is_empty());
}
