// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Document Pipeline Engine
//!
//! A persistent, concurrent state machine that advances documents through a
//! user-defined directed graph of processing stages. This crate is the
//! infrastructure layer over [`docpipe_domain`]: a SQLite-backed document
//! store (C3), a transition executor (C4), a bounded-concurrency batch
//! scheduler (C5), and the [`DocPipeEngine`] driver/lifecycle (C6, C7).
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docpipe::{DocPipeEngine, EngineConfig};
//! use docpipe_domain::{Document, DocumentType, FnProcessor, ProcessorOutput, State, Transition};
//!
//! # async fn example() -> Result<(), docpipe_domain::DocPipeError> {
//! let processor = FnProcessor::new(|doc: &Document| {
//!     let mut child = doc.clone();
//!     child.id = String::new();
//!     child.parent_id = None;
//!     child.state = "download".to_string();
//!     async move { Ok(ProcessorOutput::Single(child)) }
//! });
//! let document_type = DocumentType::new(
//!     vec![State::new("link"), State::new("download")],
//!     vec![Transition::new("link", "download", "download", Arc::new(processor))],
//! )?;
//!
//! let engine = DocPipeEngine::new(EngineConfig::default(), Some(document_type)).await?;
//! let results = engine.finish(vec![Document::new("link")]).await?;
//! # let _ = results;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod executor;
pub mod scheduler;
pub mod store;

pub use config::EngineConfig;
pub use engine::DocPipeEngine;
pub use executor::TransitionExecutor;
pub use scheduler::BatchScheduler;
pub use store::SqliteDocumentStore;
