// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Document Pipeline Domain
//!
//! Pure, reusable business logic for the document-pipeline engine: the state
//! graph, the document value type, the transition/processor contract, and
//! the document-store port. Nothing here drives an async runtime, owns a
//! connection pool, or decides how to serialize to disk — those are
//! infrastructure concerns that live in the `docpipe` crate, which depends
//! on this one.
//!
//! ## Layering
//!
//! - [`state`] / [`document_type`]: the state graph (C1).
//! - [`document`]: the document value type and its lineage mutators (C2).
//! - [`transition`]: transitions and the processor contract they invoke.
//! - [`store`]: the document-store port (C3's contract, not its SQLite body).
//! - [`error`]: the crate-wide error taxonomy (§7).

pub mod document;
pub mod document_type;
pub mod error;
pub mod state;
pub mod store;
pub mod transition;

pub use document::Document;
pub use document_type::DocumentType;
pub use error::DocPipeError;
pub use state::State;
pub use store::{DocumentStore, ListQuery};
pub use transition::{FnProcessor, Processor, ProcessorOutput, Transition};
