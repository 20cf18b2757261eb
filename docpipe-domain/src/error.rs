// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Crate-wide error taxonomy for the document-pipeline engine.
//!
//! One enum, one variant per error *kind* (not per call site), mirroring how
//! the rest of the domain layer treats errors as a closed, inspectable set
//! rather than an open `anyhow`-style bag.

use thiserror::Error;

/// The error kinds a document-pipeline engine can surface.
///
/// [`DocPipeError::ProcessorFailure`] and the first attempt at
/// [`DocPipeError::PersistenceFailure`] are recovered locally by the
/// transition executor into an error document and never reach a caller
/// directly; see [`DocPipeError::is_recoverable`].
#[derive(Debug, Error)]
pub enum DocPipeError {
    /// Malformed document type at construction: a transition names a state
    /// that is not in the state set, or its processor is not callable.
    #[error("invalid document type: {0}")]
    GraphInvalid(String),

    /// A referenced document id does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// `add` was called with an id that already exists in the store.
    #[error("document id already exists: {0}")]
    Conflict(String),

    /// `update` was given a full `Document` whose (state, content, media_type)
    /// disagrees with the stored record.
    #[error("document {id} does not match the stored record: {reason}")]
    Mismatch { id: String, reason: String },

    /// The document type was rebound while a `finish` call was in flight.
    #[error("engine is busy: a finish() call is in flight")]
    Busy,

    /// A user-supplied processor raised while transitioning a document.
    ///
    /// Recovered locally: the executor turns this into an error document and
    /// never propagates it past the transition boundary.
    #[error("processor failed: {0}")]
    ProcessorFailure(String),

    /// The persistence backend failed during an executor-owned write.
    ///
    /// Recovered locally unless persisting the resulting error document also
    /// fails, in which case it is surfaced.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    /// The operation was cancelled cooperatively.
    #[error("operation cancelled")]
    Cancelled,
}

impl DocPipeError {
    /// Whether the executor can recover from this error by synthesizing an
    /// error document, rather than surfacing it to the caller of `finish`.
    ///
    /// Keeping this as a predicate on the enum (rather than a hand-maintained
    /// match in the executor) means adding a new variant can't silently leave
    /// it unclassified.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DocPipeError::ProcessorFailure(_) | DocPipeError::PersistenceFailure(_)
        )
    }

    /// A short, stable symbolic name for the error kind, used as the
    /// `error_type` reserved metadata key on synthesized error documents.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DocPipeError::GraphInvalid(_) => "GraphInvalid",
            DocPipeError::NotFound(_) => "NotFound",
            DocPipeError::Conflict(_) => "Conflict",
            DocPipeError::Mismatch { .. } => "Mismatch",
            DocPipeError::Busy => "Busy",
            DocPipeError::ProcessorFailure(_) => "ProcessorFailure",
            DocPipeError::PersistenceFailure(_) => "PersistenceFailure",
            DocPipeError::Cancelled => "Cancelled",
        }
    }
}

impl From<serde_json::Error> for DocPipeError {
    fn from(err: serde_json::Error) -> Self {
        DocPipeError::PersistenceFailure(format!("metadata serialization error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processor_failure_is_recoverable() {
        let err = DocPipeError::ProcessorFailure("boom".into());
        assert!(err.is_recoverable());
        assert_eq!(err.kind_name(), "ProcessorFailure");
    }

    #[test]
    fn persistence_failure_is_recoverable() {
        let err = DocPipeError::PersistenceFailure("disk full".into());
        assert!(err.is_recoverable());
    }

    #[test]
    fn not_found_is_not_recoverable() {
        let err = DocPipeError::NotFound("abc".into());
        assert!(!err.is_recoverable());
        assert_eq!(err.kind_name(), "NotFound");
    }

    #[test]
    fn busy_is_not_recoverable() {
        assert!(!DocPipeError::Busy.is_recoverable());
    }
}
