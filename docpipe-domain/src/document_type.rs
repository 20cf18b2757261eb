// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The state graph: an immutable, validated description of a pipeline's
//! states and transitions, safely shared across concurrent executors.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::DocPipeError;
use crate::state::State;
use crate::transition::Transition;

/// An ordered set of states plus the transitions between them.
///
/// Constructed once via [`DocumentType::new`], which validates every
/// transition's endpoints against the state set, then thereafter immutable.
/// Derived properties (the final-state set, the per-state transition index)
/// are computed lazily on first use and cached behind a reader-writer lock;
/// nothing about a `DocumentType` changes after construction, so the cache
/// never needs invalidating from within this type itself. An engine that
/// wants "rebinding a document type invalidates derived caches" semantics
/// gets that for free by simply replacing its `Arc<DocumentType>` wholesale.
#[derive(Clone, Debug)]
pub struct DocumentType {
    inner: Arc<DocumentTypeInner>,
}

#[derive(Debug)]
struct DocumentTypeInner {
    states: Vec<State>,
    transitions: Vec<Transition>,
    final_states_cache: RwLock<Option<HashSet<String>>>,
}

impl DocumentType {
    /// Validate and construct a document type.
    ///
    /// Fails with [`DocPipeError::GraphInvalid`] if any transition names a
    /// `from_state` or `to_state` not present in `states`.
    pub fn new(states: Vec<State>, transitions: Vec<Transition>) -> Result<Self, DocPipeError> {
        let known: HashSet<&str> = states.iter().map(State::name).collect();
        for t in &transitions {
            if !known.contains(t.from_state()) {
                return Err(DocPipeError::GraphInvalid(format!(
                    "transition from unknown state {:?}",
                    t.from_state()
                )));
            }
            if !known.contains(t.to_state()) {
                return Err(DocPipeError::GraphInvalid(format!(
                    "transition to unknown state {:?}",
                    t.to_state()
                )));
            }
        }

        Ok(Self {
            inner: Arc::new(DocumentTypeInner {
                states,
                transitions,
                final_states_cache: RwLock::new(None),
            }),
        })
    }

    pub fn states(&self) -> &[State] {
        &self.inner.states
    }

    /// Transitions registered from `state_name`, in registration order.
    ///
    /// The first element is the one the executor picks; later elements exist
    /// only for introspection.
    pub fn transitions_from(&self, state_name: &str) -> Vec<&Transition> {
        self.inner
            .transitions
            .iter()
            .filter(|t| t.from_state() == state_name)
            .collect()
    }

    /// The set of state names with no outgoing transition.
    ///
    /// Does *not* include the engine's configured error-state name; the
    /// engine unions that in to get the terminal set, since the error state
    /// is a property of engine configuration, not of the graph.
    pub fn final_states(&self) -> HashSet<String> {
        if let Some(cached) = self.inner.final_states_cache.read().as_ref() {
            return cached.clone();
        }
        let with_outgoing: HashSet<&str> =
            self.inner.transitions.iter().map(Transition::from_state).collect();
        let finals: HashSet<String> = self
            .inner
            .states
            .iter()
            .map(State::name)
            .filter(|name| !with_outgoing.contains(name))
            .map(str::to_string)
            .collect();
        *self.inner.final_states_cache.write() = Some(finals.clone());
        finals
    }
}
