// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Batch Scheduler
//!
//! Runs the [`TransitionExecutor`] over a batch of documents with a hard
//! concurrency bound (§4.5), using a counting [`tokio::sync::Semaphore`] as
//! backpressure: a document only starts its transition once it holds a
//! permit, so at most `max_concurrency` executors are ever in flight.

use std::sync::Arc;

use docpipe_domain::{DocPipeError, Document};
use tokio::sync::Semaphore;

use crate::executor::TransitionExecutor;
use docpipe_bootstrap::CancellationToken;

/// Runs [`TransitionExecutor::advance`] over many documents with bounded
/// parallelism.
pub struct BatchScheduler {
    executor: Arc<TransitionExecutor>,
    permits: Arc<Semaphore>,
}

impl BatchScheduler {
    pub fn new(executor: Arc<TransitionExecutor>, max_concurrency: usize) -> Self {
        Self {
            executor,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// Advance every document in `batch`, at most `max_concurrency` at a
    /// time, and return the flattened concatenation of their produced
    /// children (intra-executor order preserved, inter-executor order not
    /// guaranteed).
    ///
    /// On cancellation: executors that have not yet acquired a permit are
    /// never started; an executor already running its transition finishes
    /// that transition's store transaction, then its result is discarded.
    #[tracing::instrument(skip(self, batch, cancellation), fields(batch_len = batch.len()))]
    pub async fn run(&self, batch: Vec<Document>, cancellation: &CancellationToken) -> Result<Vec<Document>, DocPipeError> {
        let mut handles = Vec::with_capacity(batch.len());

        for doc in batch {
            if cancellation.is_cancelled() {
                tracing::debug!("cancellation observed, not starting remaining executors");
                break;
            }

            let permits = self.permits.clone();
            let executor = self.executor.clone();
            let cancellation = cancellation.clone();

            handles.push(tokio::spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => return Ok(Vec::new()),
                    permit = permits.acquire_owned() => permit,
                };
                let _permit = permit.map_err(|_| DocPipeError::Cancelled)?;

                if cancellation.is_cancelled() {
                    return Ok(Vec::new());
                }

                executor.advance(&doc).await
            }));
        }

        let mut produced = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Ok(children)) => produced.extend(children),
                Ok(Err(err)) => return Err(err),
                Err(join_err) if join_err.is_cancelled() => {}
                Err(join_err) => {
                    return Err(DocPipeError::PersistenceFailure(format!(
                        "executor task panicked: {join_err}"
                    )))
                }
            }
        }

        Ok(produced)
    }
}
