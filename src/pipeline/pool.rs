//! Concurrent runs.
//!
//! Each run builds its own registry and tracker; the pool only bounds how
//! many execute at once.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use uuid::Uuid;

use super::{EnrichmentPipeline, FailedRun, RunOutcome};
use crate::registry::NormalizedFacts;

#[derive(Debug, Clone)]
pub struct RunPool {
    pipeline: Arc<EnrichmentPipeline>,
    permits: Arc<Semaphore>,
}

impl RunPool {
    pub fn new(pipeline: Arc<EnrichmentPipeline>, max_concurrent_runs: usize) -> Self {
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(max_concurrent_runs.max(1))),
        }
    }

    /// Pool sized by `runtime.max_concurrent_runs`.
    pub fn from_pipeline(pipeline: Arc<EnrichmentPipeline>) -> Self {
        let limit = pipeline.config().runtime.max_concurrent_runs;
        Self::new(pipeline, limit)
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Spawn a run. It starts once a permit is free.
    pub fn submit(&self, facts: NormalizedFacts) -> JoinHandle<RunOutcome> {
        let pipeline = Arc::clone(&self.pipeline);
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            // The semaphore is never closed, so acquisition only waits.
            let _permit = permits.acquire_owned().await.ok();
            debug!(facts = facts.len(), "run permit acquired");
            pipeline.run(facts).await
        })
    }

    /// Run every fact set and return outcomes in input order. A panicked
    /// run is reported as an internal failure.
    pub async fn run_all(&self, batches: Vec<NormalizedFacts>) -> Vec<RunOutcome> {
        let handles: Vec<_> = batches.into_iter().map(|facts| self.submit(facts)).collect();
        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(error = %err, "run task failed");
                    RunOutcome::Rejected(FailedRun::internal(Uuid::new_v4(), err.to_string()))
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}
