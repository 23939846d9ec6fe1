//! Bounded-concurrency graph walk
//!
//! The walker pops requests off a frontier, skips names that are cached from
//! a previous run or already dispatched in this one, and runs the rest on
//! pool workers, never more than the pool size at once. Edges discovered by a
//! task join the back of the frontier. The walk ends when the frontier and
//! the in-flight set are both empty, so cycles terminate through the
//! dispatched-name check.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use pouch_core::error::{PouchError, PouchResult};
use pouch_core::types::PackageRequest;
use tokio::task::{JoinError, JoinSet};

use crate::pool::WorkerPool;
use crate::worker::Worker;

/// What one dispatched request produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<O> {
    /// Accumulate `output` under the request name and queue `edges`
    Done { output: O, edges: Vec<PackageRequest> },
    /// The worker had nothing to do for this request
    Skipped,
}

/// Work a walk performs for every dispatched request
#[async_trait]
pub trait WalkTask: Send + Sync + 'static {
    type Worker: Worker;
    type Output: Send + 'static;

    /// Phase name used in logs and errors
    fn phase(&self) -> &'static str;

    async fn run(&self, worker: &Self::Worker, request: &PackageRequest) -> PouchResult<Step<Self::Output>>;
}

/// Counters for one walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub dispatched: usize,
    pub completed: usize,
    /// Requests skipped because a previous run already handled the name
    pub skipped_cached: usize,
    /// Requests skipped because the name was dispatched earlier in this walk
    pub skipped_seen: usize,
    pub peak_in_flight: usize,
}

/// A request whose task returned an error
#[derive(Debug)]
pub struct TaskFailure {
    pub request: PackageRequest,
    pub error: PouchError,
}

/// Everything a finished walk produced
#[derive(Debug)]
pub struct WalkReport<O> {
    /// Outputs keyed by request name, in completion order
    pub results: IndexMap<String, O>,
    /// Latest failure per name still failing when the walk ended
    pub failures: Vec<TaskFailure>,
    pub stats: WalkStats,
}

type Joined<O> = (PackageRequest, PouchResult<Step<O>>);

struct WalkState<O> {
    frontier: VecDeque<PackageRequest>,
    seen: HashSet<String>,
    results: IndexMap<String, O>,
    failures: Vec<TaskFailure>,
    stats: WalkStats,
    aborted: bool,
}

/// Drives a [`WalkTask`] over a dependency graph on a [`WorkerPool`]
pub struct GraphWalker<'p, T: WalkTask> {
    task: Arc<T>,
    pool: &'p WorkerPool<T::Worker>,
    continue_on_error: bool,
}

impl<'p, T: WalkTask> GraphWalker<'p, T> {
    pub fn new(task: T, pool: &'p WorkerPool<T::Worker>) -> Self {
        Self {
            task: Arc::new(task),
            pool,
            continue_on_error: true,
        }
    }

    /// With `false`, the first failure stops dispatching; in-flight tasks
    /// still finish and the walk returns `PhaseAborted`
    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Walk from `seeds`, skipping every name in `cached`
    pub async fn run(
        &self,
        seeds: impl IntoIterator<Item = PackageRequest>,
        cached: &HashSet<String>,
    ) -> PouchResult<WalkReport<T::Output>> {
        let phase = self.task.phase();
        let limit = self.pool.size();
        let mut state = WalkState {
            frontier: seeds.into_iter().collect(),
            seen: HashSet::new(),
            results: IndexMap::new(),
            failures: Vec::new(),
            stats: WalkStats::default(),
            aborted: false,
        };
        let mut in_flight: JoinSet<Joined<T::Output>> = JoinSet::new();

        tracing::debug!(
            "Starting {} walk with {} seeds on {} workers",
            phase,
            state.frontier.len(),
            limit
        );

        loop {
            while let Some(request) = state.frontier.pop_front() {
                if cached.contains(&request.name) {
                    state.stats.skipped_cached += 1;
                    continue;
                }
                if !state.seen.insert(request.name.clone()) {
                    state.stats.skipped_seen += 1;
                    continue;
                }

                while in_flight.len() >= limit {
                    match in_flight.join_next().await {
                        Some(joined) => self.absorb(&mut state, joined)?,
                        None => break,
                    }
                }
                if state.aborted {
                    break;
                }

                let lease = self.pool.claim().await?;
                let task = self.task.clone();
                in_flight.spawn(async move {
                    let result = task.run(lease.worker(), &request).await;
                    drop(lease);
                    (request, result)
                });
                state.stats.dispatched += 1;
                state.stats.peak_in_flight = state.stats.peak_in_flight.max(in_flight.len());
            }

            match in_flight.join_next().await {
                Some(joined) => self.absorb(&mut state, joined)?,
                None => break,
            }
        }

        tracing::info!(
            "{} walk finished: {} dispatched, {} cached, {} deduplicated, {} failed, peak {} in flight",
            phase,
            state.stats.dispatched,
            state.stats.skipped_cached,
            state.stats.skipped_seen,
            state.failures.len(),
            state.stats.peak_in_flight
        );

        if state.aborted {
            let failures = state.failures.len();
            if let Some(first) = std::mem::take(&mut state.failures).into_iter().next() {
                return Err(PouchError::PhaseAborted {
                    phase: phase.to_string(),
                    failures,
                    source: Box::new(first.error),
                });
            }
        }

        Ok(WalkReport {
            results: state.results,
            failures: state.failures,
            stats: state.stats,
        })
    }

    fn absorb(
        &self,
        state: &mut WalkState<T::Output>,
        joined: Result<Joined<T::Output>, JoinError>,
    ) -> PouchResult<()> {
        let (request, result) = joined.map_err(|e| PouchError::TaskPanicked {
            phase: self.task.phase().to_string(),
            message: e.to_string(),
        })?;
        state.stats.completed += 1;

        match result {
            Ok(Step::Done { output, edges }) => {
                state.failures.retain(|failure| failure.request.name != request.name);
                if !state.aborted {
                    state.frontier.extend(edges);
                }
                state.results.insert(request.name.clone(), output);
            },
            Ok(Step::Skipped) => {
                tracing::trace!("{} skipped {}", self.task.phase(), request);
            },
            Err(error) => {
                tracing::warn!("{} failed for {}: {}", self.task.phase(), request, error);
                // Another edge may still lead back here
                state.seen.remove(&request.name);
                if !self.continue_on_error {
                    state.aborted = true;
                    state.frontier.clear();
                }
                state.failures.retain(|failure| failure.request.name != request.name);
                state.failures.push(TaskFailure { request, error });
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
