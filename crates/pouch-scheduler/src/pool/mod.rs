//! Bounded worker pool
//!
//! A claim takes a semaphore permit and then pops an idle slot index under a
//! short lock. The permit count always equals the idle stack length outside
//! that lock, so a claim that holds a permit always finds a slot and no two
//! claims share a worker.

use std::sync::Arc;

use parking_lot::Mutex;
use pouch_core::error::{PouchError, PouchResult};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::worker::{Worker, WorkerSpawner};

/// Fixed set of initialized workers
#[derive(Debug)]
pub struct WorkerPool<W> {
    workers: Vec<Arc<W>>,
    idle: Arc<Mutex<Vec<usize>>>,
    permits: Arc<Semaphore>,
}

impl<W: Worker> WorkerPool<W> {
    /// Spawn and initialize `size` workers
    ///
    /// If any worker fails to start, the ones already started are torn down
    /// again before the error is returned.
    pub async fn start<S>(spawner: &S, size: usize) -> PouchResult<Self>
    where
        S: WorkerSpawner<Worker = W>,
    {
        if size == 0 {
            return Err(PouchError::ConfigValidation {
                field: "max_workers".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let mut workers = Vec::with_capacity(size);
        for slot in 0..size {
            let started = match spawner.spawn(slot).await {
                Ok(worker) => match worker.init().await {
                    Ok(()) => Ok(worker),
                    Err(e) => {
                        let _ = spawner.terminate(&worker).await;
                        Err(e)
                    },
                },
                Err(e) => Err(e),
            };

            match started {
                Ok(worker) => workers.push(Arc::new(worker)),
                Err(e) => {
                    let _ = Self::teardown(spawner, &workers).await;
                    return Err(PouchError::WorkerUnavailable {
                        slot,
                        reason: e.to_string(),
                    });
                },
            }
        }

        tracing::debug!("Started worker pool with {} workers", size);
        Ok(Self {
            workers,
            idle: Arc::new(Mutex::new((0..size).rev().collect())),
            permits: Arc::new(Semaphore::new(size)),
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Wait for an idle worker and claim it
    pub async fn claim(&self) -> PouchResult<WorkerLease<W>> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PouchError::WorkerUnavailable {
                slot: 0,
                reason: "worker pool is shut down".to_string(),
            })?;
        self.lease(permit)
    }

    /// Claim an idle worker without waiting
    pub fn try_claim(&self) -> Option<WorkerLease<W>> {
        let permit = self.permits.clone().try_acquire_owned().ok()?;
        self.lease(permit).ok()
    }

    fn lease(&self, permit: OwnedSemaphorePermit) -> PouchResult<WorkerLease<W>> {
        let slot = self
            .idle
            .lock()
            .pop()
            .ok_or_else(|| PouchError::WorkerUnavailable {
                slot: 0,
                reason: "permit granted with no idle worker".to_string(),
            })?;

        let worker = self
            .workers
            .get(slot)
            .cloned()
            .ok_or_else(|| PouchError::WorkerUnavailable {
                slot,
                reason: "slot out of range".to_string(),
            })?;

        Ok(WorkerLease {
            slot,
            worker,
            idle: self.idle.clone(),
            _permit: permit,
        })
    }

    /// Stop and terminate every worker; later claims fail
    ///
    /// Every worker is torn down even if some of them fail; the first
    /// failure is returned.
    pub async fn shutdown<S>(self, spawner: &S) -> PouchResult<()>
    where
        S: WorkerSpawner<Worker = W>,
    {
        self.permits.close();
        let result = Self::teardown(spawner, &self.workers).await;
        tracing::debug!("Shut down worker pool of {} workers", self.workers.len());
        result
    }

    async fn teardown<S>(spawner: &S, workers: &[Arc<W>]) -> PouchResult<()>
    where
        S: WorkerSpawner<Worker = W>,
    {
        let mut first_error = None;
        for (slot, worker) in workers.iter().enumerate() {
            let stopped = match worker.stop().await {
                Ok(()) => spawner.terminate(worker).await,
                Err(e) => {
                    let _ = spawner.terminate(worker).await;
                    Err(e)
                },
            };
            if let Err(e) = stopped {
                tracing::warn!("Failed to stop worker {}: {}", slot, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Exclusive use of one worker; the slot goes back to the pool on drop
#[derive(Debug)]
pub struct WorkerLease<W> {
    slot: usize,
    worker: Arc<W>,
    idle: Arc<Mutex<Vec<usize>>>,
    // Released after `Drop::drop` has returned the slot
    _permit: OwnedSemaphorePermit,
}

impl<W> WorkerLease<W> {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn worker(&self) -> &W {
        &self.worker
    }
}

impl<W> Drop for WorkerLease<W> {
    fn drop(&mut self) {
        self.idle.lock().push(self.slot);
    }
}
