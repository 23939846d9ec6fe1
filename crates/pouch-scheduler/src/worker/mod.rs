//! Worker capabilities
//!
//! A worker is an execution context with an explicit lifecycle. Each phase
//! asks for one capability: [`Analyzer`] during the analysis walk and
//! [`Installer`] during the install walk. A [`WorkerSpawner`] creates and
//! tears down workers; the in-process [`LocalSpawner`] shares one
//! [`PackageManager`] between all of its workers.

use std::sync::Arc;

use async_trait::async_trait;
use pouch_core::error::PouchResult;
use pouch_core::types::{Analysis, InstallOutcome, PackageIdentity, PackageRequest};
use pouch_resolver::PackageManager;

/// Lifecycle shared by every worker
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Prepare the worker before its first task
    async fn init(&self) -> PouchResult<()>;

    /// Release whatever `init` acquired
    async fn stop(&self) -> PouchResult<()>;
}

/// Analysis-phase capability
#[async_trait]
pub trait Analyzer: Worker {
    /// Resolve a request; `None` when the name was already analysed
    async fn analyze(&self, request: &PackageRequest) -> PouchResult<Option<Analysis>>;
}

/// Install-phase capability
#[async_trait]
pub trait Installer: Worker {
    async fn install(&self, root: &str, identity: &PackageIdentity) -> PouchResult<InstallOutcome>;
}

/// Creates and destroys workers for a pool
#[async_trait]
pub trait WorkerSpawner: Send + Sync {
    type Worker: Worker;

    async fn spawn(&self, slot: usize) -> PouchResult<Self::Worker>;

    async fn terminate(&self, worker: &Self::Worker) -> PouchResult<()>;
}

/// In-process worker backed by a shared [`PackageManager`]
#[derive(Debug, Clone)]
pub struct LocalWorker {
    slot: usize,
    manager: Arc<PackageManager>,
}

impl LocalWorker {
    pub fn new(slot: usize, manager: Arc<PackageManager>) -> Self {
        Self { slot, manager }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }
}

#[async_trait]
impl Worker for LocalWorker {
    async fn init(&self) -> PouchResult<()> {
        tracing::trace!("Worker {} ready", self.slot);
        Ok(())
    }

    async fn stop(&self) -> PouchResult<()> {
        tracing::trace!("Worker {} stopped", self.slot);
        Ok(())
    }
}

#[async_trait]
impl Analyzer for LocalWorker {
    async fn analyze(&self, request: &PackageRequest) -> PouchResult<Option<Analysis>> {
        self.manager.analyze(request).await
    }
}

#[async_trait]
impl Installer for LocalWorker {
    async fn install(&self, root: &str, identity: &PackageIdentity) -> PouchResult<InstallOutcome> {
        self.manager.install(root, identity).await
    }
}

/// Spawns [`LocalWorker`]s that all share one session
#[derive(Debug, Clone)]
pub struct LocalSpawner {
    manager: Arc<PackageManager>,
}

impl LocalSpawner {
    pub fn new(manager: Arc<PackageManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<PackageManager> {
        &self.manager
    }
}

#[async_trait]
impl WorkerSpawner for LocalSpawner {
    type Worker = LocalWorker;

    async fn spawn(&self, slot: usize) -> PouchResult<LocalWorker> {
        Ok(LocalWorker::new(slot, self.manager.clone()))
    }

    async fn terminate(&self, worker: &LocalWorker) -> PouchResult<()> {
        tracing::trace!("Worker {} terminated", worker.slot);
        Ok(())
    }
}
