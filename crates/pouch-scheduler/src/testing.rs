//! In-memory workers for scheduler tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pouch_core::error::{PouchError, PouchResult};
use pouch_core::types::{Analysis, InstallOutcome, PackageIdentity, PackageRequest, ResolvedPackage};

use crate::worker::{Analyzer, Installer, Worker, WorkerSpawner};

/// A dependency graph served by fake workers, with dispatch bookkeeping
#[derive(Debug, Default)]
pub struct FakeGraph {
    deps: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    delay: Duration,
    pub dispatches: AtomicUsize,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub handled: Mutex<Vec<String>>,
    pub inits: AtomicUsize,
    pub stops: AtomicUsize,
}

impl FakeGraph {
    /// Declare the dependencies `name` resolves with
    pub fn package(mut self, name: &str, deps: &[&str]) -> Self {
        self.deps
            .insert(name.to_string(), deps.iter().map(|d| d.to_string()).collect());
        self
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatches.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn handled_names(&self) -> Vec<String> {
        let mut names = self.handled.lock().clone();
        names.sort();
        names
    }

    async fn enter(&self, name: &str) -> PouchResult<()> {
        self.dispatches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(name) {
            return Err(PouchError::UnsatisfiableRange {
                package: name.to_string(),
                range: "^1.0.0".to_string(),
            });
        }
        self.handled.lock().push(name.to_string());
        Ok(())
    }

    fn resolve(&self, name: &str) -> ResolvedPackage {
        ResolvedPackage {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            tarball_url: format!("https://registry.test/{name}/-/{name}-1.0.0.tgz"),
            dependencies: self
                .deps
                .get(name)
                .map(|deps| deps.iter().map(|d| (d.clone(), "^1.0.0".to_string())).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug)]
pub struct FakeWorker {
    slot: usize,
    graph: Arc<FakeGraph>,
    fail_init: bool,
}

#[async_trait]
impl Worker for FakeWorker {
    async fn init(&self) -> PouchResult<()> {
        if self.fail_init {
            return Err(PouchError::WorkerUnavailable {
                slot: self.slot,
                reason: "init refused".to_string(),
            });
        }
        self.graph.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> PouchResult<()> {
        self.graph.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Analyzer for FakeWorker {
    async fn analyze(&self, request: &PackageRequest) -> PouchResult<Option<Analysis>> {
        self.graph.enter(&request.name).await?;
        Ok(Some(Analysis {
            package: self.graph.resolve(&request.name),
        }))
    }
}

#[async_trait]
impl Installer for FakeWorker {
    async fn install(&self, _root: &str, identity: &PackageIdentity) -> PouchResult<InstallOutcome> {
        self.graph.enter(&identity.name).await?;
        Ok(InstallOutcome::Installed { files: 1 })
    }
}

#[derive(Debug)]
pub struct FakeSpawner {
    pub graph: Arc<FakeGraph>,
    pub terminated: AtomicUsize,
    fail_init_at: Option<usize>,
}

impl FakeSpawner {
    pub fn new(graph: FakeGraph) -> Self {
        Self {
            graph: Arc::new(graph),
            terminated: AtomicUsize::new(0),
            fail_init_at: None,
        }
    }

    pub fn failing_init_at(mut self, slot: usize) -> Self {
        self.fail_init_at = Some(slot);
        self
    }

    pub fn terminated_count(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerSpawner for FakeSpawner {
    type Worker = FakeWorker;

    async fn spawn(&self, slot: usize) -> PouchResult<FakeWorker> {
        Ok(FakeWorker {
            slot,
            graph: self.graph.clone(),
            fail_init: self.fail_init_at == Some(slot),
        })
    }

    async fn terminate(&self, _worker: &FakeWorker) -> PouchResult<()> {
        self.terminated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn request(name: &str) -> PackageRequest {
    PackageRequest::new(name, "^1.0.0")
}
