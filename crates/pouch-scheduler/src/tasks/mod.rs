//! The two phase tasks: analysis and install

use std::marker::PhantomData;

use async_trait::async_trait;
use pouch_core::error::PouchResult;
use pouch_core::types::{Analysis, InstallOutcome, PackageIdentity, PackageRequest};

use crate::walker::{Step, WalkTask};
use crate::worker::{Analyzer, Installer};

pub const ANALYSIS_PHASE: &str = "analysis";
pub const INSTALL_PHASE: &str = "install";

/// Resolves each request and queues its declared dependencies
pub struct AnalysisTask<W> {
    _worker: PhantomData<fn() -> W>,
}

impl<W> AnalysisTask<W> {
    pub fn new() -> Self {
        Self {
            _worker: PhantomData,
        }
    }
}

impl<W> Default for AnalysisTask<W> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<W: Analyzer> WalkTask for AnalysisTask<W> {
    type Worker = W;
    type Output = Analysis;

    fn phase(&self) -> &'static str {
        ANALYSIS_PHASE
    }

    async fn run(&self, worker: &W, request: &PackageRequest) -> PouchResult<Step<Analysis>> {
        Ok(match worker.analyze(request).await? {
            Some(analysis) => Step::Done {
                edges: analysis.edges(),
                output: analysis,
            },
            None => Step::Skipped,
        })
    }
}

/// Installs each request below `root`; discovers no edges
pub struct InstallTask<W> {
    root: String,
    _worker: PhantomData<fn() -> W>,
}

impl<W> InstallTask<W> {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            _worker: PhantomData,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }
}

#[async_trait]
impl<W: Installer> WalkTask for InstallTask<W> {
    type Worker = W;
    type Output = InstallOutcome;

    fn phase(&self) -> &'static str {
        INSTALL_PHASE
    }

    async fn run(&self, worker: &W, request: &PackageRequest) -> PouchResult<Step<InstallOutcome>> {
        // Install requests carry the pinned version in `range`
        let identity = PackageIdentity::new(
            &request.name,
            &request.range,
            request.tarball_url.as_deref().unwrap_or_default(),
        );
        let outcome = worker.install(&self.root, &identity).await?;
        Ok(Step::Done {
            output: outcome,
            edges: Vec::new(),
        })
    }
}
