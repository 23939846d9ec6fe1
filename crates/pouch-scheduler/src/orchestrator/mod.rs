//! Two-phase install session
//!
//! Analysis walks the graph from the manifest's direct dependencies and
//! persists every resolved identity to `.depCache`. Installation starts only
//! after that walk has drained, installs each identity, and persists the
//! installed names to `.installCache`. Each phase gets its own worker pool,
//! torn down when the phase ends. Names found in a cache file are skipped,
//! which is what lets an interrupted run resume.

use std::collections::HashSet;
use std::num::NonZeroUsize;

use indexmap::IndexMap;
use pouch_cache::RunCache;
use pouch_core::error::PouchResult;
use pouch_core::events::EventSink;
use pouch_core::types::{InstallOutcome, PackageIdentity, PackageRequest};
use pouch_resolver::ResolvedGraph;

use crate::pool::WorkerPool;
use crate::tasks::{AnalysisTask, InstallTask};
use crate::walker::{GraphWalker, TaskFailure, WalkReport, WalkStats, WalkTask};
use crate::worker::{Analyzer, Installer, WorkerSpawner};

/// Worker count used when none is configured
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Workers per phase
    pub max_workers: usize,
    /// Keep walking after a failed task instead of aborting the phase
    pub continue_on_error: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_workers: default_parallelism(),
            continue_on_error: true,
        }
    }
}

/// Counters and failures of one phase
#[derive(Debug, Default)]
pub struct PhaseReport {
    pub stats: WalkStats,
    pub failures: Vec<TaskFailure>,
}

#[derive(Debug, Default)]
pub struct AnalysisReport {
    /// This run's resolutions followed by cached ones, one per name
    pub packages: Vec<PackageIdentity>,
    /// Dependency cycles among this run's resolutions
    pub cycles: Vec<Vec<String>>,
    pub phase: PhaseReport,
}

#[derive(Debug, Default)]
pub struct InstallReport {
    pub analysis: AnalysisReport,
    /// Names fetched and written this run
    pub installed: Vec<String>,
    /// Names that matched the exclusion list
    pub excluded: Vec<String>,
    pub phase: PhaseReport,
}

impl InstallReport {
    /// Failures from both phases, analysis first
    pub fn failures(&self) -> impl Iterator<Item = &TaskFailure> {
        self.analysis
            .phase
            .failures
            .iter()
            .chain(self.phase.failures.iter())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Runs analysis and installation for one project root
pub struct Orchestrator<S> {
    spawner: S,
    run_cache: RunCache,
    options: OrchestratorOptions,
    events: EventSink,
}

impl<S> Orchestrator<S>
where
    S: WorkerSpawner,
    S::Worker: Analyzer + Installer,
{
    pub fn new(spawner: S, run_cache: RunCache, options: OrchestratorOptions) -> Self {
        Self {
            spawner,
            run_cache,
            options,
            events: EventSink::disabled(),
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn run_cache(&self) -> &RunCache {
        &self.run_cache
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// Resolve the transitive graph of `seeds` and persist it
    pub async fn analyze(&self, seeds: Vec<PackageRequest>) -> PouchResult<AnalysisReport> {
        let cached = self.run_cache.load_analysis().await?;
        let cached_names: HashSet<String> = cached.iter().map(|i| i.name.clone()).collect();
        if !cached.is_empty() {
            tracing::debug!("Loaded {} cached resolutions", cached.len());
        }

        self.events
            .info(format!("resolving {} direct dependencies", seeds.len()));
        let walk = self
            .walk(AnalysisTask::<S::Worker>::new(), seeds, &cached_names)
            .await?;

        let graph = ResolvedGraph::from_analyses(walk.results.values());
        let cycles = graph.cycles();
        for cycle in &cycles {
            tracing::info!("Dependency cycle: {}", ResolvedGraph::format_cycle(cycle));
        }

        let mut packages: IndexMap<String, PackageIdentity> = walk
            .results
            .values()
            .map(|analysis| (analysis.package.name.clone(), analysis.identity()))
            .collect();
        for identity in cached {
            packages.entry(identity.name.clone()).or_insert(identity);
        }
        let packages: Vec<PackageIdentity> = packages.into_values().collect();

        self.run_cache.save_analysis(&packages).await?;
        self.events.info(format!(
            "resolved {} packages ({} this run)",
            packages.len(),
            graph.package_count()
        ));

        Ok(AnalysisReport {
            packages,
            cycles,
            phase: PhaseReport {
                stats: walk.stats,
                failures: walk.failures,
            },
        })
    }

    /// Analyse `seeds`, then install everything the analysis produced
    pub async fn install(&self, seeds: Vec<PackageRequest>) -> PouchResult<InstallReport> {
        let analysis = self.analyze(seeds).await?;

        let mut installed_names = self.run_cache.load_installed().await?;
        let cached: HashSet<String> = installed_names.iter().cloned().collect();
        let requests: Vec<PackageRequest> = analysis
            .packages
            .iter()
            .map(PackageIdentity::to_request)
            .collect();

        let walk = self
            .walk(InstallTask::<S::Worker>::new(self.run_cache.root()), requests, &cached)
            .await?;

        let mut installed = Vec::new();
        let mut excluded = Vec::new();
        for (name, outcome) in &walk.results {
            match outcome {
                InstallOutcome::Installed { .. } => installed.push(name.clone()),
                InstallOutcome::AlreadyInstalled => {},
                InstallOutcome::Excluded => excluded.push(name.clone()),
            }
            if outcome.is_present() && !cached.contains(name) {
                installed_names.push(name.clone());
            }
        }

        self.run_cache.save_installed(&installed_names).await?;
        self.events.info(format!(
            "installed {} packages, {} already present",
            installed.len(),
            walk.stats.skipped_cached
        ));

        Ok(InstallReport {
            analysis,
            installed,
            excluded,
            phase: PhaseReport {
                stats: walk.stats,
                failures: walk.failures,
            },
        })
    }

    /// Delete both cache files so the next run starts from scratch
    pub async fn clear_caches(&self) -> PouchResult<()> {
        self.run_cache.clear().await?;
        tracing::info!("Cleared run caches in '{}'", self.run_cache.root());
        Ok(())
    }

    /// Run one phase on a fresh pool; the pool is torn down even when the
    /// walk fails
    async fn walk<T>(
        &self,
        task: T,
        seeds: Vec<PackageRequest>,
        cached: &HashSet<String>,
    ) -> PouchResult<WalkReport<T::Output>>
    where
        T: WalkTask<Worker = S::Worker>,
    {
        let pool = WorkerPool::start(&self.spawner, self.options.max_workers).await?;
        let result = GraphWalker::new(task, &pool)
            .continue_on_error(self.options.continue_on_error)
            .run(seeds, cached)
            .await;
        let shutdown = pool.shutdown(&self.spawner).await;

        let report = result?;
        shutdown?;
        Ok(report)
    }
}
