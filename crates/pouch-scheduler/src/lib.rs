//! Worker pools and graph walks for Pouch
//!
//! An install session is two walks over the dependency graph. The analysis
//! walk resolves every transitive dependency; the install walk fetches and
//! writes each resolved package. Both run on a bounded [`WorkerPool`] through
//! the same [`GraphWalker`], and the [`Orchestrator`] persists each phase's
//! result so a later run can skip work that is already done.

pub mod orchestrator;
pub mod pool;
pub mod tasks;
pub mod walker;
pub mod worker;

#[cfg(test)]
mod testing;

// Re-export main types
pub use orchestrator::{
    default_parallelism, AnalysisReport, InstallReport, Orchestrator, OrchestratorOptions,
    PhaseReport,
};
pub use pool::{WorkerLease, WorkerPool};
pub use tasks::{AnalysisTask, InstallTask, ANALYSIS_PHASE, INSTALL_PHASE};
pub use walker::{GraphWalker, Step, TaskFailure, WalkReport, WalkStats, WalkTask};
pub use worker::{Analyzer, Installer, LocalSpawner, LocalWorker, Worker, WorkerSpawner};
