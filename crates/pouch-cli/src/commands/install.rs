//! `pouch install` and `pouch analyze` command implementation.
//!
//! Reads package.json and the layered configuration, wires the registry
//! client, resolver and archive fetcher into in-process workers, and runs
//! the install session.

use std::sync::Arc;
use std::time::Instant;

use pouch_cache::{ArchiveFetcher, MembershipSet, RunCache, Storage};
use pouch_config::{ConfigLayering, ConfigLoader, InstallConfig};
use pouch_core::error::PouchResult;
use pouch_core::events::EventSink;
use pouch_registry::{ClientOptions, MetadataCache, RegistryClient};
use pouch_resolver::{PackageManager, ResolvedGraph, VersionResolver};
use pouch_scheduler::{LocalSpawner, Orchestrator, OrchestratorOptions, TaskFailure};

use super::{parse_package_spec, CommandContext, PROJECT_ROOT};
use crate::InstallArgs;

/// What the session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Analysis then installation
    Install,
    /// Analysis only
    Analyze,
}

/// Execute `pouch install` or `pouch analyze`
pub async fn execute(args: InstallArgs, mode: Mode, ctx: &CommandContext) -> anyhow::Result<()> {
    let start_time = Instant::now();

    let storage = ctx.storage();
    let loader = ConfigLoader::new(storage.clone(), PROJECT_ROOT);
    let env = ConfigLayering::collect_env_overrides()?;
    let config = loader.load(env, args.overrides()).await?;
    let manifest = loader.load_manifest().await?;

    let mut seeds = manifest.dependency_requests();
    for spec in &args.packages {
        let request = parse_package_spec(spec)?;
        seeds.retain(|seed| seed.name != request.name);
        seeds.push(request);
    }

    if seeds.is_empty() {
        ctx.output.info("No dependencies to install");
        return Ok(());
    }

    ctx.output.step(
        ">",
        &format!(
            "Resolving {} dependencies from {} with {} workers",
            seeds.len(),
            config.registry,
            config.worker_count()
        ),
    );

    let (events, receiver) = EventSink::channel();
    let forwarder = ctx.output.forward_events(receiver);
    let orchestrator = build_orchestrator(&config, storage, ctx.run_cache(), events)?;

    let failures = match mode {
        Mode::Install => {
            let result = orchestrator.install(seeds).await;
            drop(orchestrator);
            let _ = forwarder.await;
            let report = result?;

            report_cycles(ctx, &report.analysis.cycles);
            if !report.excluded.is_empty() {
                ctx.output
                    .info(&format!("Skipped {}", report.excluded.join(", ")));
            }
            ctx.output.success(&format!(
                "Installed {} of {} packages in {:.2}s",
                report.installed.len(),
                report.analysis.packages.len(),
                start_time.elapsed().as_secs_f64()
            ));
            report.failures().map(describe).collect::<Vec<_>>()
        },
        Mode::Analyze => {
            let result = orchestrator.analyze(seeds).await;
            drop(orchestrator);
            let _ = forwarder.await;
            let report = result?;

            report_cycles(ctx, &report.cycles);
            for package in &report.packages {
                ctx.output
                    .info(&format!("{}@{}", package.name, package.version));
            }
            ctx.output.success(&format!(
                "Resolved {} packages in {:.2}s",
                report.packages.len(),
                start_time.elapsed().as_secs_f64()
            ));
            report.phase.failures.iter().map(describe).collect()
        },
    };

    if failures.is_empty() {
        return Ok(());
    }
    for failure in &failures {
        ctx.output.error(failure);
    }
    anyhow::bail!("{} packages failed", failures.len())
}

/// Wire the registry, resolver and fetcher into an install session
pub fn build_orchestrator(
    config: &InstallConfig,
    storage: Arc<dyn Storage>,
    run_cache: RunCache,
    events: EventSink,
) -> PouchResult<Orchestrator<LocalSpawner>> {
    let mut options = ClientOptions::new(config.registry.clone());
    options.timeout = config.request_timeout();
    options.retry.max_retries = config.max_retries;
    options.auth.token = config.auth_token.clone();
    let client = Arc::new(RegistryClient::with_options(options)?);

    let resolver = VersionResolver::new(client.clone(), Arc::new(MetadataCache::new()));
    let manager = PackageManager::new(resolver, ArchiveFetcher::new(client), storage)
        .with_skip_packages(config.skip_packages.clone())
        .with_membership(Arc::new(MembershipSet::new(config.membership_capacity)?))
        .with_events(events.clone());

    let options = OrchestratorOptions {
        max_workers: config.worker_count(),
        continue_on_error: config.continue_on_error,
    };
    Ok(
        Orchestrator::new(LocalSpawner::new(Arc::new(manager)), run_cache, options)
            .with_events(events),
    )
}

fn report_cycles(ctx: &CommandContext, cycles: &[Vec<String>]) {
    for cycle in cycles {
        ctx.output.warn(&format!(
            "Dependency cycle: {}",
            ResolvedGraph::format_cycle(cycle)
        ));
    }
}

fn describe(failure: &TaskFailure) -> String {
    format!("{}: {}", failure.request, failure.error)
}
