//! Unit tests for the graph walker

use super::*;
use crate::tasks::{AnalysisTask, InstallTask};
use crate::testing::{request, FakeGraph, FakeSpawner, FakeWorker};
use std::time::Duration;

async fn analyse(
    spawner: &FakeSpawner,
    workers: usize,
    seeds: Vec<PackageRequest>,
    cached: &HashSet<String>,
) -> PouchResult<WalkReport<pouch_core::types::Analysis>> {
    let pool = WorkerPool::start(spawner, workers).await?;
    let report = GraphWalker::new(AnalysisTask::<FakeWorker>::new(), &pool)
        .run(seeds, cached)
        .await;
    pool.shutdown(spawner).await?;
    report
}

#[tokio::test]
async fn test_cycle_terminates_with_two_dispatches() {
    let graph = FakeGraph::default().package("a", &["b"]).package("b", &["a"]);
    let spawner = FakeSpawner::new(graph);

    let report = analyse(&spawner, 4, vec![request("a")], &HashSet::new())
        .await
        .unwrap();

    assert_eq!(report.results.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(spawner.graph.dispatch_count(), 2);
    assert_eq!(report.stats.dispatched, 2);
    assert_eq!(report.stats.skipped_seen, 1);
}

#[tokio::test]
async fn test_in_flight_never_exceeds_pool_size() {
    let graph = FakeGraph::default().with_delay(Duration::from_millis(20));
    let spawner = FakeSpawner::new(graph);
    let seeds = ["s1", "s2", "s3", "s4", "s5"].into_iter().map(request).collect();

    let report = analyse(&spawner, 2, seeds, &HashSet::new()).await.unwrap();

    assert_eq!(report.results.len(), 5);
    assert_eq!(report.stats.peak_in_flight, 2);
    assert!(spawner.graph.peak_in_flight() <= 2);
    assert_eq!(spawner.graph.peak_in_flight(), 2);
}

#[tokio::test]
async fn test_cached_names_are_not_dispatched() {
    let spawner = FakeSpawner::new(FakeGraph::default().package("app", &["lib"]));
    let cached: HashSet<String> = ["app".to_string(), "lib".to_string()].into();

    let report = analyse(&spawner, 2, vec![request("app")], &cached).await.unwrap();

    assert!(report.results.is_empty());
    assert_eq!(spawner.graph.dispatch_count(), 0);
    assert_eq!(report.stats.skipped_cached, 1);
}

#[tokio::test]
async fn test_diamond_dispatches_shared_dependency_once() {
    let graph = FakeGraph::default()
        .package("app", &["left", "right"])
        .package("left", &["shared"])
        .package("right", &["shared"]);
    let spawner = FakeSpawner::new(graph);

    let report = analyse(&spawner, 3, vec![request("app")], &HashSet::new())
        .await
        .unwrap();

    assert_eq!(spawner.graph.handled_names(), vec!["app", "left", "right", "shared"]);
    assert_eq!(report.stats.dispatched, 4);
    assert_eq!(report.stats.completed, 4);
}

#[tokio::test]
async fn test_failures_are_collected_and_siblings_continue() {
    let graph = FakeGraph::default()
        .package("app", &["broken", "fine"])
        .package("broken", &["never"])
        .failing("broken");
    let spawner = FakeSpawner::new(graph);

    let report = analyse(&spawner, 2, vec![request("app")], &HashSet::new())
        .await
        .unwrap();

    assert_eq!(report.results.len(), 2);
    assert!(report.results.contains_key("fine"));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].request.name, "broken");
    assert!(matches!(
        report.failures[0].error,
        PouchError::UnsatisfiableRange { .. }
    ));
}

#[tokio::test]
async fn test_abort_on_first_failure() {
    let graph = FakeGraph::default().failing("broken");
    let spawner = FakeSpawner::new(graph);
    let pool = WorkerPool::start(&spawner, 1).await.unwrap();

    let err = GraphWalker::new(AnalysisTask::<FakeWorker>::new(), &pool)
        .continue_on_error(false)
        .run(vec![request("broken"), request("later")], &HashSet::new())
        .await
        .unwrap_err();

    match err {
        PouchError::PhaseAborted { phase, failures, source } => {
            assert_eq!(phase, "analysis");
            assert_eq!(failures, 1);
            assert!(matches!(*source, PouchError::UnsatisfiableRange { .. }));
        },
        other => panic!("expected PhaseAborted, got {:?}", other),
    }
    // "later" was still queued behind "broken" on the single worker
    assert!(!spawner.graph.handled_names().contains(&"later".to_string()));
    pool.shutdown(&spawner).await.unwrap();
}

#[tokio::test]
async fn test_install_walk_uses_pinned_identity() {
    let spawner = FakeSpawner::new(FakeGraph::default());
    let pool = WorkerPool::start(&spawner, 2).await.unwrap();
    let seeds = vec![
        pouch_core::types::PackageIdentity::new("react", "18.2.0", "https://r/react.tgz").to_request(),
        pouch_core::types::PackageIdentity::new("scheduler", "0.23.0", "").to_request(),
    ];

    let report = GraphWalker::new(InstallTask::<FakeWorker>::new("/project"), &pool)
        .run(seeds, &HashSet::new())
        .await
        .unwrap();
    pool.shutdown(&spawner).await.unwrap();

    assert_eq!(report.results.len(), 2);
    assert!(report
        .results
        .values()
        .all(|outcome| *outcome == pouch_core::types::InstallOutcome::Installed { files: 1 }));
    assert_eq!(spawner.graph.handled_names(), vec!["react", "scheduler"]);
}

#[tokio::test]
async fn test_failed_name_is_requeued_when_rediscovered() {
    let graph = FakeGraph::default().package("app", &["x"]).failing("x");
    let spawner = FakeSpawner::new(graph);

    let report = analyse(&spawner, 1, vec![request("x"), request("app")], &HashSet::new())
        .await
        .unwrap();

    // x fails as a seed, then again through the app -> x edge
    assert_eq!(spawner.graph.dispatch_count(), 3);
    assert_eq!(report.stats.dispatched, 3);
    assert_eq!(report.stats.skipped_seen, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].request.name, "x");
    assert_eq!(report.results.keys().collect::<Vec<_>>(), vec!["app"]);
}

#[tokio::test]
async fn test_abort_waits_for_in_flight_siblings() {
    let graph = FakeGraph::default()
        .failing("broken")
        .with_delay(Duration::from_millis(10));
    let spawner = FakeSpawner::new(graph);
    let pool = WorkerPool::start(&spawner, 2).await.unwrap();

    let err = GraphWalker::new(AnalysisTask::<FakeWorker>::new(), &pool)
        .continue_on_error(false)
        .run(vec![request("broken"), request("fine")], &HashSet::new())
        .await
        .unwrap_err();
    pool.shutdown(&spawner).await.unwrap();

    assert!(matches!(err, PouchError::PhaseAborted { failures: 1, .. }));
    assert_eq!(spawner.graph.dispatch_count(), 2);
    assert_eq!(spawner.graph.handled_names(), vec!["fine"]);
}
