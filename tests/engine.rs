//! Integration tests for the concurrent task engine

mod common;

use common::{capture, Probe};
use slurp::engine::{self, action, Registry, RegistryBuilder, RunOptions};
use slurp::log::Logger;
use slurp::TaskError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// default -> build -> {fmt, vet}
fn build_graph(fmt: &Probe, vet: &Probe, build: &Probe, vet_fails: bool) -> Registry {
    let mut registry = Registry::new();
    registry.register("fmt", &[], fmt.succeed()).unwrap();
    if vet_fails {
        registry.register("vet", &[], vet.fail("vet error")).unwrap();
    } else {
        registry.register("vet", &[], vet.succeed()).unwrap();
    }
    registry
        .register("build", &["fmt", "vet"], build.succeed())
        .unwrap();
    registry
        .register("default", &["build"], action::noop())
        .unwrap();
    registry
}

#[tokio::test]
async fn test_all_tasks_succeed() {
    let (fmt, vet, build) = (Probe::new(), Probe::new(), Probe::new());
    let registry = build_graph(&fmt, &vet, &build, false);
    let (sink, log) = capture();

    engine::run(&registry, "default", &log).await.unwrap();

    assert_eq!((fmt.calls(), vet.calls(), build.calls()), (1, 1, 1));
    for task in ["fmt", "vet", "build"] {
        assert!(sink.contains(task, "Starting."), "{} never started", task);
        assert!(sink.contains(task, "Done."), "{} never finished", task);
    }

    // The default task logs without a label
    assert!(sink.contains("", "Starting."));
    assert!(sink.contains("", "Waiting for build"));
    assert!(sink.contains("", "Done."));
    assert!(sink.contains("build", "Waiting for fmt"));
    assert!(sink.contains("build", "Waiting for vet"));
}

#[tokio::test]
async fn test_dependencies_finish_before_dependent() {
    let (fmt, vet, build) = (Probe::new(), Probe::new(), Probe::new());
    let registry = build_graph(&fmt, &vet, &build, false);
    let (sink, log) = capture();

    engine::run(&registry, "build", &log).await.unwrap();

    let lines = sink.lines();
    let position = |line: &str| lines.iter().position(|l| l == line).unwrap();
    assert!(position("fmt: Done.") < position("build: Done."));
    assert!(position("vet: Done.") < position("build: Done."));
    assert!(!lines.iter().any(|l| !l.contains(':')), "default task ran");
}

#[tokio::test]
async fn test_failed_dependency_skips_action() {
    let (fmt, vet, build) = (Probe::new(), Probe::new(), Probe::new());
    let registry = build_graph(&fmt, &vet, &build, true);
    let (sink, log) = capture();

    let err = engine::run(&registry, "default", &log).await.unwrap_err();

    assert_eq!(build.calls(), 0);
    assert_eq!(err.failed_dependencies(), vec!["build"]);
    assert_eq!(
        err.to_string(),
        "Task 'default' cancelled: failed dependency (build)"
    );

    // The chain leads back to vet's own error
    let TaskError::DependencyFailure(top) = &err else {
        panic!("expected a dependency failure, got {:?}", err);
    };
    let build_err = top.cause("build").unwrap();
    assert_eq!(build_err.failed_dependencies(), vec!["vet"]);
    let TaskError::DependencyFailure(inner) = build_err else {
        panic!("expected a dependency failure, got {:?}", build_err);
    };
    assert_eq!(inner.cause("vet").unwrap().to_string(), "vet error");

    assert!(sink.contains("build", "vet error"));
    assert!(sink.contains("", "Task 'build' cancelled: failed dependency (vet)"));
    assert!(!sink.contains("build", "Done."));
    assert!(!sink.contains("", "Done."));
}

#[tokio::test]
async fn test_error_names_only_failed_dependencies() {
    let (a, b, x) = (Probe::new(), Probe::new(), Probe::new());
    let mut registry = Registry::new();
    registry.register("a", &[], a.succeed()).unwrap();
    registry.register("b", &[], b.fail("b broke")).unwrap();
    registry.register("x", &["a", "b"], x.succeed()).unwrap();

    let err = engine::run(&registry, "x", &Logger::discard())
        .await
        .unwrap_err();

    assert_eq!(x.calls(), 0);
    assert_eq!(err.failed_dependencies(), vec!["b"]);
    assert_eq!(err.to_string(), "Task 'x' cancelled: failed dependency (b)");
}

#[tokio::test]
async fn test_action_error_passes_through() {
    let probe = Probe::new();
    let mut registry = Registry::new();
    registry
        .register("lint", &[], probe.fail("3 warnings"))
        .unwrap();

    let err = engine::run(&registry, "lint", &Logger::discard())
        .await
        .unwrap_err();

    assert!(matches!(err, TaskError::Action(_)));
    assert_eq!(err.to_string(), "3 warnings");
}

#[tokio::test]
async fn test_unknown_task() {
    let registry = Registry::new();

    let err = engine::run(&registry, "missing", &Logger::discard())
        .await
        .unwrap_err();

    assert!(matches!(err, TaskError::NotFound(ref name) if name == "missing"));
    assert_eq!(err.to_string(), "Task 'missing' is not defined");
}

#[tokio::test]
async fn test_shared_dependency_runs_per_path() {
    let (c, left, right) = (Probe::new(), Probe::new(), Probe::new());
    let registry = RegistryBuilder::new()
        .task("top", vec!["left".into(), "right".into()], action::noop())
        .task("left", vec!["c".into()], left.succeed())
        .task("right", vec!["c".into()], right.succeed())
        .task("c", vec![], c.succeed())
        .build()
        .unwrap();

    engine::run(&registry, "top", &Logger::discard())
        .await
        .unwrap();

    assert_eq!(c.calls(), 2);
    assert_eq!((left.calls(), right.calls()), (1, 1));
}

#[tokio::test]
async fn test_memoized_run_shares_results() {
    let (c, left, right) = (Probe::new(), Probe::new(), Probe::new());
    let registry = RegistryBuilder::new()
        .task("top", vec!["left".into(), "right".into()], action::noop())
        .task("left", vec!["c".into()], left.succeed())
        .task("right", vec!["c".into()], right.succeed())
        .task("c", vec![], c.succeed())
        .build()
        .unwrap();
    let (sink, log) = capture();

    engine::run_with(&registry, "top", &log, RunOptions::memoized())
        .await
        .unwrap();

    assert_eq!(c.calls(), 1);
    assert_eq!(sink.count("c", "Done."), 1);
}

#[tokio::test]
async fn test_memoized_failure_reaches_every_dependent() {
    let (c, left, right) = (Probe::new(), Probe::new(), Probe::new());
    let registry = RegistryBuilder::new()
        .task("top", vec!["left".into(), "right".into()], action::noop())
        .task("left", vec!["c".into()], left.succeed())
        .task("right", vec!["c".into()], right.succeed())
        .task("c", vec![], c.fail("c broke"))
        .build()
        .unwrap();

    let err = engine::run_with(&registry, "top", &Logger::discard(), RunOptions::memoized())
        .await
        .unwrap_err();

    assert_eq!(c.calls(), 1);
    assert_eq!((left.calls(), right.calls()), (0, 0));
    // right may be skipped once left's failure cancels the rest
    assert!(err.failed_dependencies().contains(&"left"));
}

#[tokio::test]
async fn test_dependencies_run_concurrently() {
    let delay = Duration::from_millis(300);
    let mut builder = RegistryBuilder::new();
    let mut deps = Vec::new();
    for i in 0..4 {
        let name = format!("sleep{}", i);
        builder.add(
            name.clone(),
            vec![],
            action::from_fn(move |_log: Logger| async move {
                tokio::time::sleep(delay).await;
                Ok(())
            }),
        );
        deps.push(name);
    }
    builder.add("all", deps, action::noop());
    let registry = builder.build().unwrap();

    let started = Instant::now();
    engine::run(&registry, "all", &Logger::discard())
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= delay);
    assert!(elapsed < delay * 3, "took {:?}", elapsed);
}

#[tokio::test]
async fn test_panicking_dependency_is_reported() {
    let (probe, exploding) = (Probe::new(), Probe::new());
    let mut registry = Registry::new();
    registry.register("explode", &[], exploding.panic()).unwrap();
    registry
        .register("after", &["explode"], probe.succeed())
        .unwrap();

    let err = engine::run(&registry, "after", &Logger::discard())
        .await
        .unwrap_err();

    assert_eq!(probe.calls(), 0);
    let TaskError::DependencyFailure(failure) = &err else {
        panic!("expected a dependency failure, got {:?}", err);
    };
    assert!(matches!(
        failure.cause("explode"),
        Some(TaskError::Panicked { task, message }) if task == "explode" && message == "boom"
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_action_logs_through_task() {
    let mut registry = Registry::new();
    registry
        .register(
            "compile",
            &[],
            action::blocking(|log: &Logger| {
                std::thread::sleep(Duration::from_millis(20));
                log.info("compiled");
                Ok(())
            }),
        )
        .unwrap();
    let (sink, log) = capture();

    engine::run(&registry, "compile", &log).await.unwrap();

    assert!(sink.contains("compile", "compiled"));
    assert!(sink.contains("compile", "Done."));
}

#[tokio::test]
async fn test_node_run_directly() {
    let probe = Probe::new();
    let mut registry = Registry::new();
    let node = registry.register("solo", &[], probe.succeed()).unwrap();

    node.run(&Logger::discard()).await.unwrap();
    node.run(&Logger::discard()).await.unwrap();

    assert_eq!(probe.calls(), 2);
}

#[tokio::test]
async fn test_panicking_action_of_requested_task() {
    let probe = Probe::new();
    let mut registry = Registry::new();
    registry.register("explode", &[], probe.panic()).unwrap();

    let handle = tokio::spawn(async move {
        engine::run(&registry, "explode", &Logger::discard()).await
    });
    let err = handle.await.unwrap().unwrap_err();

    assert_eq!(probe.calls(), 1);
    assert!(matches!(
        err,
        TaskError::Panicked { ref task, ref message } if task == "explode" && message == "boom"
    ));
}

#[tokio::test]
async fn test_memoized_panic_runs_once() {
    let (c, left, right) = (Probe::new(), Probe::new(), Probe::new());
    let registry = RegistryBuilder::new()
        .task("top", vec!["left".into(), "right".into()], action::noop())
        .task("left", vec!["c".into()], left.succeed())
        .task("right", vec!["c".into()], right.succeed())
        .task("c", vec![], c.panic())
        .build()
        .unwrap();

    let err = engine::run_with(&registry, "top", &Logger::discard(), RunOptions::memoized())
        .await
        .unwrap_err();

    assert_eq!(c.calls(), 1);
    assert_eq!((left.calls(), right.calls()), (0, 0));
    let TaskError::DependencyFailure(failure) = &err else {
        panic!("expected a dependency failure, got {:?}", err);
    };
    let left_err = failure.cause("left").unwrap();
    let TaskError::DependencyFailure(inner) = left_err else {
        panic!("expected a dependency failure, got {:?}", left_err);
    };
    assert!(matches!(inner.cause("c"), Some(TaskError::Panicked { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_of_one_node_do_not_overlap() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let runs = Arc::new(AtomicUsize::new(0));

    let (a, p, r) = (Arc::clone(&active), Arc::clone(&peak), Arc::clone(&runs));
    let mut registry = Registry::new();
    let node = registry
        .register(
            "slow",
            &[],
            action::from_fn(move |_log: Logger| {
                let (active, peak, runs) = (Arc::clone(&a), Arc::clone(&p), Arc::clone(&r));
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        )
        .unwrap();

    let log = Logger::discard();
    let (first, second, third) = tokio::join!(node.run(&log), node.run(&log), node.run(&log));

    assert!(first.is_ok() && second.is_ok() && third.is_ok());
    assert_eq!(runs.load(Ordering::SeqCst), 3);
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failure_skips_later_dependencies() {
    let (fail, filler, sibling, x) = (Probe::new(), Probe::new(), Probe::new(), Probe::new());
    let mut registry = Registry::new();
    registry.register("fail", &[], fail.fail("fail broke")).unwrap();
    registry.register("setup", &[], filler.succeed()).unwrap();
    registry.register("prepare", &[], filler.succeed()).unwrap();
    registry.register("sibling", &[], sibling.succeed()).unwrap();
    registry
        .register("x", &["fail", "setup", "prepare", "sibling"], x.succeed())
        .unwrap();
    let (sink, log) = capture();

    let err = engine::run(&registry, "x", &log).await.unwrap_err();

    assert_eq!(sibling.calls(), 0);
    assert_eq!(x.calls(), 0);
    assert_eq!(err.failed_dependencies(), vec!["fail"]);
    assert!(sink.contains("x", "Skipping sibling"));
    assert!(!sink.contains("x", "Waiting for sibling"));
}

#[tokio::test]
async fn test_run_all_shares_one_session() {
    let (fmt, build) = (Probe::new(), Probe::new());
    let mut registry = Registry::new();
    registry.register("fmt", &[], fmt.succeed()).unwrap();
    registry.register("build", &["fmt"], build.succeed()).unwrap();

    engine::run_all(&registry, &["fmt", "build"], &Logger::discard(), RunOptions::memoized())
        .await
        .unwrap();
    assert_eq!((fmt.calls(), build.calls()), (1, 1));

    engine::run_all(&registry, &["fmt", "build"], &Logger::discard(), RunOptions::default())
        .await
        .unwrap();
    assert_eq!((fmt.calls(), build.calls()), (3, 2));
}

#[tokio::test]
async fn test_run_all_checks_names_first() {
    let fmt = Probe::new();
    let mut registry = Registry::new();
    registry.register("fmt", &[], fmt.succeed()).unwrap();

    let err = engine::run_all(&registry, &["fmt", "nope"], &Logger::discard(), RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, TaskError::NotFound(ref name) if name == "nope"));
    assert_eq!(fmt.calls(), 0);
}
