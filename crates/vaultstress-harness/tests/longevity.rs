//! Longevity run integration tests
//!
//! Run: cargo test -p vaultstress-harness --test longevity

mod helpers;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use helpers::{init_logging, FailPoint, FlakyBackend};
use vaultstress_core::partition::split;
use vaultstress_core::{
    BackendConfig, EntityRegistry, LongevityConfig, MonitorConfig, MutationPolicy, SeedSource,
};
use vaultstress_harness::{
    HarnessClock, HarnessError, IterationOutcome, LifecycleWorker, LongevityRun, Monitor,
};
use vaultstress_store::{MemoryBackend, StorageBackend};

fn short_run(total: usize, workers: usize, run_for: Duration) -> LongevityConfig {
    LongevityConfig {
        total_containers: total,
        workers,
        duration: run_for,
        status_every: 50,
        monitor: MonitorConfig {
            interval: Duration::from_millis(100),
            stale_after: Duration::from_secs(5),
        },
        ..Default::default()
    }
}

/// One worker owning [0, 9] with a 5 second deadline terminates and makes progress
#[test]
fn test_single_worker_terminates_after_deadline() {
    init_logging();

    let backend = Arc::new(MemoryBackend::new());
    let registry = Arc::new(EntityRegistry::new(10));
    let partition = split(10, 1).unwrap()[0];
    assert_eq!((partition.min(), partition.max()), (0, 9));

    let worker = LifecycleWorker::new(
        backend,
        Arc::new(BackendConfig::default()),
        registry.owned(partition).unwrap(),
        MutationPolicy::default(),
        HarnessClock::start(),
        SeedSource::new(42).rng_for(0),
    );
    let status = worker.status();

    let deadline = Instant::now() + Duration::from_secs(5);
    let handle = thread::Builder::new()
        .name(status.name().to_string())
        .spawn(move || worker.run(deadline))
        .unwrap();

    let iterations = handle.join().unwrap();
    assert!(Instant::now() >= deadline);
    assert!(iterations >= 1, "worker made no progress");
    assert_eq!(status.iterations(), iterations);
    assert!(registry.snapshot().iter().any(|c| *c >= 0));
}

#[test]
fn test_full_run_reports_and_cleans_up() {
    init_logging();

    let backend = Arc::new(MemoryBackend::new());
    let run = LongevityRun::new(
        backend.clone(),
        BackendConfig::default(),
        short_run(20, 4, Duration::from_millis(500)),
        SeedSource::new(7),
    );

    let report = run.run().unwrap();

    assert_eq!(report.workers.len(), 4);
    assert_eq!(report.workers[0].name, "Containers_0-4");
    assert_eq!(report.workers[3].name, "Containers_15-19");
    assert!(report.workers.iter().all(|w| w.iterations >= 1));
    assert!(report.workers.iter().all(|w| w.aborted == 0));
    assert!(report.elapsed >= Duration::from_millis(500));
    assert_eq!(report.counters.len(), 20);
    assert_eq!(report.histogram.total(), 20);
    assert_eq!(report.histogram.irregular, 0);
    assert!(report.counters.iter().all(|c| (-1..=10).contains(c)));
    assert!(report.monitor_scans >= 1);

    // Everything the run created is gone again
    assert_eq!(backend.container_count(), 0);
}

#[test]
fn test_leftover_containers_are_purged() {
    init_logging();

    let backend = Arc::new(MemoryBackend::new());
    backend
        .create_container("wallet_3", "default", "{}", "{}")
        .unwrap();

    let run = LongevityRun::new(
        backend.clone(),
        BackendConfig::default(),
        short_run(10, 2, Duration::from_millis(100)),
        SeedSource::new(1),
    );
    let report = run.run().unwrap();
    assert!(report.total_iterations() >= 2);
    assert_eq!(backend.container_count(), 0);
}

#[test]
fn test_purge_failure_aborts_before_start() {
    init_logging();

    let backend = Arc::new(MemoryBackend::new());
    backend
        .create_container("wallet_1", "default", "{}", "{}")
        .unwrap();
    let _held = backend.open_container("wallet_1", "{}").unwrap();

    let run = LongevityRun::new(
        backend,
        BackendConfig::default(),
        short_run(10, 2, Duration::from_secs(60)),
        SeedSource::new(1),
    );

    let started = Instant::now();
    let err = run.run().unwrap_err();
    assert!(matches!(err, HarnessError::Cleanup { ref name, .. } if name == "wallet_1"));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_uneven_partition_is_rejected() {
    let run = LongevityRun::new(
        Arc::new(MemoryBackend::new()),
        BackendConfig::default(),
        short_run(10, 3, Duration::from_secs(60)),
        SeedSource::new(1),
    );
    assert!(matches!(run.run(), Err(HarnessError::Core(_))));
}

#[test]
fn test_past_deadline_runs_no_iterations() {
    let mut config = short_run(10, 2, Duration::from_secs(60));
    config.deadline = Some(Utc::now() - chrono::Duration::seconds(10));

    let run = LongevityRun::new(
        Arc::new(MemoryBackend::new()),
        BackendConfig::default(),
        config,
        SeedSource::new(1),
    );
    let report = run.run().unwrap();
    assert_eq!(report.total_iterations(), 0);
    assert_eq!(report.histogram.not_created, 10);
}

#[test]
fn test_backend_failures_abort_iterations_only() {
    init_logging();

    let backend = Arc::new(FlakyBackend::new());
    let registry = Arc::new(EntityRegistry::new(1));
    let partition = split(1, 1).unwrap()[0];
    let mut worker = LifecycleWorker::new(
        backend.clone(),
        Arc::new(BackendConfig::default()),
        registry.owned(partition).unwrap(),
        MutationPolicy::default(),
        HarnessClock::start(),
        SeedSource::new(3).rng_for(0),
    );

    backend.fail_next(FailPoint::Create, 1);
    assert_eq!(
        worker.run_iteration().unwrap(),
        IterationOutcome::CreateFailed { container: 0 }
    );
    assert_eq!(registry.get(0).unwrap(), -1);

    backend.fail_next(FailPoint::Open, 1);
    assert_eq!(
        worker.run_iteration().unwrap(),
        IterationOutcome::OpenFailed { container: 0 }
    );
    // Creation succeeded on the retry even though opening failed
    assert_eq!(registry.get(0).unwrap(), 0);

    // A failed add leaves the counter untouched
    backend.fail_next(FailPoint::AddItem, 1);
    match worker.run_iteration().unwrap() {
        IterationOutcome::Completed { before, after, .. } => {
            assert_eq!((before, after), (0, 0));
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    // A failed search is not fatal and reports no count
    backend.fail_next(FailPoint::Search, 1);
    match worker.run_iteration().unwrap() {
        IterationOutcome::Completed { after, reported, .. } => {
            assert_eq!(after, 1);
            assert_eq!(reported, None);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    backend.fail_next(FailPoint::Close, 1);
    assert!(matches!(
        worker.run_iteration().unwrap(),
        IterationOutcome::CloseFailed { after: 2, .. }
    ));
    assert_eq!(backend.injected(), 5);
}

#[test]
fn test_monitor_flags_stalled_worker() {
    init_logging();

    let backend = Arc::new(MemoryBackend::new());
    let registry = Arc::new(EntityRegistry::new(20));
    let clock = HarnessClock::start();
    let parts = split(20, 2).unwrap();

    let busy = LifecycleWorker::new(
        backend.clone(),
        Arc::new(BackendConfig::default()),
        registry.owned(parts[0]).unwrap(),
        MutationPolicy::default(),
        clock,
        SeedSource::new(5).rng_for(0),
    );
    // Never runs, so it never reports activity
    let idle = LifecycleWorker::new(
        backend,
        Arc::new(BackendConfig::default()),
        registry.owned(parts[1]).unwrap(),
        MutationPolicy::default(),
        clock,
        SeedSource::new(5).rng_for(1),
    );

    let monitor = Monitor::new(
        Arc::clone(&registry),
        vec![busy.status(), idle.status()],
        10,
        &MonitorConfig {
            interval: Duration::from_millis(50),
            stale_after: Duration::from_millis(200),
        },
        clock,
    );

    let deadline = Instant::now() + Duration::from_millis(400);
    busy.run(deadline);

    let report = monitor.scan();
    assert_eq!(report.stale, vec!["Containers_10-19".to_string()]);
    assert!(report.iterations >= 1);
}
