//! Whole-node flows: every loop running on its own thread against mocks.

use std::sync::atomic::Ordering;
use std::time::{Duration as StdDuration, Instant};

use hydronode::app::model::Configuration;
use hydronode::node::{Housekeeping, Node};

use crate::mock_node::{MockBackend, band, collaborators, default_state, fast_timings, wait_until};

#[test]
fn scheduled_samples_are_persisted_with_pictures() {
    let backend = MockBackend::new();
    let (c, reads) = collaborators(vec![10.0], &backend, "scheduled");
    let node = Node::start(fast_timings(), c, None).unwrap();

    assert!(wait_until(StdDuration::from_secs(3), || backend.measurement_count() >= 2));
    assert!(wait_until(StdDuration::from_secs(3), || backend.picture_count() >= 2));
    node.shutdown();

    assert!(reads.load(Ordering::SeqCst) >= 2);
    assert!(backend.measurements().iter().all(|m| !m.is_manual));
    assert!(backend.pictures.lock().unwrap().iter().all(|(_, n)| *n == 1));
}

#[test]
fn manual_request_triggers_manual_sample() {
    let backend = MockBackend::new();
    let (c, _reads) = collaborators(vec![5.0], &backend, "manual");
    let mut timings = fast_timings();
    // Keep scheduled sampling out of the way.
    timings.initial_trigger_interval = embassy_time::Duration::from_secs(3600);
    let node = Node::start(timings, c, None).unwrap();

    backend.request_manual();
    assert!(wait_until(StdDuration::from_secs(3), || backend.measurement_count() >= 1));
    node.shutdown();

    let all = backend.measurements();
    assert_eq!(all.len(), 1);
    assert!(all[0].is_manual);
    assert!((all[0].value - 5.0).abs() < f64::EPSILON);
}

#[test]
fn configuration_is_fetched_on_start() {
    let backend = MockBackend::new();
    let (c, _reads) = collaborators(vec![5.0], &backend, "config-start");
    let mut timings = fast_timings();
    timings.configuration_update_interval = embassy_time::Duration::from_secs(3600);
    let node = Node::start(timings, c, None).unwrap();

    assert!(wait_until(StdDuration::from_secs(2), || {
        backend.config_polls.load(Ordering::SeqCst) >= 1
    }));
    node.shutdown();
}

#[test]
fn sampling_slows_down_in_a_calm_band() {
    let backend = MockBackend::new();
    backend.set_configuration(
        Configuration::new([band("calm", 0.0, 50.0, 600), default_state(50)]).unwrap(),
    );
    let (c, _reads) = collaborators(vec![20.0], &backend, "calm");
    let node = Node::start(fast_timings(), c, None).unwrap();

    // First sample at the 50 ms initial interval; Analyzer then asks for 600 ms.
    assert!(wait_until(StdDuration::from_secs(3), || backend.measurement_count() >= 1));
    std::thread::sleep(StdDuration::from_millis(150));
    let settled = backend.measurement_count();
    std::thread::sleep(StdDuration::from_millis(500));
    let later = backend.measurement_count();
    node.shutdown();

    // At 50 ms this window would hold ~10 samples.
    assert!(later - settled <= 2, "expected slow sampling, got {}", later - settled);
}

#[test]
fn backend_outage_does_not_stop_sampling() {
    let backend = MockBackend::new();
    backend.fail_posts.store(true, Ordering::SeqCst);
    let (c, reads) = collaborators(vec![1.0], &backend, "outage");
    let node = Node::start(fast_timings(), c, None).unwrap();

    assert!(wait_until(StdDuration::from_secs(3), || reads.load(Ordering::SeqCst) >= 3));
    assert_eq!(backend.picture_count(), 0);

    backend.fail_posts.store(false, Ordering::SeqCst);
    assert!(wait_until(StdDuration::from_secs(3), || backend.measurement_count() >= 1));
    node.shutdown();
}

#[test]
fn shutdown_joins_every_loop_promptly() {
    let backend = MockBackend::new();
    let (c, _reads) = collaborators(vec![1.0], &backend, "shutdown");
    let housekeeping = Housekeeping {
        pictures_dir: std::env::temp_dir(),
        retention: chrono::Duration::days(7),
    };
    let node = Node::start(fast_timings(), c, Some(housekeeping)).unwrap();

    assert_eq!(node.running_loops().len(), 6);
    std::thread::sleep(StdDuration::from_millis(120));

    let started = Instant::now();
    node.shutdown();
    assert!(started.elapsed() < StdDuration::from_secs(2));
}
