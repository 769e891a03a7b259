//! Analyzer loop driven through its mailboxes, the way the node wires it.

use std::sync::Arc;

use embassy_time::{Duration, Instant, with_timeout};
use futures_lite::future::block_on;
use hydronode::app::analyzer::Analyzer;
use hydronode::app::model::Configuration;
use hydronode::runtime::{LoopHandle, Mailbox, StopSignal, spawn_loop};

use crate::mock_node::{band, default_state};

struct AnalyzerRig {
    levels: Arc<Mailbox<f64>>,
    configurations: Arc<Mailbox<Configuration>>,
    intervals: Arc<Mailbox<Duration>>,
    handle: LoopHandle,
}

impl AnalyzerRig {
    fn start(emit_timeout_ms: u64) -> Self {
        let levels = Arc::new(Mailbox::new());
        let configurations = Arc::new(Mailbox::new());
        let intervals = Arc::new(Mailbox::new());
        let stop = Arc::new(StopSignal::new());
        let analyzer = Analyzer::new(
            Arc::clone(&levels),
            Arc::clone(&configurations),
            Arc::clone(&intervals),
            Duration::from_millis(emit_timeout_ms),
            Arc::clone(&stop),
        );
        let handle = spawn_loop("analyzer-it", stop, move || analyzer.run()).unwrap();
        Self {
            levels,
            configurations,
            intervals,
            handle,
        }
    }

    fn configure(&self, c: Configuration) {
        assert!(block_on(self.configurations.send_timeout(c, Duration::from_secs(2))).is_delivered());
    }

    fn measure(&self, v: f64) {
        assert!(block_on(self.levels.send_timeout(v, Duration::from_secs(2))).is_delivered());
    }

    fn next_interval(&self, within_ms: u64) -> Option<Duration> {
        block_on(with_timeout(Duration::from_millis(within_ms), self.intervals.receive())).ok()
    }

    fn stop(self) {
        self.handle.stop();
        self.handle.join();
    }
}

fn low_and_default() -> Configuration {
    Configuration::new([band("low", 0.0, 50.0, 60_000), default_state(10_000)]).unwrap()
}

#[test]
fn reading_in_band_emits_band_interval() {
    let rig = AnalyzerRig::start(1000);
    rig.configure(low_and_default());
    rig.measure(30.0);
    assert_eq!(rig.next_interval(1000), Some(Duration::from_secs(60)));
    rig.stop();
}

#[test]
fn reading_at_upper_limit_moves_to_default() {
    let rig = AnalyzerRig::start(1000);
    rig.configure(low_and_default());
    rig.measure(30.0);
    assert_eq!(rig.next_interval(1000), Some(Duration::from_secs(60)));
    rig.measure(50.0);
    assert_eq!(rig.next_interval(1000), Some(Duration::from_secs(10)));
    rig.stop();
}

#[test]
fn reading_before_configuration_is_dropped() {
    let rig = AnalyzerRig::start(1000);
    rig.measure(30.0);
    assert_eq!(rig.next_interval(150), None);
    rig.stop();
}

#[test]
fn default_moves_to_band_added_by_new_configuration() {
    let rig = AnalyzerRig::start(1000);
    rig.configure(Configuration::new([default_state(10_000)]).unwrap());
    rig.measure(30.0);
    assert_eq!(rig.next_interval(1000), Some(Duration::from_secs(10)));

    rig.configure(low_and_default());
    // Replacing the configuration alone emits nothing.
    assert_eq!(rig.next_interval(100), None);
    rig.measure(30.0);
    assert_eq!(rig.next_interval(1000), Some(Duration::from_secs(60)));
    rig.stop();
}

#[test]
fn slow_trigger_does_not_stall_analyzer() {
    let rig = AnalyzerRig::start(50);
    rig.configure(low_and_default());
    rig.measure(30.0);

    // Nobody takes the interval; the Analyzer gives up and keeps serving.
    let started = Instant::now();
    rig.measure(31.0);
    assert!(started.elapsed() < Duration::from_millis(1000));

    // The timed-out emission is never delivered late; only fresh ones are.
    rig.measure(32.0);
    assert_eq!(rig.next_interval(1000), Some(Duration::from_secs(60)));
    rig.stop();
}
