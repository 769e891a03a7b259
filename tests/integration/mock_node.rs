//! Mock collaborators for integration tests.
//!
//! Records every backend call so tests can assert on the full history
//! without a network, a serial link or a camera.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration as StdDuration, Instant};

use embassy_time::Duration;
use hydronode::app::model::{Configuration, DEFAULT_STATE_NAME, Measurement, MeasurementId, Picture, State};
use hydronode::app::ports::{Backend, ImageCapture, SensorReader};
use hydronode::config::Timings;
use hydronode::error::{BackendError, CameraError, SensorError};
use hydronode::node::Collaborators;
use uuid::Uuid;

// ── Sensor ────────────────────────────────────────────────────

/// Replays `levels` in a loop and counts reads.
pub struct MockSensor {
    levels: Vec<f64>,
    reads: Arc<AtomicUsize>,
}

impl MockSensor {
    pub fn new(levels: Vec<f64>, reads: Arc<AtomicUsize>) -> Self {
        Self { levels, reads }
    }
}

impl SensorReader for MockSensor {
    fn read_level(&mut self) -> Result<f64, SensorError> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.levels[n % self.levels.len()])
    }
}

// ── Camera ────────────────────────────────────────────────────

/// Always "captures" the same small file.
pub struct MockCamera {
    path: PathBuf,
}

impl MockCamera {
    pub fn new(tag: &str) -> Self {
        let path = std::env::temp_dir().join(format!("hydronode-it-{}-{tag}.jpg", std::process::id()));
        std::fs::write(&path, b"\xff\xd8jpeg").unwrap();
        Self { path }
    }
}

impl ImageCapture for MockCamera {
    fn capture(&mut self, _name: &str) -> Result<PathBuf, CameraError> {
        Ok(self.path.clone())
    }
}

// ── Backend ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBackend {
    pub configuration: Mutex<Option<Configuration>>,
    pub manual_pending: AtomicBool,
    pub fail_posts: AtomicBool,
    pub config_polls: AtomicUsize,
    pub measurements: Mutex<Vec<Measurement>>,
    pub pictures: Mutex<Vec<(MeasurementId, u32)>>,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_configuration(&self, c: Configuration) {
        *self.configuration.lock().unwrap() = Some(c);
    }

    pub fn request_manual(&self) {
        self.manual_pending.store(true, Ordering::SeqCst);
    }

    pub fn measurements(&self) -> Vec<Measurement> {
        self.measurements.lock().unwrap().clone()
    }

    pub fn measurement_count(&self) -> usize {
        self.measurements.lock().unwrap().len()
    }

    pub fn picture_count(&self) -> usize {
        self.pictures.lock().unwrap().len()
    }
}

impl Backend for MockBackend {
    fn get_configuration(&self) -> Result<Option<Configuration>, BackendError> {
        self.config_polls.fetch_add(1, Ordering::SeqCst);
        Ok(self.configuration.lock().unwrap().clone())
    }

    fn post_measurement(&self, m: &Measurement) -> Result<MeasurementId, BackendError> {
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("connection refused".into()));
        }
        let mut all = self.measurements.lock().unwrap();
        all.push(m.clone());
        Ok(MeasurementId(Uuid::from_u128(all.len() as u128)))
    }

    fn post_picture(&self, id: MeasurementId, p: &Picture) -> Result<(), BackendError> {
        self.pictures.lock().unwrap().push((id, p.number));
        Ok(())
    }

    fn get_manual_request_pending(&self) -> Result<bool, BackendError> {
        Ok(self.manual_pending.swap(false, Ordering::SeqCst))
    }
}

// ── Helpers ───────────────────────────────────────────────────

#[allow(dead_code)]
pub fn collaborators(levels: Vec<f64>, backend: &Arc<MockBackend>, tag: &str) -> (Collaborators, Arc<AtomicUsize>) {
    let reads = Arc::new(AtomicUsize::new(0));
    let c = Collaborators {
        sensor: Box::new(MockSensor::new(levels, Arc::clone(&reads))),
        camera: Arc::new(Mutex::new(MockCamera::new(tag))),
        backend: Arc::clone(backend) as Arc<dyn Backend>,
    };
    (c, reads)
}

/// Short periods and timeouts so whole-node tests finish quickly.
#[allow(dead_code)]
pub fn fast_timings() -> Timings {
    Timings {
        initial_trigger_interval: Duration::from_millis(50),
        configuration_update_interval: Duration::from_millis(40),
        manual_poll_interval: Duration::from_millis(40),
        photo_cleaning_interval: Duration::from_secs(3600),
        interval_update_timeout: Duration::from_millis(100),
        configuration_update_timeout: Duration::from_millis(100),
        manual_request_send_timeout: Duration::from_millis(100),
        measurement_to_analyzer_timeout: Duration::from_millis(100),
        trigger_to_measurer_timeout: Duration::from_millis(100),
    }
}

#[allow(dead_code)]
pub fn band(name: &str, lower: f64, upper: f64, interval_ms: u64) -> State {
    State::new(name, lower, upper, Duration::from_millis(interval_ms), 1).unwrap()
}

#[allow(dead_code)]
pub fn default_state(interval_ms: u64) -> State {
    State::new(DEFAULT_STATE_NAME, 0.0, 0.0, Duration::from_millis(interval_ms), 1).unwrap()
}

/// Poll `cond` until it holds or `within` elapses.
#[allow(dead_code)]
pub fn wait_until(within: StdDuration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + within;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(StdDuration::from_millis(5));
    }
    cond()
}
