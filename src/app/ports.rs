//! Port traits: the hexagonal boundary between the control loops and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ control loops (domain)
//! ```
//!
//! Driven adapters (serial sensor, camera, HTTP backend) implement these
//! traits. The loops hold them as trait objects, so the scheduling core
//! never touches hardware or the network directly and every collaborator
//! can be replaced by a mock in tests.
//!
//! All port errors are typed and every call is blocking. The sensor is only
//! touched by the Measurer's loop thread. `Backend` and `ImageCapture` are
//! shared: besides their owning loops they are called from the detached
//! photo-upload threads, which is why `Backend` is `Send + Sync` and the
//! camera sits behind a mutex.

use std::path::PathBuf;

use crate::app::model::{Configuration, Measurement, MeasurementId, Picture};
use crate::error::{BackendError, CameraError, SensorError};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Obtains one water level reading per call.
pub trait SensorReader {
    /// Blocking; latency depends on the hardware link.
    fn read_level(&mut self) -> Result<f64, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Camera port (driven adapter: hardware → filesystem)
// ───────────────────────────────────────────────────────────────

/// Captures a still to disk.
pub trait ImageCapture {
    /// Capture a picture called `name` and return where it was written.
    fn capture(&mut self, name: &str) -> Result<PathBuf, CameraError>;
}

// ───────────────────────────────────────────────────────────────
// Backend port (driven adapter: domain ↔ remote collector)
// ───────────────────────────────────────────────────────────────

/// The four remote operations the node relies on. Implementations carry
/// the node identity themselves.
///
/// Shared between loops (and the detached photo uploads), hence
/// `Send + Sync` and `&self` receivers.
pub trait Backend: Send + Sync {
    /// Current band configuration. `Ok(None)` means the backend has no
    /// configuration for this node yet, which is not an error.
    fn get_configuration(&self) -> Result<Option<Configuration>, BackendError>;

    /// Persist a reading and return the identifier the backend assigned.
    fn post_measurement(&self, measurement: &Measurement) -> Result<MeasurementId, BackendError>;

    /// Attach a picture to an already persisted measurement.
    fn post_picture(&self, id: MeasurementId, picture: &Picture) -> Result<(), BackendError>;

    /// Whether an operator has asked for an out-of-band reading.
    fn get_manual_request_pending(&self) -> Result<bool, BackendError>;
}
