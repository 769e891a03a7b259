//! Unified error types for the hydro monitor node.
//!
//! Every collaborator (sensor link, camera, backend, configuration) has its
//! own typed error so the boundary that observes a failure can log it
//! precisely.  All of them convert into the top-level [`Error`], which is
//! what a measurement cycle propagates with `?` before the loop logs it and
//! waits for the next tick.
//!
//! Errors never cross a mailbox: loops exchange only successful payloads.

use core::fmt;
use std::io;

// ---------------------------------------------------------------------------
// Top-level node error
// ---------------------------------------------------------------------------

/// Every fallible operation in the node funnels into this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The water level sensor could not be read.
    Sensor(SensorError),
    /// A still could not be captured or read back from disk.
    Camera(CameraError),
    /// A backend call failed or returned something undecodable.
    Backend(BackendError),
    /// A band configuration was rejected.
    Configuration(ConfigurationError),
    /// Node tunables are invalid.
    Config(ConfigError),
    /// Hardware initialisation failed (fatal at startup only).
    Init(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Camera(e) => write!(f, "camera: {e}"),
            Self::Backend(e) => write!(f, "backend: {e}"),
            Self::Configuration(e) => write!(f, "configuration: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Reading from or writing to the serial link failed.
    Io(io::ErrorKind),
    /// The link closed before a full line arrived.
    Disconnected,
    /// No line terminator within the response buffer.
    LineTooLong,
    /// The response line is not a number.
    Malformed,
    /// A scripted sensor has no readings to replay.
    NoReadings,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(kind) => write!(f, "serial I/O failed ({kind})"),
            Self::Disconnected => write!(f, "serial link closed mid-response"),
            Self::LineTooLong => write!(f, "response exceeds line buffer"),
            Self::Malformed => write!(f, "response is not a number"),
            Self::NoReadings => write!(f, "no scripted readings"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Camera errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraError {
    /// Spawning the capture tool or touching the picture file failed.
    Io(io::ErrorKind),
    /// The capture tool exited unsuccessfully (exit code, if any).
    CaptureFailed(Option<i32>),
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(kind) => write!(f, "picture I/O failed ({kind})"),
            Self::CaptureFailed(Some(code)) => write!(f, "capture exited with status {code}"),
            Self::CaptureFailed(None) => write!(f, "capture terminated by signal"),
        }
    }
}

impl From<CameraError> for Error {
    fn from(e: CameraError) -> Self {
        Self::Camera(e)
    }
}

// ---------------------------------------------------------------------------
// Backend errors
// ---------------------------------------------------------------------------

/// Failures of the four backend operations.
///
/// "No configuration yet" is *not* an error: `get_configuration` reports it
/// as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Connection, TLS or timeout failure.
    Transport(String),
    /// The server answered with a non-success status.
    Status(u16),
    /// The response body could not be decoded.
    Decode(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Status(code) => write!(f, "HTTP status {code}"),
            Self::Decode(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl From<BackendError> for Error {
    fn from(e: BackendError) -> Self {
        Self::Backend(e)
    }
}

// ---------------------------------------------------------------------------
// Band configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    /// State name is empty or longer than the name buffer.
    InvalidName,
    /// Two states share a name.
    DuplicateName,
    /// More non-default bands than the band table holds.
    TooManyBands,
    /// A limit is NaN/infinite, or `lower >= upper`.
    InvalidLimits,
    /// Sampling interval is zero.
    ZeroInterval,
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName => write!(f, "invalid state name"),
            Self::DuplicateName => write!(f, "duplicate state name"),
            Self::TooManyBands => write!(f, "more than {} states", crate::app::model::MAX_BANDS),
            Self::InvalidLimits => write!(f, "invalid state limits"),
            Self::ZeroInterval => write!(f, "state interval must be positive"),
        }
    }
}

impl From<ConfigurationError> for Error {
    fn from(e: ConfigurationError) -> Self {
        Self::Configuration(e)
    }
}

// ---------------------------------------------------------------------------
// Tunable (environment) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A tunable failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Node-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
