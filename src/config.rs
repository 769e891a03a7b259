//! Node configuration parameters
//!
//! All tunables for the field node. Read once at process start from the
//! environment (after `.env` is merged in by the binary); never hot-reloaded.
//! Only the band [`Configuration`](crate::app::model::Configuration) fetched
//! from the backend changes at runtime.

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Where water level readings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorMode {
    /// Microcontroller on a serial link.
    Serial,
    /// Replay the `MEASUREMENTS` list (bench / simulation).
    Scripted,
}

/// How pictures are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    /// Shell out to `raspistill`.
    Raspistill,
    /// Always hand back `STATIC_PICTURE_PATH`.
    Static,
}

/// Core node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Identity & backend ---
    /// Node identifier used in every backend URL.
    pub node_name: String,
    pub server_url: String,
    pub get_configuration_path: String,
    pub post_measurement_path: String,
    pub post_picture_path: String,
    pub get_manual_request_path: String,
    /// Per-request HTTP timeout (seconds)
    pub http_timeout_secs: u64,

    // --- Sensor ---
    pub sensor_mode: SensorMode,
    pub serial_port: String,
    /// Serial line speed (8N1, raw mode)
    pub baud_rate: u32,
    /// Longest wait for one sensor response (seconds)
    pub sensor_read_timeout_secs: u64,
    /// Distance from the sensor to the river bed (cm)
    pub water_sensor_distance: f64,
    /// Readings replayed in scripted mode
    pub measurements: Vec<f64>,

    // --- Camera ---
    pub camera_mode: CameraMode,
    pub pictures_dir: String,
    pub static_picture_path: String,

    // --- Loop periods ---
    /// Trigger period before the first configuration arrives (seconds)
    pub initial_trigger_interval_secs: u64,
    /// ConfigWatcher poll period (seconds)
    pub configuration_update_interval_secs: u64,
    /// ManualMeasurementTrigger poll period (seconds)
    pub manual_poll_interval_secs: u64,
    /// PhotoCleaner sweep period (hours)
    pub photo_cleaning_interval_hours: u64,
    /// Pictures older than this are deleted (days)
    pub picture_retention_days: u64,

    // --- Mailbox send timeouts (seconds) ---
    pub interval_update_timeout_secs: u64,
    pub configuration_update_timeout_secs: u64,
    pub manual_request_send_timeout_secs: u64,
    pub measurement_to_analyzer_timeout_secs: u64,
    pub trigger_to_measurer_timeout_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Identity & backend
            node_name: "1".into(),
            server_url: "http://antiguos.fi.uba.ar:443".into(),
            get_configuration_path: "/api/nodes/{node}/configuration".into(),
            post_measurement_path: "/api/nodes/{node}/readings".into(),
            post_picture_path: "/api/nodes/{node}/readings/{reading}/photos".into(),
            get_manual_request_path: "/api/nodes/{node}/manual-reading".into(),
            http_timeout_secs: 10,

            // Sensor
            sensor_mode: SensorMode::Serial,
            serial_port: "/dev/ttyACM0".into(),
            baud_rate: 9600,
            sensor_read_timeout_secs: 5,
            water_sensor_distance: 600.0,
            measurements: vec![1.0, 3.0, 4.0, 5.0, 6.0],

            // Camera
            camera_mode: CameraMode::Raspistill,
            pictures_dir: "/home/pi/Documents/pictures".into(),
            static_picture_path: "/assets/photo.jpeg".into(),

            // Loop periods
            initial_trigger_interval_secs: 10,
            configuration_update_interval_secs: 60,
            manual_poll_interval_secs: 180, // 3 min
            photo_cleaning_interval_hours: 72,
            picture_retention_days: 7,

            // Send timeouts
            interval_update_timeout_secs: 10,
            configuration_update_timeout_secs: 10,
            manual_request_send_timeout_secs: 10,
            measurement_to_analyzer_timeout_secs: 10,
            trigger_to_measurer_timeout_secs: 10,
        }
    }
}

/// Loop periods and send timeouts, already converted for the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub initial_trigger_interval: Duration,
    pub configuration_update_interval: Duration,
    pub manual_poll_interval: Duration,
    pub photo_cleaning_interval: Duration,
    pub interval_update_timeout: Duration,
    pub configuration_update_timeout: Duration,
    pub manual_request_send_timeout: Duration,
    pub measurement_to_analyzer_timeout: Duration,
    pub trigger_to_measurer_timeout: Duration,
}

impl NodeConfig {
    /// Read every tunable from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Missing or unparseable values
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut c = Self::default();

        let text = |key: &str, slot: &mut String| {
            if let Some(v) = lookup(key) {
                *slot = v;
            }
        };
        text("NODE_NAME", &mut c.node_name);
        text("SERVER_URL", &mut c.server_url);
        text("GET_NODE_CONFIGURATION_PATH", &mut c.get_configuration_path);
        text("POST_NODE_MEASUREMENT_PATH", &mut c.post_measurement_path);
        text("POST_NODE_PICTURE_PATH", &mut c.post_picture_path);
        text("GET_MANUAL_MEASUREMENT_REQUEST_PATH", &mut c.get_manual_request_path);
        text("SERIAL_PORT", &mut c.serial_port);
        text("PICTURES_DIR", &mut c.pictures_dir);
        text("STATIC_PICTURE_PATH", &mut c.static_picture_path);

        let secs = |key: &str, slot: &mut u64| match lookup(key).map(|v| v.trim().parse::<u64>()) {
            Some(Ok(v)) => *slot = v,
            Some(Err(_)) => log::warn!("Config: {} is not a number, keeping {}", key, slot),
            None => {}
        };
        secs("HTTP_TIMEOUT", &mut c.http_timeout_secs);
        secs("INITIAL_TRIGGER_INTERVAL", &mut c.initial_trigger_interval_secs);
        secs("CONFIGURATION_UPDATE_INTERVAL", &mut c.configuration_update_interval_secs);
        secs("MANUAL_MEASUREMENT_POLL_INTERVAL", &mut c.manual_poll_interval_secs);
        secs("PHOTO_CLEANING_INTERVAL", &mut c.photo_cleaning_interval_hours);
        secs("PICTURE_RETENTION_DAYS", &mut c.picture_retention_days);
        secs("INTERVAL_UPDATE_TIMEOUT", &mut c.interval_update_timeout_secs);
        secs("CONFIGURATION_UPDATE_TIMEOUT", &mut c.configuration_update_timeout_secs);
        secs(
            "MANUAL_MEASUREMENT_REQUEST_SEND_TIMEOUT",
            &mut c.manual_request_send_timeout_secs,
        );
        secs(
            "MEASUREMENT_TO_ANALYZER_SEND_TIMEOUT",
            &mut c.measurement_to_analyzer_timeout_secs,
        );
        secs("TRIGGER_TO_MEASURER_SEND_TIMEOUT", &mut c.trigger_to_measurer_timeout_secs);
        secs("SENSOR_READ_TIMEOUT", &mut c.sensor_read_timeout_secs);

        if let Some(v) = lookup("BAUD") {
            match v.trim().parse::<u32>() {
                Ok(b) => c.baud_rate = b,
                Err(_) => log::warn!("Config: BAUD is not a number, keeping {}", c.baud_rate),
            }
        }

        if let Some(v) = lookup("WATER_SENSOR_DISTANCE") {
            match v.trim().parse::<f64>() {
                Ok(d) => c.water_sensor_distance = d,
                Err(_) => log::warn!("Config: WATER_SENSOR_DISTANCE is not a number, keeping default"),
            }
        }
        if let Some(v) = lookup("MEASUREMENTS") {
            match parse_measurements(&v) {
                Some(list) => c.measurements = list,
                None => log::warn!("Config: MEASUREMENTS is malformed, keeping default"),
            }
        }
        match lookup("SENSOR_MODE").as_deref().map(str::trim) {
            Some("scripted") => c.sensor_mode = SensorMode::Scripted,
            Some("serial") | None => {}
            Some(other) => log::warn!("Config: unknown SENSOR_MODE '{}', using serial", other),
        }
        match lookup("CAMERA_MODE").as_deref().map(str::trim) {
            Some("static") => c.camera_mode = CameraMode::Static,
            Some("raspistill") | None => {}
            Some(other) => log::warn!("Config: unknown CAMERA_MODE '{}', using raspistill", other),
        }

        c
    }

    /// Reject values the loops cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_name.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("node_name must not be empty"));
        }
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("server_url must not be empty"));
        }
        let periods = [
            (self.initial_trigger_interval_secs, "initial_trigger_interval must be > 0"),
            (self.configuration_update_interval_secs, "configuration_update_interval must be > 0"),
            (self.manual_poll_interval_secs, "manual_poll_interval must be > 0"),
            (self.photo_cleaning_interval_hours, "photo_cleaning_interval must be > 0"),
            (self.http_timeout_secs, "http_timeout must be > 0"),
            (self.interval_update_timeout_secs, "interval_update_timeout must be > 0"),
            (self.configuration_update_timeout_secs, "configuration_update_timeout must be > 0"),
            (self.manual_request_send_timeout_secs, "manual_request_send_timeout must be > 0"),
            (
                self.measurement_to_analyzer_timeout_secs,
                "measurement_to_analyzer_timeout must be > 0",
            ),
            (self.trigger_to_measurer_timeout_secs, "trigger_to_measurer_timeout must be > 0"),
            (self.sensor_read_timeout_secs, "sensor_read_timeout must be > 0"),
        ];
        if let Some((_, msg)) = periods.iter().find(|(v, _)| *v == 0) {
            return Err(ConfigError::ValidationFailed(*msg));
        }
        if periods.iter().any(|(v, _)| seconds(*v).is_none())
            || self.photo_cleaning_interval_hours.checked_mul(3600).and_then(seconds).is_none()
        {
            return Err(ConfigError::ValidationFailed("interval or timeout out of range"));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::ValidationFailed("baud_rate must be > 0"));
        }
        if !self.water_sensor_distance.is_finite() {
            return Err(ConfigError::ValidationFailed("water_sensor_distance must be finite"));
        }
        if self.sensor_mode == SensorMode::Scripted && self.measurements.is_empty() {
            return Err(ConfigError::ValidationFailed("scripted mode needs MEASUREMENTS"));
        }
        Ok(())
    }

    /// Convert to runtime durations. Values `validate` would reject as out
    /// of range saturate to `Duration::MAX`.
    pub fn timings(&self) -> Timings {
        let d = |secs: u64| seconds(secs).unwrap_or(Duration::MAX);
        Timings {
            initial_trigger_interval: d(self.initial_trigger_interval_secs),
            configuration_update_interval: d(self.configuration_update_interval_secs),
            manual_poll_interval: d(self.manual_poll_interval_secs),
            photo_cleaning_interval: d(self.photo_cleaning_interval_hours.saturating_mul(3600)),
            interval_update_timeout: d(self.interval_update_timeout_secs),
            configuration_update_timeout: d(self.configuration_update_timeout_secs),
            manual_request_send_timeout: d(self.manual_request_send_timeout_secs),
            measurement_to_analyzer_timeout: d(self.measurement_to_analyzer_timeout_secs),
            trigger_to_measurer_timeout: d(self.trigger_to_measurer_timeout_secs),
        }
    }

    /// Bound on one sensor request/response exchange.
    pub fn sensor_read_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sensor_read_timeout_secs)
    }

    /// Picture retention window.
    pub fn picture_retention(&self) -> chrono::Duration {
        i64::try_from(self.picture_retention_days)
            .ok()
            .and_then(chrono::Duration::try_days)
            .unwrap_or(chrono::Duration::MAX)
    }
}

/// Seconds as a runtime duration, `None` when the tick count overflows.
fn seconds(secs: u64) -> Option<Duration> {
    Duration::try_from_secs(secs)
}

/// Parse a comma-separated list of readings (`"1,3,4.5"`).
fn parse_measurements(raw: &str) -> Option<Vec<f64>> {
    raw.split(',')
        .map(|s| s.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect()
}
