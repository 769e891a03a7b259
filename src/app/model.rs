//! Domain data: severity bands, band configurations, measurements.
//!
//! A [`Configuration`] is one ordered table of non-default bands plus an
//! optional catch-all `default` state. Bands are half-open `[lower, upper)`
//! and are scanned in ascending lower-limit order (ties by name), so the
//! same reading always classifies the same way even when bands overlap.

use core::fmt;

use chrono::{DateTime, Utc};
use embassy_time::Duration;
use heapless::{String, Vec};
use uuid::Uuid;

use crate::error::ConfigurationError;

/// Longest accepted state name, in bytes.
pub const STATE_NAME_LEN: usize = 32;

/// Maximum number of non-default bands in one configuration. A larger
/// table is rejected whole and the node keeps its previous configuration.
pub const MAX_BANDS: usize = 64;

/// Name that marks the catch-all state.
pub const DEFAULT_STATE_NAME: &str = "default";

pub type StateName = String<STATE_NAME_LEN>;

// ───────────────────────────────────────────────────────────────
// State
// ───────────────────────────────────────────────────────────────

/// One severity band and the sampling policy that applies inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    name: StateName,
    lower_limit: f64,
    upper_limit: f64,
    interval: Duration,
    picture_count: u32,
}

impl State {
    pub fn new(
        name: &str,
        lower_limit: f64,
        upper_limit: f64,
        interval: Duration,
        picture_count: u32,
    ) -> Result<Self, ConfigurationError> {
        if name.is_empty() {
            return Err(ConfigurationError::InvalidName);
        }
        let mut stored = StateName::new();
        stored
            .push_str(name)
            .map_err(|()| ConfigurationError::InvalidName)?;

        if !lower_limit.is_finite() || !upper_limit.is_finite() {
            return Err(ConfigurationError::InvalidLimits);
        }
        // The default state's limits are never consulted.
        if name != DEFAULT_STATE_NAME && lower_limit >= upper_limit {
            return Err(ConfigurationError::InvalidLimits);
        }
        if interval == Duration::from_ticks(0) {
            return Err(ConfigurationError::ZeroInterval);
        }

        Ok(Self {
            name: stored,
            lower_limit,
            upper_limit,
            interval,
            picture_count,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lower_limit(&self) -> f64 {
        self.lower_limit
    }

    pub fn upper_limit(&self) -> f64 {
        self.upper_limit
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn picture_count(&self) -> u32 {
        self.picture_count
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_STATE_NAME
    }

    /// Half-open membership test: `lower <= v < upper`.
    pub fn contains(&self, v: f64) -> bool {
        v >= self.lower_limit && v < self.upper_limit
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration
// ───────────────────────────────────────────────────────────────

/// Full set of bands known to the node. Replaced wholesale, never merged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Configuration {
    bands: Vec<State, MAX_BANDS>,
    default: Option<State>,
}

impl Configuration {
    /// Build from states in any order. The state named `default` becomes
    /// the catch-all; every other state is a band.
    pub fn new(states: impl IntoIterator<Item = State>) -> Result<Self, ConfigurationError> {
        let mut bands: Vec<State, MAX_BANDS> = Vec::new();
        let mut default = None;

        for state in states {
            let duplicate = bands.iter().chain(default.iter()).any(|s| s.name == state.name);
            if duplicate {
                return Err(ConfigurationError::DuplicateName);
            }
            if state.is_default() {
                default = Some(state);
            } else {
                bands
                    .push(state)
                    .map_err(|_| ConfigurationError::TooManyBands)?;
            }
        }

        bands.sort_unstable_by(|a, b| {
            a.lower_limit
                .total_cmp(&b.lower_limit)
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(Self { bands, default })
    }

    /// Non-default bands in scan order.
    pub fn bands(&self) -> &[State] {
        &self.bands
    }

    pub fn default_state(&self) -> Option<&State> {
        self.default.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty() && self.default.is_none()
    }

    /// Look a state up by name, default included.
    pub fn get(&self, name: &str) -> Option<&State> {
        self.bands
            .iter()
            .chain(self.default.iter())
            .find(|s| s.name == name)
    }

    /// First band containing `v`, else the default state, else `None`.
    pub fn classify(&self, v: f64) -> Option<&State> {
        self.find_band(v).or(self.default.as_ref())
    }

    /// First non-default band containing `v`.
    pub fn find_band(&self, v: f64) -> Option<&State> {
        self.bands.iter().find(|s| s.contains(v))
    }
}

// ───────────────────────────────────────────────────────────────
// Analyzer state
// ───────────────────────────────────────────────────────────────

/// The Analyzer's idea of which band the river is in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NodeState {
    #[default]
    Unknown,
    Default,
    Band(StateName),
}

impl NodeState {
    pub(crate) fn of(state: &State) -> Self {
        if state.is_default() {
            Self::Default
        } else {
            Self::Band(state.name.clone())
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Default => write!(f, "{DEFAULT_STATE_NAME}"),
            Self::Band(name) => write!(f, "{name}"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Measurements & pictures
// ───────────────────────────────────────────────────────────────

/// Why a measurement cycle ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Scheduled,
    Manual,
}

impl SampleKind {
    pub fn is_manual(self) -> bool {
        self == Self::Manual
    }
}

/// One water level reading, as persisted to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub is_manual: bool,
}

/// Backend-assigned identifier of a persisted measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeasurementId(pub Uuid);

impl fmt::Display for MeasurementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A captured still ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    /// 1-based index within the measurement.
    pub number: u32,
    pub file_name: std::string::String,
    pub bytes: std::vec::Vec<u8>,
}

/// Pictures are named after their capture time so the cleaner can age them
/// without any index.
const PICTURE_NAME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3fZ";

/// File stem for a picture captured at `at`.
pub fn picture_name(at: DateTime<Utc>) -> std::string::String {
    at.format(PICTURE_NAME_FORMAT).to_string()
}

/// Inverse of [`picture_name`]; `None` for anything else.
pub fn parse_picture_name(stem: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(stem, PICTURE_NAME_FORMAT)
        .ok()
        .map(|t| t.and_utc())
}
