//! Scripted water level sensor for bench runs: replays a fixed list of
//! readings in a loop.

use crate::app::ports::SensorReader;
use crate::error::SensorError;

pub struct ScriptedLevelSensor {
    readings: Vec<f64>,
    next: usize,
}

impl ScriptedLevelSensor {
    pub fn new(readings: Vec<f64>) -> Self {
        Self { readings, next: 0 }
    }
}

impl SensorReader for ScriptedLevelSensor {
    fn read_level(&mut self) -> Result<f64, SensorError> {
        if self.readings.is_empty() {
            return Err(SensorError::NoReadings);
        }
        let value = self.readings[self.next % self.readings.len()];
        self.next = self.next.wrapping_add(1);
        Ok(value)
    }
}
