//! Water level sensor drivers implementing
//! [`SensorReader`](crate::app::ports::SensorReader).
//!
//! | Driver                 | Source                                |
//! |------------------------|---------------------------------------|
//! | `ArduinoLevelSensor`   | Ultrasonic sensor via Arduino (tty)   |
//! | `ScriptedLevelSensor`  | Fixed list of readings (bench mode)   |

pub mod scripted;
pub mod water_level;

pub use scripted::ScriptedLevelSensor;
pub use water_level::ArduinoLevelSensor;
