//! Fuzz target: `parse_level_line` (serial response from the sensor board)
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Every accepted line yields a finite distance
//!
//! cargo fuzz run fuzz_sensor_line

#![no_main]

use hydronode::sensors::water_level::parse_level_line;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(distance) = parse_level_line(data) {
        assert!(distance.is_finite());
    }
});
