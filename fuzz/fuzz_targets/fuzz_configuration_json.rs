//! Fuzz target: `decode_configuration` (backend configuration body)
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - A decoded configuration never holds an invalid band
//! - Classification of any finite value is deterministic and, when it
//!   returns a band, that band contains the value
//!
//! cargo fuzz run fuzz_configuration_json

#![no_main]

use hydronode::adapters::http_backend::decode_configuration;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(config) = decode_configuration(data) else {
        return;
    };

    for band in config.bands() {
        assert!(band.lower_limit() < band.upper_limit());
        assert!(band.interval().as_ticks() > 0);
    }

    let probes = config
        .bands()
        .iter()
        .flat_map(|b| [b.lower_limit(), b.upper_limit(), (b.lower_limit() + b.upper_limit()) / 2.0]);
    for v in probes.filter(|v| v.is_finite()) {
        let first = config.classify(v).map(|s| s.name().to_owned());
        let again = config.classify(v).map(|s| s.name().to_owned());
        assert_eq!(first, again);

        if let Some(band) = config.find_band(v) {
            assert!(band.contains(v));
        }
    }
});
