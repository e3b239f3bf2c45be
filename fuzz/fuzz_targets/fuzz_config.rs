#![no_main]

use dz_core::parse_viewer_config_value;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let parsed = parse_viewer_config_value(&value);
    assert!(parsed.config.min_zoom_level <= parsed.config.max_zoom_level);
});
