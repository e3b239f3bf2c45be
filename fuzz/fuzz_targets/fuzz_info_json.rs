#![no_main]

use dz_tilesource::{ResolveOptions, tile_source_from_json};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    if let Ok(source) = tile_source_from_json(&value, &ResolveOptions::default()) {
        if let Some(size) = source.size() {
            assert!(size.width > 0 && size.height > 0);
        }
    }
});
