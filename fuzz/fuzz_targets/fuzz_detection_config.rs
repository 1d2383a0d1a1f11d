//! Fuzz target for `detection_config` loading.
//!
//! Arbitrary JSON merged into a store must never panic, in the merge, the
//! validator or path resolution.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sd_config::validate::validate_detection;
use sd_config::{ComponentId, DetectionStore, Dialect, PartialDetectionConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(partial) = serde_json::from_slice::<PartialDetectionConfig>(data) else {
        return;
    };
    let mut store = DetectionStore::new(Dialect::Windows);
    store.set_config(partial);
    let _ = validate_detection(&store.get_config());
    for component in ComponentId::all() {
        let _ = store.get_file_path(*component);
    }
});
