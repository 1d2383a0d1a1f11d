//! Fuzz target for station file parsing.
//!
//! Tests that `StationFile::parse` handles arbitrary input without
//! panicking and only resolves numeric workstation values.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sd_core::station_file::StationFile;

fuzz_target!(|data: &str| {
    let file = StationFile::parse(data);
    if let Some(identity) = file.identity(true) {
        assert!(!identity.store_id.is_empty());
        assert!(identity.workstation_id.bytes().all(|b| b.is_ascii_digit()));
    }
});
