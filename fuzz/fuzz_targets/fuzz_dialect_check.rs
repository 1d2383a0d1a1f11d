//! Fuzz target for regex dialect checks.
//!
//! The POSIX scan must never panic, and anything it accepts must also be
//! accepted for Windows.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sd_config::Dialect;
use sd_core::dialect::validate_for_dialect;

fuzz_target!(|pattern: &str| {
    let posix = validate_for_dialect(pattern, Dialect::Posix);
    let windows = validate_for_dialect(pattern, Dialect::Windows);
    if posix.compatible {
        assert!(windows.compatible);
    }
});
