//! Property-based tests for dialect checks, pattern testing and
//! fragment generation.

use proptest::prelude::*;
use sd_config::{ComponentId, DetectionStore, Dialect, GroupMapping};
use sd_core::dialect::{validate_for_dialect, DialectIssue};
use sd_core::generate::generate;
use sd_core::station_file::StationFile;
use sd_core::tester::PatternTester;

/// Pattern pieces that are valid for both engines on their own.
fn ere_atom() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "a",
        "-",
        "[0-9]",
        "[A-Za-z]+",
        "([0-9]{4})",
        "[^-]+",
        "(x|y)",
        "[-_.]",
        "\\.",
        "^",
        "$",
    ])
}

fn ere_pattern() -> impl Strategy<Value = String> {
    prop::collection::vec(ere_atom(), 0..6).prop_map(|atoms| atoms.concat())
}

fn component() -> impl Strategy<Value = ComponentId> {
    prop::sample::select(ComponentId::all().to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Any pattern containing \d is rejected for POSIX and accepted for
    /// Windows.
    #[test]
    fn perl_digit_class_splits_dialects(prefix in ere_pattern(), suffix in ere_pattern()) {
        let pattern = format!("{prefix}\\d{suffix}");

        let posix = validate_for_dialect(&pattern, Dialect::Posix);
        prop_assert!(!posix.compatible, "accepted for POSIX: {pattern}");
        prop_assert_eq!(posix.issue, Some(DialectIssue::PerlShorthand));
        prop_assert!(posix.reason.is_some());

        let windows = validate_for_dialect(&pattern, Dialect::Windows);
        prop_assert!(windows.compatible, "rejected for Windows: {pattern}: {:?}", windows.reason);
    }

    /// Plain ERE built from brackets, groups and alternation is never flagged.
    #[test]
    fn plain_ere_is_accepted_everywhere(pattern in ere_pattern()) {
        for dialect in Dialect::ALL {
            let check = validate_for_dialect(&pattern, dialect);
            prop_assert!(check.compatible, "{dialect} rejected {pattern}: {:?}", check.reason);
        }
    }

    /// Generation is a pure function of the configuration.
    #[test]
    fn generation_is_deterministic(
        segments in prop::collection::vec("[a-z0-9_]{1,8}", 1..4),
        component in component(),
        with_environment in any::<bool>(),
    ) {
        let base = format!("/{}", segments.join("/"));
        let mut store = DetectionStore::new(Dialect::Posix);
        store.set_base_directory(&base);
        store.set_environment_extraction(with_environment);

        for dialect in Dialect::ALL {
            let first = generate(&mut store, component, dialect);
            let second = generate(&mut store.clone(), component, dialect);
            prop_assert_eq!(&first, &second);
            prop_assert!(first.text.contains(&base));
            prop_assert!(first.text.contains(component.as_str()));
        }
    }

    /// Two-group extraction returns exactly the numbers that were embedded.
    #[test]
    fn two_group_extraction_recovers_numbers(
        prefix in "[A-Z]{2,6}",
        store in 0u32..10_000,
        workstation in 0u32..1_000,
    ) {
        let identity = format!("{prefix}-{store:04}-{workstation:03}");
        let tester = PatternTester::new(GroupMapping::for_family(false), false);
        for (dialect, pattern) in [
            (Dialect::Posix, r"^[^-]+-([0-9]{4})-([0-9]{3})$"),
            (Dialect::Windows, r"^[^-]+-(\d{4})-(\d{3})$"),
        ] {
            let result = tester.test(pattern, dialect, &identity);
            prop_assert!(result.success, "{dialect}: {:?}", result.error);
            prop_assert_eq!(result.store_id, format!("{store:04}"));
            prop_assert_eq!(result.workstation_id, format!("{workstation:03}"));
            prop_assert!(result.environment.is_none());
        }
    }

    /// A file with a store and a numeric workstation always resolves, no
    /// matter what other lines surround it.
    #[test]
    fn station_file_resolves_with_noise(
        store in "[A-Za-z0-9]{1,8}",
        workstation in "[0-9]{1,6}",
        noise in prop::collection::vec("[a-z]{1,6}=[a-z0-9 ]{0,6}", 0..4),
        crlf in any::<bool>(),
    ) {
        let eol = if crlf { "\r\n" } else { "\n" };
        let mut lines = noise.clone();
        lines.push(format!("StoreID={store}"));
        lines.extend(noise);
        lines.push(format!("WorkstationID={workstation}"));
        let content = lines.join(eol);

        let identity = StationFile::parse(&content).identity(false);
        prop_assert!(identity.is_some());
        let identity = identity.unwrap();
        prop_assert_eq!(identity.store_id, store);
        prop_assert_eq!(identity.workstation_id, workstation);
    }
}
