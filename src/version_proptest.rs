//! Property-based tests for the version-string codec.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::version::{
        compare_os, parse_faft, parse_firmware, parse_os, serialize_faft, serialize_firmware,
        serialize_os, validate_os,
    };
    use proptest::prelude::*;
    use std::cmp::Ordering;

    const NUM: &str = "(0|[1-9][0-9]{0,8})";

    fn os_strategy() -> impl Strategy<Value = String> {
        proptest::string::string_regex(&format!("R{NUM}-{NUM}\\.{NUM}\\.{NUM}"))
            .expect("valid pattern")
    }

    // ============================================================================
    // OS version property tests
    // ============================================================================

    proptest! {
        /// Property: serialize(parse(s)) == s for every grammatical OS version
        #[test]
        fn os_round_trips(s in os_strategy()) {
            let parsed = parse_os(&s).unwrap();
            prop_assert_eq!(serialize_os(&parsed), s);
        }

        /// Property: every version compares equal to itself
        #[test]
        fn os_compare_reflexive(s in os_strategy()) {
            prop_assert_eq!(compare_os(&s, &s).unwrap(), Ordering::Equal);
        }

        /// Property: compare_os(a, b) == -compare_os(b, a)
        #[test]
        fn os_compare_antisymmetric(a in os_strategy(), b in os_strategy()) {
            let ab = compare_os(&a, &b).unwrap();
            let ba = compare_os(&b, &a).unwrap();
            prop_assert_eq!(ab, ba.reverse());
        }

        /// Property: parsing never panics on arbitrary input
        #[test]
        fn os_parse_never_panics(s in ".*") {
            let _ = parse_os(&s);
        }

        /// Property: lowercase prefix is never accepted
        #[test]
        fn os_rejects_lowercase_prefix(s in os_strategy()) {
            let lowered = s.replacen('R', "r", 1);
            prop_assert!(validate_os(&lowered).is_err());
        }

        /// Property: a dropped segment is never accepted
        #[test]
        fn os_rejects_missing_segment(s in os_strategy()) {
            let truncated = match s.rfind('.') {
                Some(idx) => s[..idx].to_string(),
                None => s.clone(),
            };
            prop_assert!(validate_os(&truncated).is_err());
        }
    }

    // ============================================================================
    // Firmware and faft property tests
    // ============================================================================

    proptest! {
        /// Property: firmware versions round-trip
        #[test]
        fn firmware_round_trips(
            platform in "[A-Za-z0-9_]{1,12}",
            os in os_strategy(),
        ) {
            let s = format!("{}-firmware/{}", platform, os);
            let parsed = parse_firmware(&s).unwrap();
            prop_assert_eq!(serialize_firmware(&parsed), s);
        }

        /// Property: faft versions round-trip
        #[test]
        fn faft_round_trips(
            company in "[A-Za-z0-9]{1,8}",
            platform in "[A-Za-z0-9_]{1,12}",
            tip in NUM,
            branch in NUM,
            bb in NUM,
        ) {
            let s = format!("{}_{}.{}.{}.{}", company, platform, tip, branch, bb);
            let parsed = parse_faft(&s).unwrap();
            prop_assert_eq!(serialize_faft(&parsed), s);
        }
    }
}
