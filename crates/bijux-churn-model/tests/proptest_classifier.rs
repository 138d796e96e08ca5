// SPDX-License-Identifier: Apache-2.0

use bijux_churn_model::{classify, Segment, ALL_SEGMENTS};
use proptest::prelude::*;
use proptest::test_runner::Config;

proptest! {
    #![proptest_config(Config::with_cases(256))]
    #[test]
    fn classify_is_total_and_deterministic(raw in ".{0,24}") {
        let first = classify(Some(&raw));
        let second = classify(Some(&raw));
        prop_assert_eq!(first, second);
        prop_assert!(ALL_SEGMENTS.contains(&first));
    }

    #[test]
    fn classify_ignores_case_and_padding(
        code in prop::sample::select(vec!["p1", "c1", "pf", "pme", "corporativo"]),
        left in " {0,3}",
        right in " {0,3}",
        upper in any::<bool>()
    ) {
        let cased = if upper { code.to_uppercase() } else { code.to_string() };
        let padded = format!("{left}{cased}{right}");
        prop_assert_eq!(classify(Some(&padded)), classify(Some(code)));
    }

    #[test]
    fn unknown_alphanumeric_codes_fall_into_outros(code in "[A-Z]{2}[0-9]{2,4}") {
        prop_assert_eq!(classify(Some(&code)), Segment::Outros);
    }
}
