//! Property tests for the arithmetic evaluator.
//!
//! Integer arithmetic must agree with checked `i128` arithmetic, and no input
//! may make the evaluator panic or exhaust the stack.

use proptest::prelude::*;

use blockscan::{evaluate, Number, MAX_OPERATORS};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn never_panics(text in "[0-9a-z+*/^()._ -]{0,40}") {
        let _ = evaluate(&text);
    }

    #[test]
    fn sums_and_products_match_checked_math(
        a in 0i128..1_000_000,
        b in 0i128..1_000_000,
        c in 0i128..1_000_000,
    ) {
        let expected = b.checked_mul(c).and_then(|bc| a.checked_add(bc));
        prop_assert_eq!(
            evaluate(&format!("{a} + {b} * {c}")),
            expected.map(Number::Int)
        );
        prop_assert_eq!(evaluate(&format!("({a} - {b}) * {c}")), Some(Number::Int((a - b) * c)));
    }

    #[test]
    fn xor_matches_integer_xor(a in any::<u64>(), b in any::<u64>()) {
        let (a, b) = (i128::from(a), i128::from(b));
        prop_assert_eq!(evaluate(&format!("{a} xor {b}")), Some(Number::Int(a ^ b)));
        prop_assert_eq!(evaluate(&format!("{a:#x} xor {b:#x}")), Some(Number::Int(a ^ b)));
    }

    #[test]
    fn small_powers_are_exact(base in 0i128..50, exp in 0u32..10) {
        prop_assert_eq!(
            evaluate(&format!("{base}^{exp}")),
            Some(Number::Int(base.pow(exp)))
        );
    }

    #[test]
    fn u64_literals_round_trip(v in any::<u64>()) {
        prop_assert_eq!(evaluate(&v.to_string()).and_then(Number::as_u64), Some(v));
        prop_assert_eq!(evaluate(&format!("{v:#x}")).and_then(Number::as_u64), Some(v));
    }

    #[test]
    fn chains_of_any_length_yield_value_or_none(
        terms in 1usize..4 * MAX_OPERATORS,
        op in prop::sample::select(vec!["+", "*", "-", " xor "]),
    ) {
        let text = vec!["1"; terms].join(op);
        let value = evaluate(&text);
        prop_assert_eq!(value.is_some(), terms <= MAX_OPERATORS + 1);
    }

    #[test]
    fn identifiers_never_evaluate(name in "[a-wyz_][a-z_]{0,8}", n in 0i64..100) {
        prop_assert_eq!(evaluate(&name), None);
        prop_assert_eq!(evaluate(&format!("{n} + {name}")), None);
    }
}
