//! Property tests for the pay arithmetic.
//!
//! Run with: `cargo test --test properties`

use proptest::prelude::*;

use milpay_flow::{
    annual_tax, employer_match, FiscalRates, PayContext, PayGrade, PayInputs, ReferenceData,
    MAX_CONTRIBUTION_PERCENT,
};

fn context() -> PayContext {
    PayContext {
        reference: ReferenceData::load_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/data")).unwrap(),
        rates: FiscalRates::embedded().unwrap(),
    }
}

const ZIPS: [&str; 4] = ["32544", "92134", "23511", "96818"];

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: the match grows with the contribution up to the cap, then stays flat.
    #[test]
    fn property_match_is_capped(
        base in 1000.0f64..20000.0,
        a in 0u8..=MAX_CONTRIBUTION_PERCENT,
        b in 0u8..=MAX_CONTRIBUTION_PERCENT,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(employer_match(base, low, 5) <= employer_match(base, high, 5));

        if low >= 5 {
            prop_assert_eq!(employer_match(base, low, 5), employer_match(base, high, 5));
        }
        prop_assert!(employer_match(base, high, 5) <= base * 0.05 + 1e-9);
    }

    /// PROPERTY: more income never means less tax, and tax never exceeds the top rate.
    #[test]
    fn property_tax_is_monotone(a in 0.0f64..500_000.0, b in 0.0f64..500_000.0) {
        let brackets = FiscalRates::embedded().unwrap().federal_tax_brackets;
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        prop_assert!(annual_tax(low, &brackets) <= annual_tax(high, &brackets) + 1e-9);
        prop_assert!(annual_tax(high, &brackets) <= high * 0.24 + 1e-9);
    }

    /// PROPERTY: no jump at any bracket boundary.
    #[test]
    fn property_tax_is_continuous(index in 0usize..3, offset in 1e-4f64..1e-2) {
        let brackets = FiscalRates::embedded().unwrap().federal_tax_brackets;
        let edge = brackets[index].up_to.unwrap();

        let below = annual_tax(edge - offset, &brackets);
        let above = annual_tax(edge + offset, &brackets);
        prop_assert!((above - below).abs() < offset * 2.0 * 0.24 + 1e-9);
    }

    /// PROPERTY: resolving the same inputs twice gives the same breakdown.
    #[test]
    fn property_resolution_is_deterministic(
        grade_index in 0usize..PayGrade::ALL.len(),
        years in 0u32..=22,
        has_dependents in any::<bool>(),
        zip_index in 0usize..ZIPS.len(),
        percent in 0u8..=MAX_CONTRIBUTION_PERCENT,
        expenses in proptest::collection::vec(0.0f64..5000.0, 0..=5),
    ) {
        let context = context();
        let mut inputs = PayInputs::new(
            PayGrade::ALL[grade_index],
            years,
            has_dependents,
            ZIPS[zip_index],
            percent,
        );
        for (i, amount) in expenses.into_iter().enumerate() {
            inputs = inputs.with_expense(format!("Expense {}", i + 1), amount);
        }

        let resolver = context.resolver();
        prop_assert_eq!(resolver.resolve(&inputs), resolver.resolve(&inputs));
    }

    /// PROPERTY: total income carries exactly what feeds it, and the match never
    /// outgrows the member's own contribution.
    #[test]
    fn property_flow_graph_balances(
        grade_index in 0usize..PayGrade::ALL.len(),
        years in 1u32..=20,
        percent in 0u8..=MAX_CONTRIBUTION_PERCENT,
    ) {
        let context = context();
        let inputs = PayInputs::new(PayGrade::ALL[grade_index], years, true, "32544", percent);

        if let Some(breakdown) = context.resolver().resolve(&inputs) {
            let graph = breakdown.flow_graph();
            let total = breakdown.total_index().unwrap();

            prop_assert!((graph.inflow(total) - breakdown.total_income()).abs() < 1e-6);
            prop_assert!(breakdown.amount("TSP").unwrap() >= breakdown.amount("Agency Match").unwrap());
        }
    }
}
