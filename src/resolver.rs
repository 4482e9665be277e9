// 🧮 Pay Resolver - inputs → ordered breakdown
// Pure: reads only the immutable reference data and rates edition it is given.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::breakdown::{
    FlowCategory, PayBreakdown, BASE_PAY_LABEL, EMPLOYER_MATCH_LABEL, FEDERAL_TAX_LABEL,
    HOUSING_LABEL, RETIREMENT_LABEL, SUBSISTENCE_LABEL,
};
use crate::grade::PayGrade;
use crate::rates::FiscalRates;
use crate::reference::{LookupError, ReferenceData};
use crate::tax;

pub const MAX_EXPENSES: usize = 5;
pub const MAX_INCOMES: usize = 3;
pub const MAX_CONTRIBUTION_PERCENT: u8 = 50;

// ============================================================================
// INPUTS
// ============================================================================

/// A free-text line the member adds: an expense or a side income.
/// No amount means the row is not filled in yet and is left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub amount: Option<f64>,
}

impl Entry {
    pub fn new(label: impl Into<String>, amount: f64) -> Self {
        Entry {
            label: label.into(),
            amount: Some(amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayInputs {
    pub grade: PayGrade,
    pub years_of_service: u32,
    pub has_dependents: bool,
    pub zip_code: String,
    pub retirement_contribution_percent: u8,
    #[serde(default)]
    pub expenses: Vec<Entry>,
    #[serde(default)]
    pub incomes: Vec<Entry>,
}

impl PayInputs {
    pub fn new(
        grade: PayGrade,
        years_of_service: u32,
        has_dependents: bool,
        zip_code: impl Into<String>,
        retirement_contribution_percent: u8,
    ) -> Self {
        PayInputs {
            grade,
            years_of_service,
            has_dependents,
            zip_code: zip_code.into(),
            retirement_contribution_percent,
            expenses: Vec::new(),
            incomes: Vec::new(),
        }
    }

    /// Builder pattern: add an expense row
    pub fn with_expense(mut self, label: impl Into<String>, amount: f64) -> Self {
        self.expenses.push(Entry::new(label, amount));
        self
    }

    /// Builder pattern: add a supplemental income row
    pub fn with_income(mut self, label: impl Into<String>, amount: f64) -> Self {
        self.incomes.push(Entry::new(label, amount));
        self
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Why the current inputs have no breakdown. Never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("{field} out of range: {detail}")]
    InputOutOfRange { field: &'static str, detail: String },
}

// ============================================================================
// ARITHMETIC
// ============================================================================

/// Member's retirement contribution for the month
pub fn retirement_contribution(base_pay: f64, percent: u8) -> f64 {
    base_pay * f64::from(percent) / 100.0
}

/// Employer match: dollar-for-dollar up to `cap_percent` of base pay
pub fn employer_match(base_pay: f64, percent: u8, cap_percent: u8) -> f64 {
    base_pay * f64::from(percent.min(cap_percent)) / 100.0
}

/// Annual income subject to federal tax. Allowances and the match are
/// tax-free; retirement contributions come out pre-tax.
pub fn annual_taxable_pay(base_pay: f64, contribution: f64) -> f64 {
    (base_pay - contribution) * 12.0
}

// ============================================================================
// RESOLVER
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct PayResolver<'a> {
    reference: &'a ReferenceData,
    rates: &'a FiscalRates,
}

impl<'a> PayResolver<'a> {
    pub fn new(reference: &'a ReferenceData, rates: &'a FiscalRates) -> Self {
        PayResolver { reference, rates }
    }

    pub fn rates(&self) -> &'a FiscalRates {
        self.rates
    }

    /// Breakdown for the current inputs, or `None` while they don't resolve
    /// (half-typed zip, grade without pay at that longevity, ...).
    pub fn resolve(&self, inputs: &PayInputs) -> Option<PayBreakdown> {
        match self.try_resolve(inputs) {
            Ok(breakdown) => Some(breakdown),
            Err(e) => {
                debug!(error = %e, zip = %inputs.zip_code, grade = %inputs.grade, "no breakdown");
                None
            }
        }
    }

    pub fn try_resolve(&self, inputs: &PayInputs) -> Result<PayBreakdown, ResolveError> {
        if inputs.retirement_contribution_percent > MAX_CONTRIBUTION_PERCENT {
            return Err(ResolveError::InputOutOfRange {
                field: "retirement_contribution_percent",
                detail: format!(
                    "{} is above {}",
                    inputs.retirement_contribution_percent, MAX_CONTRIBUTION_PERCENT
                ),
            });
        }
        let incomes = supplied_entries(&inputs.incomes, "incomes", "Income", MAX_INCOMES)?;
        let expenses = supplied_entries(&inputs.expenses, "expenses", "Expense", MAX_EXPENSES)?;

        let area = self.reference.area_for_zip(&inputs.zip_code)?;
        let housing = self
            .reference
            .allowance(area, inputs.grade, inputs.has_dependents)?;
        let base_pay = self
            .reference
            .base_pay(inputs.grade, inputs.years_of_service)?;

        let percent = inputs.retirement_contribution_percent;
        let contribution = retirement_contribution(base_pay, percent);
        let agency_match =
            employer_match(base_pay, percent, self.rates.retirement_match_cap_percent);
        let subsistence = self.rates.subsistence_for(inputs.grade);
        let federal_tax = tax::monthly_tax(
            annual_taxable_pay(base_pay, contribution),
            &self.rates.federal_tax_brackets,
        );

        let total_income = base_pay
            + housing
            + subsistence
            + incomes.iter().map(|(_, amount)| amount).sum::<f64>();

        // Inflows
        let mut breakdown = PayBreakdown::new();
        let base_item = breakdown.push(BASE_PAY_LABEL, base_pay, FlowCategory::Income);
        let mut feeders = vec![
            base_item,
            breakdown.push(HOUSING_LABEL, housing, FlowCategory::Income),
            breakdown.push(SUBSISTENCE_LABEL, subsistence, FlowCategory::Income),
        ];
        for (label, amount) in incomes {
            feeders.push(breakdown.push(label, amount, FlowCategory::Income));
        }

        let total_item = breakdown.push_total(total_income);
        for item in feeders {
            breakdown.link(item, item, total_item);
        }

        // Retirement: the match bypasses total income and lands in TSP directly
        let match_item = breakdown.push(EMPLOYER_MATCH_LABEL, agency_match, FlowCategory::PassThrough);
        let tsp_item = breakdown.push(RETIREMENT_LABEL, contribution, FlowCategory::Deduction);
        breakdown.link(match_item, match_item, tsp_item);
        breakdown.link(tsp_item, total_item, tsp_item);

        // Outflows
        for (label, amount) in expenses {
            let item = breakdown.push(label, amount, FlowCategory::Deduction);
            breakdown.link(item, total_item, item);
        }

        // Withholding is levied on base pay only
        let tax_item = breakdown.push(FEDERAL_TAX_LABEL, federal_tax, FlowCategory::Deduction);
        breakdown.link(tax_item, base_item, tax_item);

        Ok(breakdown)
    }
}

/// Entries with an amount, blank labels replaced by "<Kind> N"
fn supplied_entries(
    entries: &[Entry],
    field: &'static str,
    kind: &str,
    max: usize,
) -> Result<Vec<(String, f64)>, ResolveError> {
    if entries.len() > max {
        return Err(ResolveError::InputOutOfRange {
            field,
            detail: format!("at most {} rows, got {}", max, entries.len()),
        });
    }

    let mut supplied = Vec::with_capacity(entries.len());

    for (i, entry) in entries.iter().enumerate() {
        let Some(amount) = entry.amount else {
            continue;
        };

        if !amount.is_finite() || amount < 0.0 {
            return Err(ResolveError::InputOutOfRange {
                field,
                detail: format!("row {} amount {} must be a non-negative number", i + 1, amount),
            });
        }

        let label = entry.label.trim();
        let label = if label.is_empty() {
            format!("{} {}", kind, i + 1)
        } else {
            label.to_string()
        };

        supplied.push((label, amount));
    }

    Ok(supplied)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::tests::fixture;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn resolve(inputs: &PayInputs) -> Result<PayBreakdown, ResolveError> {
        let reference = fixture();
        let rates = FiscalRates::embedded().unwrap();
        PayResolver::new(&reference, &rates).try_resolve(inputs)
    }

    #[test]
    fn test_enlisted_with_dependents() {
        let inputs = PayInputs::new(PayGrade::E1, 1, true, "32544", 15);
        let breakdown = resolve(&inputs).unwrap();

        assert_eq!(breakdown.amount(BASE_PAY_LABEL), Some(1833.30));
        assert_eq!(breakdown.amount(HOUSING_LABEL), Some(1000.0));
        assert_eq!(breakdown.amount(SUBSISTENCE_LABEL), Some(386.50));
        assert!(close(breakdown.amount(EMPLOYER_MATCH_LABEL).unwrap(), 1833.30 * 0.05));
        assert!(close(breakdown.amount(RETIREMENT_LABEL).unwrap(), 1833.30 * 0.15));
        assert!(close(breakdown.total_income(), 1833.30 + 1000.0 + 386.50));

        // (1833.30 - 274.995) * 12 = 18699.66 → 995 + 8749.66 * 0.12
        let tax = breakdown.amount(FEDERAL_TAX_LABEL).unwrap();
        assert!(close(tax, (995.0 + (18699.66 - 9950.0) * 0.12) / 12.0));
    }

    #[test]
    fn test_officer_below_match_cap() {
        let inputs = PayInputs::new(PayGrade::O3, 1, false, "92134", 3);
        let breakdown = resolve(&inputs).unwrap();

        assert_eq!(breakdown.amount(SUBSISTENCE_LABEL), Some(266.18));
        assert_eq!(breakdown.amount(HOUSING_LABEL), Some(1600.0 + 19.0 * 10.0));
        assert!(close(breakdown.amount(EMPLOYER_MATCH_LABEL).unwrap(), 4636.20 * 0.03));
        assert!(close(breakdown.amount(RETIREMENT_LABEL).unwrap(), 4636.20 * 0.03));
    }

    #[test]
    fn test_item_order_and_links() {
        let inputs = PayInputs::new(PayGrade::E1, 2, true, "32544", 5)
            .with_income("Uber", 300.0)
            .with_expense("Rent", 800.0)
            .with_expense("Food", 200.0);
        let breakdown = resolve(&inputs).unwrap();

        let labels: Vec<&str> = breakdown.items().iter().map(|i| i.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Base Pay",
                "BAH",
                "BAS",
                "Uber",
                "Total Monthly Income",
                "Agency Match",
                "TSP",
                "Rent",
                "Food",
                "Federal Income Tax (Est)",
            ]
        );

        let graph = breakdown.flow_graph();
        let total = 4;
        assert!(close(graph.inflow(total), breakdown.total_income()));
        // TSP receives the member's contribution and the match
        assert!(close(graph.inflow(6), 1833.30 * 0.10));
        // Tax leaves from base pay
        assert_eq!(breakdown.items()[9].link.unwrap().from, 0);
        assert!(breakdown.items()[4].link.is_none());
    }

    #[test]
    fn test_unknown_zip_has_no_breakdown() {
        let reference = fixture();
        let rates = FiscalRates::embedded().unwrap();
        let resolver = PayResolver::new(&reference, &rates);

        for zip in ["", "3", "3254", "325440", "99999"] {
            let inputs = PayInputs::new(PayGrade::E1, 1, true, zip, 5);
            assert!(resolver.resolve(&inputs).is_none(), "zip {:?}", zip);
        }

        let inputs = PayInputs::new(PayGrade::E1, 1, true, "99999", 5);
        assert_eq!(
            resolver.try_resolve(&inputs),
            Err(ResolveError::Lookup(LookupError::UnknownZip("99999".to_string())))
        );
    }

    #[test]
    fn test_years_outside_table() {
        assert!(matches!(
            resolve(&PayInputs::new(PayGrade::E1, 0, true, "32544", 5)),
            Err(ResolveError::Lookup(LookupError::NoBasePay { .. }))
        ));
        assert!(resolve(&PayInputs::new(PayGrade::E1, 21, true, "32544", 5)).is_err());
        // E-9 has blank cells in the fixture
        assert!(resolve(&PayInputs::new(PayGrade::E9, 1, true, "32544", 5)).is_err());
    }

    #[test]
    fn test_input_out_of_range() {
        assert!(matches!(
            resolve(&PayInputs::new(PayGrade::E1, 1, true, "32544", 51)),
            Err(ResolveError::InputOutOfRange { field: "retirement_contribution_percent", .. })
        ));

        let mut inputs = PayInputs::new(PayGrade::E1, 1, true, "32544", 5);
        for i in 0..6 {
            inputs = inputs.with_expense(format!("e{}", i), 1.0);
        }
        assert!(matches!(
            resolve(&inputs),
            Err(ResolveError::InputOutOfRange { field: "expenses", .. })
        ));

        let inputs = PayInputs::new(PayGrade::E1, 1, true, "32544", 5).with_income("Loss", -10.0);
        assert!(matches!(
            resolve(&inputs),
            Err(ResolveError::InputOutOfRange { field: "incomes", .. })
        ));
    }

    #[test]
    fn test_unfilled_and_unlabelled_entries() {
        let mut inputs = PayInputs::new(PayGrade::E1, 1, true, "32544", 5).with_expense("", 50.0);
        inputs.expenses.push(Entry {
            label: "Gym".to_string(),
            amount: None,
        });
        inputs = inputs.with_expense("  ", 25.0);

        let breakdown = resolve(&inputs).unwrap();
        assert_eq!(breakdown.amount("Expense 1"), Some(50.0));
        assert_eq!(breakdown.amount("Expense 3"), Some(25.0));
        assert!(breakdown.get("Gym").is_none());
    }

    #[test]
    fn test_income_named_like_total_does_not_shadow_it() {
        let inputs = PayInputs::new(PayGrade::E1, 1, true, "32544", 15)
            .with_income("Total Monthly Income", 50.0);
        let breakdown = resolve(&inputs).unwrap();

        let total = breakdown.total_index().unwrap();
        assert_eq!(total, 4);
        assert_eq!(breakdown.items()[3].category, FlowCategory::Income);
        assert!(close(breakdown.total_income(), 1833.30 + 1000.0 + 386.50 + 50.0));
        assert!(close(breakdown.flow_graph().inflow(total), breakdown.total_income()));
        assert!(close(
            breakdown.net_remaining(),
            breakdown.total_income() - breakdown.total_outflow()
        ));
    }

    #[test]
    fn test_employer_match_cap() {
        assert_eq!(employer_match(1000.0, 0, 5), 0.0);
        assert_eq!(employer_match(1000.0, 3, 5), 30.0);
        assert_eq!(employer_match(1000.0, 5, 5), 50.0);
        assert_eq!(employer_match(1000.0, 50, 5), 50.0);
    }

    #[test]
    fn test_idempotent() {
        let inputs = PayInputs::new(PayGrade::O3, 3, true, "32544", 12).with_expense("Car", 450.0);
        assert_eq!(resolve(&inputs).unwrap(), resolve(&inputs).unwrap());
    }
}
