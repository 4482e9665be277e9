// 🧾 Federal income tax estimate - progressive brackets
//
// Each bracket's tax is the tax owed on every lower bracket plus the income
// falling inside it times its marginal rate. Income above the last modeled
// threshold keeps the top modeled rate (an approximation, not a full table).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Upper bound of annual taxable income for this bracket; `None` = unbounded
    pub up_to: Option<f64>,

    /// Marginal rate (0.22 = 22%)
    pub rate: f64,
}

/// Annual tax owed on `annual_taxable` income.
/// Brackets must be ordered by threshold; negative income owes nothing.
pub fn annual_tax(annual_taxable: f64, brackets: &[TaxBracket]) -> f64 {
    let income = annual_taxable.max(0.0);
    let mut tax = 0.0;
    let mut lower = 0.0;

    for bracket in brackets {
        let upper = bracket.up_to.unwrap_or(f64::INFINITY);

        if income <= upper {
            return tax + (income - lower) * bracket.rate;
        }

        tax += (upper - lower) * bracket.rate;
        lower = upper;
    }

    // Ran past a bounded top bracket: keep its marginal rate
    match brackets.last() {
        Some(top) => tax + (income - lower) * top.rate,
        None => 0.0,
    }
}

/// Monthly withholding estimate
pub fn monthly_tax(annual_taxable: f64, brackets: &[TaxBracket]) -> f64 {
    annual_tax(annual_taxable, brackets) / 12.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brackets_2021() -> Vec<TaxBracket> {
        vec![
            TaxBracket { up_to: Some(9950.0), rate: 0.10 },
            TaxBracket { up_to: Some(40525.0), rate: 0.12 },
            TaxBracket { up_to: Some(86375.0), rate: 0.22 },
            TaxBracket { up_to: None, rate: 0.24 },
        ]
    }

    fn cents(value: f64) -> f64 {
        (value * 100.0).round() / 100.0
    }

    #[test]
    fn test_bracket_boundaries() {
        let brackets = brackets_2021();

        assert_eq!(monthly_tax(0.0, &brackets), 0.0);
        assert_eq!(cents(monthly_tax(9950.0, &brackets)), 82.92);
        // (995 + 30575 * 0.12) / 12
        assert_eq!(cents(monthly_tax(40525.0, &brackets)), 388.67);
        // 995 + 3669 + 10087 = 14751 per year
        assert_eq!(cents(annual_tax(86375.0, &brackets)), 14751.0);
    }

    #[test]
    fn test_top_bracket_is_open_ended() {
        let brackets = brackets_2021();
        let at_top = annual_tax(86375.0, &brackets);

        assert!((annual_tax(186375.0, &brackets) - (at_top + 100000.0 * 0.24)).abs() < 1e-6);
    }

    #[test]
    fn test_middle_of_bracket() {
        let brackets = brackets_2021();
        // 995 + (20000 - 9950) * 0.12
        assert!((annual_tax(20000.0, &brackets) - 2201.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_income_owes_nothing() {
        assert_eq!(annual_tax(-500.0, &brackets_2021()), 0.0);
    }

    #[test]
    fn test_bounded_top_bracket_keeps_rate() {
        let brackets = vec![TaxBracket { up_to: Some(1000.0), rate: 0.10 }];
        assert!((annual_tax(3000.0, &brackets) - 300.0).abs() < 1e-9);
        assert_eq!(annual_tax(3000.0, &[]), 0.0);
    }
}
