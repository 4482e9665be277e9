// 📝 Form State - client-side view state for any presentation layer
//
// Holds the raw text the member is typing plus the "rows revealed" counters
// behind the Add Expense / Add Income buttons. Independent of the resolver:
// `to_inputs()` is the only bridge.

use serde::{Deserialize, Serialize};

use crate::grade::PayGrade;
use crate::resolver::{Entry, PayInputs, MAX_CONTRIBUTION_PERCENT, MAX_EXPENSES, MAX_INCOMES};

/// Starting values of a fresh form
pub const DEFAULT_ZIP: &str = "32544";
pub const DEFAULT_CONTRIBUTION_PERCENT: u8 = 15;

// ============================================================================
// ENTRY ROWS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRow {
    pub label: String,
    pub amount: String,
}

/// Up to `N` rows, revealed one at a time. The counter only grows:
/// hiding a row again is not a thing the form does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRows<const N: usize> {
    rows: [EntryRow; N],
    revealed: usize,
}

impl<const N: usize> EntryRows<N> {
    pub fn new() -> Self {
        EntryRows {
            rows: std::array::from_fn(|_| EntryRow::default()),
            revealed: 0,
        }
    }

    /// Show the next row; false once all `N` are visible
    pub fn reveal(&mut self) -> bool {
        if self.revealed < N {
            self.revealed += 1;
            true
        } else {
            false
        }
    }

    pub fn revealed(&self) -> usize {
        self.revealed
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn visible(&self) -> &[EntryRow] {
        &self.rows[..self.revealed]
    }

    /// Mutable access to a visible row only
    pub fn row_mut(&mut self, index: usize) -> Option<&mut EntryRow> {
        if index < self.revealed {
            self.rows.get_mut(index)
        } else {
            None
        }
    }

    /// Visible rows as resolver entries; unparsable amounts become "not filled in"
    pub fn to_entries(&self) -> Vec<Entry> {
        self.visible()
            .iter()
            .map(|row| Entry {
                label: row.label.trim().to_string(),
                amount: parse_amount(&row.amount),
            })
            .collect()
    }
}

impl<const N: usize> Default for EntryRows<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lenient money parsing for text being typed: "$1,250.50" → 1250.5
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
}

// ============================================================================
// FORM
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub grade: PayGrade,
    pub years_of_service: u32,
    pub has_dependents: bool,
    pub zip_code: String,
    pub contribution_percent: u8,
    pub expenses: EntryRows<MAX_EXPENSES>,
    pub incomes: EntryRows<MAX_INCOMES>,
}

impl Default for FormState {
    fn default() -> Self {
        FormState {
            grade: PayGrade::E1,
            years_of_service: 1,
            has_dependents: true,
            zip_code: DEFAULT_ZIP.to_string(),
            contribution_percent: DEFAULT_CONTRIBUTION_PERCENT,
            expenses: EntryRows::new(),
            incomes: EntryRows::new(),
        }
    }
}

impl FormState {
    pub fn toggle_dependents(&mut self) {
        self.has_dependents = !self.has_dependents;
    }

    /// Move to the neighbouring year column, wrapping around `available`
    pub fn step_years(&mut self, forward: bool, available: &[u32]) {
        if available.is_empty() {
            return;
        }

        let next = match available.iter().position(|&y| y == self.years_of_service) {
            Some(i) if forward => (i + 1) % available.len(),
            Some(i) => (i + available.len() - 1) % available.len(),
            None => 0,
        };
        self.years_of_service = available[next];
    }

    pub fn step_contribution(&mut self, delta: i16) {
        let next = (i16::from(self.contribution_percent) + delta)
            .clamp(0, i16::from(MAX_CONTRIBUTION_PERCENT));
        self.contribution_percent = next as u8;
    }

    /// Zip box accepts at most five digits
    pub fn push_zip_char(&mut self, c: char) {
        if c.is_ascii_digit() && self.zip_code.len() < 5 {
            self.zip_code.push(c);
        }
    }

    pub fn to_inputs(&self) -> PayInputs {
        PayInputs {
            grade: self.grade,
            years_of_service: self.years_of_service,
            has_dependents: self.has_dependents,
            zip_code: self.zip_code.clone(),
            retirement_contribution_percent: self.contribution_percent,
            expenses: self.expenses.to_entries(),
            incomes: self.incomes.to_entries(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
