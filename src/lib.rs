// Military Pay Flow - Core Library
// Exposes all modules for use in CLI, TUI, API server, and tests

pub mod grade;
pub mod reference;  // Reference tables: zip → MHA, BAH, base pay
pub mod rates;      // Versioned fiscal-year figures: BAS, TSP match cap, tax brackets
pub mod tax;
pub mod resolver;   // Inputs → breakdown
pub mod breakdown;  // Line items + flow graph
pub mod form;       // Presentation view state
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use grade::{GradeCategory, PayGrade};
pub use reference::{
    AllowanceTable, BasePayTable, LookupError, ReferenceData, ReferenceFiles,
};
pub use rates::{FiscalRates, RatesCatalog, SubsistenceRates};
pub use tax::{annual_tax, monthly_tax, TaxBracket};
pub use resolver::{
    employer_match, retirement_contribution, annual_taxable_pay,
    Entry, PayInputs, PayResolver, ResolveError,
    MAX_CONTRIBUTION_PERCENT, MAX_EXPENSES, MAX_INCOMES,
};
pub use breakdown::{
    cents, FlowCategory, FlowGraph, FlowLink, ItemLink, LineItem, PayBreakdown,
};
pub use form::{EntryRow, EntryRows, FormState};
pub use config::{AppConfig, PayContext};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
