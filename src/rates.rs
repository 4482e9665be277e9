// 📅 Fiscal Rates - year-specific published figures as versioned data
// BAS, TSP match cap and federal brackets live in rates/<year>.json so a new
// fiscal year is a data drop, not a code change.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::grade::PayGrade;
use crate::tax::TaxBracket;

/// Edition compiled into the binary, used when no rates directory is configured
pub const EMBEDDED_EDITION: &str = include_str!("../rates/2021.json");

// ============================================================================
// FISCAL RATES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubsistenceRates {
    pub officer: f64,
    pub enlisted: f64,
}

/// One fiscal-year edition of the published figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalRates {
    pub fiscal_year: u16,
    pub effective_from: NaiveDate,

    /// Where the figures were published
    #[serde(default)]
    pub source: String,

    pub subsistence: SubsistenceRates,

    /// Employer match stops growing at this contribution percentage
    pub retirement_match_cap_percent: u8,

    pub federal_tax_brackets: Vec<TaxBracket>,
}

impl FiscalRates {
    pub fn from_json(json: &str) -> Result<Self> {
        let rates: FiscalRates =
            serde_json::from_str(json).context("Failed to parse fiscal rates JSON")?;
        rates.validate()?;
        Ok(rates)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rates file: {:?}", path.as_ref()))?;

        FiscalRates::from_json(&content)
            .with_context(|| format!("Invalid rates file: {:?}", path.as_ref()))
    }

    pub fn embedded() -> Result<Self> {
        FiscalRates::from_json(EMBEDDED_EDITION).context("Embedded rates edition")
    }

    /// Monthly BAS for a grade
    pub fn subsistence_for(&self, grade: PayGrade) -> f64 {
        if grade.is_officer() {
            self.subsistence.officer
        } else {
            self.subsistence.enlisted
        }
    }

    fn validate(&self) -> Result<()> {
        if self.subsistence.officer < 0.0 || self.subsistence.enlisted < 0.0 {
            bail!("{}: subsistence rates must be non-negative", self.fiscal_year);
        }

        if self.retirement_match_cap_percent > 100 {
            bail!("{}: match cap above 100%", self.fiscal_year);
        }

        if self.federal_tax_brackets.is_empty() {
            bail!("{}: no federal tax brackets", self.fiscal_year);
        }

        let last = self.federal_tax_brackets.len() - 1;
        let mut previous = 0.0;

        for (i, bracket) in self.federal_tax_brackets.iter().enumerate() {
            if !(0.0..=1.0).contains(&bracket.rate) {
                bail!("{}: bracket {} rate {} outside [0, 1]", self.fiscal_year, i + 1, bracket.rate);
            }

            match bracket.up_to {
                Some(threshold) if threshold <= previous => {
                    bail!(
                        "{}: bracket thresholds must increase ({} after {})",
                        self.fiscal_year,
                        threshold,
                        previous
                    );
                }
                Some(threshold) => previous = threshold,
                None if i != last => {
                    bail!("{}: only the last bracket may be unbounded", self.fiscal_year);
                }
                None => {}
            }
        }

        Ok(())
    }
}

// ============================================================================
// CATALOG
// ============================================================================

/// All editions known to the process, keyed by fiscal year
#[derive(Debug, Clone)]
pub struct RatesCatalog {
    editions: BTreeMap<u16, FiscalRates>,
}

impl RatesCatalog {
    /// Catalog holding only the embedded edition
    pub fn embedded() -> Result<Self> {
        let mut catalog = RatesCatalog {
            editions: BTreeMap::new(),
        };
        catalog.insert(FiscalRates::embedded()?);
        Ok(catalog)
    }

    /// Embedded edition plus every `*.json` in `dir`; files win over the
    /// embedded edition for the same year.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut catalog = RatesCatalog::embedded()?;

        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read rates directory: {:?}", dir))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let rates = FiscalRates::from_file(&path)?;
            info!(fiscal_year = rates.fiscal_year, path = %path.display(), "rates edition loaded");
            catalog.insert(rates);
        }

        Ok(catalog)
    }

    pub fn insert(&mut self, rates: FiscalRates) {
        self.editions.insert(rates.fiscal_year, rates);
    }

    pub fn edition(&self, fiscal_year: u16) -> Option<&FiscalRates> {
        self.editions.get(&fiscal_year)
    }

    /// Latest edition already in effect on `date`
    pub fn edition_as_of(&self, date: NaiveDate) -> Option<&FiscalRates> {
        self.editions
            .values()
            .filter(|rates| rates.effective_from <= date)
            .max_by_key(|rates| rates.effective_from)
    }

    pub fn latest(&self) -> Option<&FiscalRates> {
        self.editions.values().next_back()
    }

    pub fn years(&self) -> Vec<u16> {
        self.editions.keys().copied().collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EDITION_2022: &str = include_str!("../rates/2022.json");

    #[test]
    fn test_embedded_edition() {
        let rates = FiscalRates::embedded().unwrap();

        assert_eq!(rates.fiscal_year, 2021);
        assert_eq!(rates.subsistence_for(PayGrade::E1), 386.50);
        assert_eq!(rates.subsistence_for(PayGrade::W3), 386.50);
        assert_eq!(rates.subsistence_for(PayGrade::O3), 266.18);
        assert_eq!(rates.subsistence_for(PayGrade::O2E), 266.18);
        assert_eq!(rates.retirement_match_cap_percent, 5);
        assert_eq!(rates.federal_tax_brackets.len(), 4);
        assert_eq!(rates.federal_tax_brackets[3].up_to, None);
    }

    #[test]
    fn test_rejects_unordered_brackets() {
        let json = EMBEDDED_EDITION.replace("40525.0", "5000.0");
        let error = FiscalRates::from_json(&json).unwrap_err();
        assert!(format!("{:#}", error).contains("must increase"));
    }

    #[test]
    fn test_rejects_unbounded_middle_bracket() {
        let json = EMBEDDED_EDITION.replace("\"up_to\": 40525.0", "\"up_to\": null");
        assert!(FiscalRates::from_json(&json).is_err());
    }

    #[test]
    fn test_rejects_bad_rate() {
        let json = EMBEDDED_EDITION.replace("0.24", "24");
        assert!(FiscalRates::from_json(&json).is_err());
    }

    #[test]
    fn test_catalog_selection() {
        let mut catalog = RatesCatalog::embedded().unwrap();
        catalog.insert(FiscalRates::from_json(EDITION_2022).unwrap());

        assert_eq!(catalog.years(), vec![2021, 2022]);
        assert_eq!(catalog.latest().unwrap().fiscal_year, 2022);
        assert_eq!(catalog.edition(2022).unwrap().subsistence.enlisted, 406.98);
        assert!(catalog.edition(2019).is_none());

        let mid_2021 = NaiveDate::from_ymd_opt(2021, 7, 1).unwrap();
        let mid_2022 = NaiveDate::from_ymd_opt(2022, 7, 1).unwrap();
        let before = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();

        assert_eq!(catalog.edition_as_of(mid_2021).unwrap().fiscal_year, 2021);
        assert_eq!(catalog.edition_as_of(mid_2022).unwrap().fiscal_year, 2022);
        assert!(catalog.edition_as_of(before).is_none());
    }

    #[test]
    fn test_catalog_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2022.json"), EDITION_2022).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = RatesCatalog::load_dir(dir.path()).unwrap();
        assert_eq!(catalog.years(), vec![2021, 2022]);
    }

    #[test]
    fn test_catalog_load_dir_rejects_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2023.json"), "{ not json").unwrap();

        assert!(RatesCatalog::load_dir(dir.path()).is_err());
    }
}
