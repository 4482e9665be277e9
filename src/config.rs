// ⚙️ Configuration - where the tables live, which rates edition to use
//
// Precedence: defaults < JSON config file < MILPAY_* environment < CLI flags.

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::rates::{FiscalRates, RatesCatalog};
use crate::reference::{ReferenceData, ReferenceFiles};
use crate::resolver::PayResolver;

/// Picked up from the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "milpay.json";

pub const ENV_DATA_DIR: &str = "MILPAY_DATA_DIR";
pub const ENV_RATES_DIR: &str = "MILPAY_RATES_DIR";
pub const ENV_FISCAL_YEAR: &str = "MILPAY_FISCAL_YEAR";
pub const ENV_ADDR: &str = "MILPAY_ADDR";

// ============================================================================
// APP CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the three reference tables
    pub data_dir: PathBuf,

    /// Directory of `<year>.json` rates editions; `None` = embedded edition only
    pub rates_dir: Option<PathBuf>,

    /// Pin an edition; otherwise `--as-of` or the latest edition decides
    pub fiscal_year: Option<u16>,

    pub server_addr: String,

    /// tracing-subscriber filter directive
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_dir: PathBuf::from("data"),
            rates_dir: None,
            fiscal_year: None,
            server_addr: "0.0.0.0:3000".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Explicit file (must exist), else `milpay.json` if present, else defaults;
    /// then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => AppConfig::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                AppConfig::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => AppConfig::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `MILPAY_*` values from any key → value source
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_RATES_DIR) {
            self.rates_dir = Some(PathBuf::from(dir));
        }
        if let Some(year) = lookup(ENV_FISCAL_YEAR) {
            let year = year
                .trim()
                .parse()
                .with_context(|| format!("{} is not a year: {:?}", ENV_FISCAL_YEAR, year))?;
            self.fiscal_year = Some(year);
        }
        if let Some(addr) = lookup(ENV_ADDR) {
            self.server_addr = addr;
        }
        Ok(())
    }

    pub fn reference_files(&self) -> ReferenceFiles {
        ReferenceFiles::in_dir(&self.data_dir)
    }

    pub fn rates_catalog(&self) -> Result<RatesCatalog> {
        match &self.rates_dir {
            Some(dir) => RatesCatalog::load_dir(dir),
            None => RatesCatalog::embedded(),
        }
    }

    /// Pinned year, else the edition in effect on `as_of`, else the latest
    pub fn select_rates(&self, catalog: &RatesCatalog, as_of: Option<NaiveDate>) -> Result<FiscalRates> {
        let rates = match (self.fiscal_year, as_of) {
            (Some(year), _) => catalog.edition(year).ok_or_else(|| {
                anyhow!("No rates edition for fiscal year {} (have {:?})", year, catalog.years())
            })?,
            (None, Some(date)) => catalog
                .edition_as_of(date)
                .ok_or_else(|| anyhow!("No rates edition in effect on {}", date))?,
            (None, None) => match catalog.latest() {
                Some(rates) => rates,
                None => bail!("Rates catalog is empty"),
            },
        };

        Ok(rates.clone())
    }

    /// Everything a resolution needs. Fatal on any failure.
    pub fn load_context(&self, as_of: Option<NaiveDate>) -> Result<PayContext> {
        let reference = ReferenceData::load(&self.reference_files())?;
        let catalog = self.rates_catalog()?;
        let rates = self.select_rates(&catalog, as_of)?;

        info!(fiscal_year = rates.fiscal_year, "rates edition selected");

        Ok(PayContext { reference, rates })
    }
}

// ============================================================================
// PAY CONTEXT
// ============================================================================

/// Immutable data every resolution reads, built once at startup
#[derive(Debug, Clone)]
pub struct PayContext {
    pub reference: ReferenceData,
    pub rates: FiscalRates,
}

impl PayContext {
    pub fn resolver(&self) -> PayResolver<'_> {
        PayResolver::new(&self.reference, &self.rates)
    }
}

// ============================================================================
// TESTS
// ============================================================================
