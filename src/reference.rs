// 📚 Reference Data Store - zip → housing area, BAH, base pay
// Loaded once at startup, read-only afterwards. Any defect in a table is fatal.

use anyhow::{anyhow, bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::grade::PayGrade;

/// Default file names inside the data directory
pub const ZIP_TO_AREA_FILE: &str = "zip_mha.txt";
pub const ALLOWANCE_WITH_DEPENDENTS_FILE: &str = "bah_with_dependents.txt";
pub const ALLOWANCE_WITHOUT_DEPENDENTS_FILE: &str = "bah_without_dependents.txt";
pub const BASE_PAY_FILE: &str = "base_pay.csv";

/// First header cell of the base pay table
pub const BASE_PAY_GRADE_HEADER: &str = "PAY GRADE";

// ============================================================================
// LOOKUP ERRORS
// ============================================================================

/// A reference row is missing. Always recoverable: the caller simply has
/// no breakdown for the current inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("zip code {0:?} has no military housing area")]
    UnknownZip(String),

    #[error("housing area {0:?} is not in the allowance tables")]
    UnknownArea(String),

    #[error("no housing allowance for {grade} in {area}")]
    NoAllowance { area: String, grade: PayGrade },

    #[error("no base pay for {grade} at {years} years of service")]
    NoBasePay { grade: PayGrade, years: u32 },

    #[error("unknown pay grade {0:?}")]
    UnknownGrade(String),
}

// ============================================================================
// FILE LOCATIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceFiles {
    pub zip_to_area: PathBuf,
    pub allowance_with_dependents: PathBuf,
    pub allowance_without_dependents: PathBuf,
    pub base_pay: PathBuf,
}

impl ReferenceFiles {
    /// Standard file names under one directory
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        ReferenceFiles {
            zip_to_area: dir.join(ZIP_TO_AREA_FILE),
            allowance_with_dependents: dir.join(ALLOWANCE_WITH_DEPENDENTS_FILE),
            allowance_without_dependents: dir.join(ALLOWANCE_WITHOUT_DEPENDENTS_FILE),
            base_pay: dir.join(BASE_PAY_FILE),
        }
    }
}

// ============================================================================
// TABLES
// ============================================================================

/// Monthly housing allowance by area, one amount per grade in canonical order.
/// A blank cell means the grade has no published rate for that area.
#[derive(Debug, Clone, Default)]
pub struct AllowanceTable {
    rates: HashMap<String, Vec<Option<f64>>>,
}

impl AllowanceTable {
    pub fn get(&self, area_code: &str, grade: PayGrade) -> Result<f64, LookupError> {
        let row = self
            .rates
            .get(area_code)
            .ok_or_else(|| LookupError::UnknownArea(area_code.to_string()))?;

        row.get(grade.column())
            .copied()
            .flatten()
            .ok_or_else(|| LookupError::NoAllowance {
                area: area_code.to_string(),
                grade,
            })
    }

    pub fn contains_area(&self, area_code: &str) -> bool {
        self.rates.contains_key(area_code)
    }

    pub fn areas(&self) -> BTreeSet<&str> {
        self.rates.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Monthly base pay by grade and years-of-service column
#[derive(Debug, Clone, Default)]
pub struct BasePayTable {
    years: Vec<u32>,
    rows: HashMap<PayGrade, Vec<Option<f64>>>,
}

impl BasePayTable {
    pub fn get(&self, grade: PayGrade, years_of_service: u32) -> Result<f64, LookupError> {
        let missing = || LookupError::NoBasePay {
            grade,
            years: years_of_service,
        };

        let column = self
            .years
            .iter()
            .position(|&y| y == years_of_service)
            .ok_or_else(missing)?;

        self.rows
            .get(&grade)
            .and_then(|row| row.get(column).copied().flatten())
            .ok_or_else(missing)
    }

    /// Year columns present in the table header, in file order
    pub fn years(&self) -> &[u32] {
        &self.years
    }

    /// Grades present in the table, in canonical order
    pub fn grades(&self) -> Vec<PayGrade> {
        let mut grades: Vec<PayGrade> = self.rows.keys().copied().collect();
        grades.sort();
        grades
    }
}

// ============================================================================
// REFERENCE DATA
// ============================================================================

/// The immutable lookup context every resolution reads from
#[derive(Debug, Clone)]
pub struct ReferenceData {
    zip_to_area: HashMap<String, String>,
    allowance_with_dependents: AllowanceTable,
    allowance_without_dependents: AllowanceTable,
    base_pay: BasePayTable,
}

impl ReferenceData {
    /// Load all three tables from disk. Fails on the first defect.
    pub fn load(files: &ReferenceFiles) -> Result<Self> {
        fn open(path: &Path) -> Result<File> {
            File::open(path).with_context(|| format!("Failed to open reference table: {:?}", path))
        }

        let data = ReferenceData::from_readers(
            open(&files.zip_to_area)?,
            open(&files.allowance_with_dependents)?,
            open(&files.allowance_without_dependents)?,
            open(&files.base_pay)?,
        )
        .with_context(|| {
            format!(
                "Failed to load reference data from {:?}",
                files.zip_to_area.parent().unwrap_or_else(|| Path::new("."))
            )
        })?;

        info!(
            zips = data.zip_count(),
            areas = data.area_count(),
            grades = data.base_pay.rows.len(),
            years = data.base_pay.years.len(),
            "reference data loaded"
        );

        Ok(data)
    }

    /// Load from the standard file names in `dir`
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        ReferenceData::load(&ReferenceFiles::in_dir(dir))
    }

    /// Build from arbitrary sources (files, in-memory fixtures)
    pub fn from_readers<Z: Read, W: Read, O: Read, B: Read>(
        zip_to_area: Z,
        allowance_with_dependents: W,
        allowance_without_dependents: O,
        base_pay: B,
    ) -> Result<Self> {
        let zip_to_area = parse_zip_to_area(zip_to_area).context("zip → housing area table")?;
        let allowance_with_dependents = parse_allowance_table(allowance_with_dependents)
            .context("housing allowance table (with dependents)")?;
        let allowance_without_dependents = parse_allowance_table(allowance_without_dependents)
            .context("housing allowance table (without dependents)")?;
        let base_pay = parse_base_pay_table(base_pay).context("base pay table")?;

        let with_areas = allowance_with_dependents.areas();
        let without_areas = allowance_without_dependents.areas();
        if with_areas != without_areas {
            let only_with: Vec<&str> = with_areas.difference(&without_areas).copied().collect();
            let only_without: Vec<&str> = without_areas.difference(&with_areas).copied().collect();
            bail!(
                "Housing allowance tables cover different areas (only with dependents: {:?}, only without: {:?})",
                only_with,
                only_without
            );
        }

        let orphaned = zip_to_area
            .values()
            .filter(|area| !allowance_with_dependents.contains_area(area))
            .count();
        if orphaned > 0 {
            warn!(orphaned, "zip codes map to housing areas with no allowance rates");
        }

        Ok(ReferenceData {
            zip_to_area,
            allowance_with_dependents,
            allowance_without_dependents,
            base_pay,
        })
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    /// Exact match only: no trimming, no zero-padding, no nearest-zip fallback
    pub fn area_for_zip(&self, zip: &str) -> Result<&str, LookupError> {
        self.zip_to_area
            .get(zip)
            .map(String::as_str)
            .ok_or_else(|| LookupError::UnknownZip(zip.to_string()))
    }

    pub fn allowance(
        &self,
        area_code: &str,
        grade: PayGrade,
        has_dependents: bool,
    ) -> Result<f64, LookupError> {
        if has_dependents {
            self.allowance_with_dependents.get(area_code, grade)
        } else {
            self.allowance_without_dependents.get(area_code, grade)
        }
    }

    pub fn base_pay(&self, grade: PayGrade, years_of_service: u32) -> Result<f64, LookupError> {
        self.base_pay.get(grade, years_of_service)
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    pub fn grades(&self) -> Vec<PayGrade> {
        self.base_pay.grades()
    }

    pub fn service_years(&self) -> &[u32] {
        self.base_pay.years()
    }

    pub fn zip_count(&self) -> usize {
        self.zip_to_area.len()
    }

    pub fn area_count(&self) -> usize {
        self.allowance_with_dependents.len()
    }
}

// ============================================================================
// PARSERS
// ============================================================================

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn parse_amount(cell: &str, record: &StringRecord) -> Result<Option<f64>> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }

    let amount: f64 = cell
        .parse()
        .with_context(|| format!("line {}: invalid amount {:?}", line_of(record), cell))?;

    if !amount.is_finite() || amount < 0.0 {
        bail!("line {}: amount out of range {:?}", line_of(record), cell);
    }

    Ok(Some(amount))
}

/// `zip area_code`, single-space delimited, no header
fn parse_zip_to_area<R: Read>(reader: R) -> Result<HashMap<String, String>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut table = HashMap::new();

    for result in rdr.records() {
        let record = result.context("Failed to read zip record")?;

        if record.len() != 2 {
            bail!(
                "line {}: expected 2 columns (zip, area), found {}",
                line_of(&record),
                record.len()
            );
        }

        let zip = &record[0];
        let area = &record[1];

        if zip.len() != 5 || !zip.bytes().all(|b| b.is_ascii_digit()) {
            bail!("line {}: malformed zip code {:?}", line_of(&record), zip);
        }
        if area.is_empty() {
            bail!("line {}: empty housing area for zip {}", line_of(&record), zip);
        }

        if table.insert(zip.to_string(), area.to_string()).is_some() {
            bail!("line {}: duplicate zip code {}", line_of(&record), zip);
        }
    }

    if table.is_empty() {
        bail!("table is empty");
    }

    Ok(table)
}

/// `area_code` followed by one column per grade in canonical order, no header
fn parse_allowance_table<R: Read>(reader: R) -> Result<AllowanceTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let expected = PayGrade::ALL.len() + 1;
    let mut rates = HashMap::new();

    for result in rdr.records() {
        let record = result.context("Failed to read allowance record")?;

        if record.len() != expected {
            bail!(
                "line {}: expected {} columns (area + {} grades), found {}",
                line_of(&record),
                expected,
                PayGrade::ALL.len(),
                record.len()
            );
        }

        let area = record[0].to_string();
        if area.is_empty() {
            bail!("line {}: empty housing area code", line_of(&record));
        }

        let amounts = record
            .iter()
            .skip(1)
            .map(|cell| parse_amount(cell, &record))
            .collect::<Result<Vec<_>>>()?;

        if rates.insert(area.clone(), amounts).is_some() {
            bail!("line {}: duplicate housing area {}", line_of(&record), area);
        }
    }

    if rates.is_empty() {
        bail!("table is empty");
    }

    Ok(AllowanceTable { rates })
}

/// Header `PAY GRADE,1,2,...`; one row per grade
fn parse_base_pay_table<R: Read>(reader: R) -> Result<BasePayTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read header row")?.clone();

    match headers.get(0) {
        Some(BASE_PAY_GRADE_HEADER) => {}
        other => bail!(
            "first header must be {:?}, found {:?}",
            BASE_PAY_GRADE_HEADER,
            other.unwrap_or("")
        ),
    }

    let mut years = Vec::with_capacity(headers.len().saturating_sub(1));
    for cell in headers.iter().skip(1) {
        let year: u32 = cell
            .parse()
            .map_err(|_| anyhow!("year-of-service header is not an integer: {:?}", cell))?;
        if years.contains(&year) {
            bail!("duplicate year-of-service header {}", year);
        }
        years.push(year);
    }

    if years.is_empty() {
        bail!("no year-of-service columns");
    }

    let mut rows = HashMap::new();

    for result in rdr.records() {
        let record = result.context("Failed to read base pay record")?;

        let grade: PayGrade = record[0]
            .parse()
            .with_context(|| format!("line {}: bad pay grade", line_of(&record)))?;

        let amounts = record
            .iter()
            .skip(1)
            .map(|cell| parse_amount(cell, &record))
            .collect::<Result<Vec<_>>>()?;

        if rows.insert(grade, amounts).is_some() {
            bail!("line {}: duplicate pay grade {}", line_of(&record), grade);
        }
    }

    if rows.is_empty() {
        bail!("table is empty");
    }

    Ok(BasePayTable { years, rows })
}

// ============================================================================
// TESTS
// ============================================================================
