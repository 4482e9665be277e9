// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

// Use library instead of local modules
use milpay_flow::{cents, logging, AppConfig, Entry, PayContext, PayGrade, PayInputs};

#[derive(Parser, Debug)]
#[command(name = "milpay", version, about = "Where does a service member's monthly pay go?")]
struct Cli {
    /// JSON config file (defaults to ./milpay.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the reference tables
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory of <year>.json rates editions
    #[arg(long, global = true)]
    rates_dir: Option<PathBuf>,

    /// Use this fiscal year's rates edition
    #[arg(long, global = true)]
    fiscal_year: Option<u16>,

    /// Use the rates edition in effect on this date (YYYY-MM-DD)
    #[arg(long, global = true)]
    as_of: Option<NaiveDate>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive calculator (default)
    Tui,

    /// Print one breakdown
    Resolve {
        #[arg(long, default_value = "E-1")]
        grade: PayGrade,

        #[arg(long, default_value_t = 1)]
        years: u32,

        #[arg(long)]
        no_dependents: bool,

        #[arg(long)]
        zip: String,

        /// TSP contribution, percent of base pay
        #[arg(long, default_value_t = 15)]
        tsp: u8,

        /// LABEL=AMOUNT, repeatable (up to 5)
        #[arg(long = "expense", value_name = "LABEL=AMOUNT")]
        expenses: Vec<String>,

        /// LABEL=AMOUNT, repeatable (up to 3)
        #[arg(long = "income", value_name = "LABEL=AMOUNT")]
        incomes: Vec<String>,

        /// Emit the breakdown and flow graph as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load the reference tables and rates, report what was found
    Check,

    /// List pay grades and service years present in the base pay table
    Grades,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = cli.rates_dir {
        config.rates_dir = Some(dir);
    }
    if cli.fiscal_year.is_some() {
        config.fiscal_year = cli.fiscal_year;
    }

    let filter = if cli.verbose { "debug" } else { config.log_filter.as_str() };
    logging::init(filter);

    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => run_ui_mode(&config, cli.as_of),
        Command::Resolve {
            grade,
            years,
            no_dependents,
            zip,
            tsp,
            expenses,
            incomes,
            json,
        } => {
            let mut inputs = PayInputs::new(grade, years, !no_dependents, zip, tsp);
            inputs.expenses = parse_entries(&expenses)?;
            inputs.incomes = parse_entries(&incomes)?;
            run_resolve(&config, cli.as_of, &inputs, json)
        }
        Command::Check => run_check(&config, cli.as_of),
        Command::Grades => run_grades(&config, cli.as_of),
    }
}

fn load(config: &AppConfig, as_of: Option<NaiveDate>) -> Result<PayContext> {
    config
        .load_context(as_of)
        .context("Cannot start without complete reference data")
}

/// `Rent=800` → Entry { "Rent", 800 }
fn parse_entries(raw: &[String]) -> Result<Vec<Entry>> {
    raw.iter()
        .map(|item| {
            let (label, amount) = item
                .rsplit_once('=')
                .with_context(|| format!("expected LABEL=AMOUNT, got {:?}", item))?;
            let amount: f64 = amount
                .trim()
                .parse()
                .with_context(|| format!("bad amount in {:?}", item))?;
            Ok(Entry::new(label.trim(), amount))
        })
        .collect()
}

fn run_resolve(
    config: &AppConfig,
    as_of: Option<NaiveDate>,
    inputs: &PayInputs,
    json: bool,
) -> Result<()> {
    let context = load(config, as_of)?;

    let breakdown = match context.resolver().try_resolve(inputs) {
        Ok(breakdown) => breakdown,
        Err(e) => bail!("No breakdown for these inputs: {}", e),
    };

    if json {
        let output = serde_json::json!({
            "fiscal_year": context.rates.fiscal_year,
            "breakdown": breakdown,
            "flow": breakdown.flow_graph(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "💵 {} · {} yrs · {} · zip {} · TSP {}%  (rates {})",
        inputs.grade,
        inputs.years_of_service,
        if inputs.has_dependents { "with dependents" } else { "no dependents" },
        inputs.zip_code,
        inputs.retirement_contribution_percent,
        context.rates.fiscal_year
    );
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let nodes: Vec<&str> = breakdown.items().iter().map(|i| i.label.as_str()).collect();
    for item in breakdown.items() {
        let flow = match item.link {
            Some(link) => format!("{} → {}", nodes[link.from], nodes[link.to]),
            None => String::new(),
        };
        println!(
            "{:<26} {:>12.2}  {:<12} {}",
            item.label,
            cents(item.amount),
            item.category.as_str(),
            flow
        );
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{:<26} {:>12.2}", "Left over", cents(breakdown.net_remaining()));

    Ok(())
}

fn run_check(config: &AppConfig, as_of: Option<NaiveDate>) -> Result<()> {
    println!("🔍 Checking reference data in {:?}", config.data_dir);

    let context = load(config, as_of)?;
    let reference = &context.reference;

    println!("✓ {} zip codes", reference.zip_count());
    println!("✓ {} housing areas (with and without dependents)", reference.area_count());
    println!(
        "✓ {} pay grades × {} service-year columns",
        reference.grades().len(),
        reference.service_years().len()
    );
    println!(
        "✓ Rates edition {} (effective {}, {} tax brackets)",
        context.rates.fiscal_year,
        context.rates.effective_from,
        context.rates.federal_tax_brackets.len()
    );

    Ok(())
}

fn run_grades(config: &AppConfig, as_of: Option<NaiveDate>) -> Result<()> {
    let context = load(config, as_of)?;
    let reference = &context.reference;

    for grade in reference.grades() {
        let years: Vec<String> = reference
            .service_years()
            .iter()
            .filter(|&&y| reference.base_pay(grade, y).is_ok())
            .map(|y| y.to_string())
            .collect();
        println!("{:<5} {:?}  years: {}", grade.as_str(), grade.category(), years.join(","));
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AppConfig, as_of: Option<NaiveDate>) -> Result<()> {
    println!("🖥️  Loading Military Pay Flow...\n");

    let context = load(config, as_of)?;

    let mut app = ui::App::new(&context);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &AppConfig, _as_of: Option<NaiveDate>) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: milpay resolve --zip 32544");
    eprintln!("   Or web UI: cargo run --bin milpay-server --features server");
    std::process::exit(1);
}
