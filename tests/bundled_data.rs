//! End-to-end checks against the tables shipped in `data/` and the
//! embedded rates edition.

use std::path::PathBuf;

use milpay_flow::{
    FiscalRates, LookupError, PayBreakdown, PayContext, PayGrade, PayInputs, ReferenceData,
    ResolveError,
};

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

fn context() -> PayContext {
    PayContext {
        reference: ReferenceData::load_dir(data_dir()).unwrap(),
        rates: FiscalRates::embedded().unwrap(),
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn resolve(context: &PayContext, inputs: &PayInputs) -> PayBreakdown {
    context.resolver().try_resolve(inputs).unwrap()
}

#[test]
fn base_pay_matches_csv_cell_for_cell() {
    let context = context();
    let mut reader = csv::Reader::from_path(data_dir().join("base_pay.csv")).unwrap();
    let years: Vec<u32> = reader
        .headers()
        .unwrap()
        .iter()
        .skip(1)
        .map(|y| y.parse().unwrap())
        .collect();

    let mut rows = 0;
    for record in reader.records() {
        let record = record.unwrap();
        let grade: PayGrade = record[0].parse().unwrap();

        for (cell, &year) in record.iter().skip(1).zip(&years) {
            let looked_up = context.reference.base_pay(grade, year);
            if cell.trim().is_empty() {
                assert!(looked_up.is_err(), "{} year {} should be blank", grade, year);
            } else {
                assert_eq!(looked_up.unwrap(), cell.parse::<f64>().unwrap(), "{} year {}", grade, year);
            }
        }
        rows += 1;
    }

    assert_eq!(rows, PayGrade::ALL.len());
}

#[test]
fn every_zip_resolves_for_every_grade() {
    let context = context();
    let zips = std::fs::read_to_string(data_dir().join("zip_mha.txt")).unwrap();

    for line in zips.lines().filter(|l| !l.trim().is_empty()) {
        let zip = line.split_whitespace().next().unwrap();
        for grade in PayGrade::ALL {
            for has_dependents in [true, false] {
                let area = context.reference.area_for_zip(zip).unwrap();
                let housing = context.reference.allowance(area, grade, has_dependents);
                assert!(housing.is_ok(), "{} {} {}", zip, grade, has_dependents);
            }
        }
    }
}

#[test]
fn junior_enlisted_at_fort_walton_beach() {
    let context = context();
    let inputs = PayInputs::new(PayGrade::E1, 1, true, "32544", 15);
    let breakdown = resolve(&context, &inputs);

    assert_eq!(breakdown.amount("Base Pay"), Some(1833.30));
    assert_eq!(breakdown.amount("BAH"), Some(1476.0));
    assert_eq!(breakdown.amount("BAS"), Some(386.50));
    assert!(close(breakdown.amount("Agency Match").unwrap(), 1833.30 * 0.05));
    assert!(close(breakdown.amount("TSP").unwrap(), 1833.30 * 0.15));
    assert!(close(breakdown.amount("Total Monthly Income").unwrap(), 3695.80));
    assert!(close(breakdown.amount("Federal Income Tax (Est)").unwrap(), 2044.9592 / 12.0));
}

#[test]
fn without_dependents_uses_the_other_table() {
    let context = context();
    let inputs = PayInputs::new(PayGrade::E1, 1, false, "32544", 15);

    assert_eq!(resolve(&context, &inputs).amount("BAH"), Some(1151.0));
}

#[test]
fn officer_under_the_match_cap() {
    let context = context();
    let inputs = PayInputs::new(PayGrade::O3, 3, true, "32544", 3);
    let breakdown = resolve(&context, &inputs);

    assert_eq!(breakdown.amount("Base Pay"), Some(5672.10));
    assert_eq!(breakdown.amount("BAS"), Some(266.18));
    assert!(close(breakdown.amount("Agency Match").unwrap(), 5672.10 * 0.03));
    assert!(close(breakdown.amount("TSP").unwrap(), 5672.10 * 0.03));
}

#[test]
fn warrant_officers_draw_enlisted_subsistence() {
    let context = context();
    let inputs = PayInputs::new(PayGrade::W1, 1, true, "92134", 5);

    assert_eq!(resolve(&context, &inputs).amount("BAS"), Some(386.50));
}

#[test]
fn o3e_has_no_pay_before_year_four() {
    let context = context();

    let early = PayInputs::new(PayGrade::O3E, 3, true, "32544", 5);
    assert!(matches!(
        context.resolver().try_resolve(&early),
        Err(ResolveError::Lookup(LookupError::NoBasePay { years: 3, .. }))
    ));

    let later = PayInputs::new(PayGrade::O3E, 4, true, "32544", 5);
    assert_eq!(resolve(&context, &later).amount("Base Pay"), Some(6980.40));
}

#[test]
fn unknown_zip_yields_nothing() {
    let context = context();
    let inputs = PayInputs::new(PayGrade::E4, 3, true, "00000", 5).with_expense("Rent", 900.0);

    assert!(context.resolver().resolve(&inputs).is_none());
}

#[test]
fn rates_directory_overrides_embedded_edition() {
    let catalog = milpay_flow::RatesCatalog::load_dir(
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("rates"),
    )
    .unwrap();

    assert_eq!(catalog.years(), vec![2021, 2022]);
    let latest = catalog.latest().unwrap();
    assert_eq!(latest.fiscal_year, 2022);
    assert_eq!(latest.subsistence.enlisted, 406.98);
}
