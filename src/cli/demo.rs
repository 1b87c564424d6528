use std::path::Path;

use colored::Colorize;

use crate::cli::output::{print_report, print_validation};
use crate::cli::{build_pipeline, ValidationArgs};
use crate::demo::write_demo_csv;
use crate::error::Result;
use crate::fmt::money;
use crate::settings::Settings;

const DEMO_ENTITY: &str = "Northwind Consulting";

pub fn run(settings: &Settings, output: &Path, entries: usize, seed: u64) -> Result<()> {
    let ledger = write_demo_csv(output, entries, seed)?;
    println!(
        "{} {} ({} rows, {} journal entries, {} each side)",
        "Wrote sample GL".bold(),
        output.display(),
        ledger.rows.len(),
        ledger.entries,
        money(ledger.total_cents as f64 / 100.0),
    );
    println!();

    let pipeline = build_pipeline(settings, &ValidationArgs::default())?;
    let out = pipeline.process_file(output, DEMO_ENTITY, &settings.default_source_system, None);
    print_report(&out.report);
    println!();
    print_validation(&out.validation);
    println!(
        "\nTry: glprep ingest {} --entity \"{DEMO_ENTITY}\" --output clean.csv",
        output.display()
    );
    Ok(())
}
