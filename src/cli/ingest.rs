use std::path::Path;

use colored::Colorize;

use crate::cli::output::{print_preview, print_report, status_label};
use crate::cli::{build_pipeline, source_system, SourceArgs, ValidationArgs};
use crate::error::Result;
use crate::export::{export_run_summary, export_transactions};
use crate::settings::Settings;

pub fn run(
    settings: &Settings,
    source: &SourceArgs,
    output: Option<&Path>,
    summary: Option<&Path>,
    preview: usize,
    checks: &ValidationArgs,
) -> Result<()> {
    let pipeline = build_pipeline(settings, checks)?;
    let out = pipeline.process_file(
        &source.file,
        &source.entity,
        source_system(settings, &source.source_system),
        source.sheet.as_deref(),
    );

    println!("{} {}", "Ingested".bold(), source.file.display());
    print_report(&out.report);
    print_preview(&out.transactions, preview);
    println!("Validation: {}", status_label(out.validation.status));

    if let Some(path) = output {
        export_transactions(path, &out.transactions)?;
        println!("Wrote {} rows to {}", out.transactions.len(), path.display());
    }
    if let Some(path) = summary {
        export_run_summary(path, &out.report, &out.validation)?;
        println!("Wrote summary to {}", path.display());
    }
    Ok(())
}
