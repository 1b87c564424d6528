use crate::cli::output::{print_report, print_validation};
use crate::cli::{build_pipeline, source_system, SourceArgs, ValidationArgs};
use crate::error::Result;
use crate::settings::Settings;
use crate::validator::ValidationStatus;

pub fn run(settings: &Settings, source: &SourceArgs, checks: &ValidationArgs) -> Result<ValidationStatus> {
    let pipeline = build_pipeline(settings, checks)?;
    let out = pipeline.process_file(
        &source.file,
        &source.entity,
        source_system(settings, &source.source_system),
        source.sheet.as_deref(),
    );
    print_report(&out.report);
    println!();
    print_validation(&out.validation);
    Ok(out.validation.status)
}
