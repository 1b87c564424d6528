use std::path::{Path, PathBuf};

use comfy_table::{Cell, Table};

use crate::cli::output::{print_validation, status_label};
use crate::cli::{build_pipeline, ValidationArgs};
use crate::error::Result;
use crate::export::export_transactions;
use crate::fmt::money;
use crate::settings::Settings;
use crate::validator::ValidationStatus;

pub fn run(
    settings: &Settings,
    files: &[PathBuf],
    entity: &str,
    source_system: Option<&str>,
    sheet: Option<&str>,
    output_dir: Option<&Path>,
    checks: &ValidationArgs,
) -> Result<ValidationStatus> {
    let pipeline = build_pipeline(settings, checks)?;
    let source_system = source_system.unwrap_or(&settings.default_source_system);
    let batch = pipeline.process_batch(files, entity, source_system, sheet);

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
    }

    let mut table = Table::new();
    table.set_header(vec!["File", "Status", "Transactions", "Debits", "Credits"]);
    for (index, file) in batch.files.iter().enumerate() {
        let name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.path.display().to_string());
        match &file.output {
            Some(out) => {
                let m = &out.validation.key_metrics;
                table.add_row(vec![
                    Cell::new(&name),
                    Cell::new(status_label(out.validation.status)),
                    Cell::new(m.total_transactions),
                    Cell::new(money(m.total_debits)),
                    Cell::new(money(m.total_credits)),
                ]);
                if let Some(dir) = output_dir {
                    let target = dir.join(output_file_name(&file.path, file.checksum.as_deref(), index));
                    export_transactions(&target, &out.transactions)?;
                }
            }
            None => {
                table.add_row(vec![
                    Cell::new(&name),
                    Cell::new("skipped (duplicate)"),
                    Cell::new(""),
                    Cell::new(""),
                    Cell::new(""),
                ]);
            }
        }
    }
    println!("{table}\n");
    print_validation(&batch.consolidated);
    Ok(batch.consolidated.status)
}

/// `<stem>-<checksum prefix>.csv`, or `<stem>-<index>.csv` when the file
/// could not be read. Inputs sharing a stem get distinct outputs.
fn output_file_name(path: &Path, checksum: Option<&str>, index: usize) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "gl".to_string());
    match checksum {
        Some(sum) => format!("{stem}-{}.csv", &sum[..sum.len().min(8)]),
        None => format!("{stem}-{index}.csv"),
    }
}
