use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{GlError, Result};
use crate::models::{CanonicalTransaction, CANONICAL_COLUMNS};
use crate::report::ProcessingReport;
use crate::validator::ValidationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn for_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            _ => Err(GlError::UnsupportedFormat(format!(
                "{} (output must be .csv or .json)",
                path.display()
            ))),
        }
    }
}

/// Write the canonical table. The header is always written, even for an
/// empty table, so consumers can rely on the column set.
pub fn write_transactions_csv<W: Write>(writer: W, transactions: &[CanonicalTransaction]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(CANONICAL_COLUMNS)?;
    for txn in transactions {
        wtr.serialize(txn)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_transactions_json<W: Write>(writer: W, transactions: &[CanonicalTransaction]) -> Result<()> {
    serde_json::to_writer_pretty(writer, transactions)?;
    Ok(())
}

/// Write the table to `path` in the format its extension names.
pub fn export_transactions(path: &Path, transactions: &[CanonicalTransaction]) -> Result<()> {
    let format = ExportFormat::for_path(path)?;
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    match format {
        ExportFormat::Csv => write_transactions_csv(file, transactions)?,
        ExportFormat::Json => write_transactions_json(file, transactions)?,
    }
    info!(path = %path.display(), rows = transactions.len(), "exported transactions");
    Ok(())
}

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    report: &'a ProcessingReport,
    validation: &'a ValidationResult,
}

/// Processing report and validation outcome as one JSON document.
pub fn export_run_summary(
    path: &Path,
    report: &ProcessingReport,
    validation: &ValidationResult,
) -> Result<()> {
    let json = serde_json::to_string_pretty(&RunSummary { report, validation })?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}
