use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::detector::{detect_structure, DEFAULT_HEADER_SCAN_ROWS};
use crate::error::Result;
use crate::hierarchy::{build_hierarchy, HierarchyConfig};
use crate::models::{CanonicalTransaction, RawGrid, SourceMeta};
use crate::normalizer::normalize;
use crate::reader::read_grid;
use crate::report::ProcessingReport;
use crate::summary::{SummaryFilter, SummaryKeywords};

fn default_header_scan_rows() -> usize {
    DEFAULT_HEADER_SCAN_ROWS
}

/// Heuristic settings for turning a raw export into canonical rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// How many leading rows to search for the column header row.
    #[serde(default = "default_header_scan_rows")]
    pub header_scan_rows: usize,
    #[serde(default)]
    pub hierarchy: HierarchyConfig,
    #[serde(default)]
    pub summary_keywords: SummaryKeywords,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            header_scan_rows: default_header_scan_rows(),
            hierarchy: HierarchyConfig::default(),
            summary_keywords: SummaryKeywords::default(),
        }
    }
}

/// Runs detect -> classify -> filter -> normalize over one source.
///
/// Holds only read-only configuration; each call builds its own report
/// and hierarchy state, so one ingestor can serve many threads.
#[derive(Debug, Clone)]
pub struct Ingestor {
    config: IngestConfig,
    summary: SummaryFilter,
}

impl Ingestor {
    pub fn new(config: IngestConfig) -> Result<Self> {
        let summary = SummaryFilter::new(&config.summary_keywords)?;
        Ok(Self { config, summary })
    }

    /// Normalize an in-memory grid. Never fails: malformed cells degrade
    /// to defaults and show up only in the report.
    pub fn ingest_grid(
        &self,
        grid: &RawGrid,
        meta: &SourceMeta,
    ) -> (Vec<CanonicalTransaction>, ProcessingReport) {
        let _span = info_span!("ingest", file = %meta.gl_source_file).entered();
        let mut report = ProcessingReport::new(grid.row_count());

        let Some(structure) = detect_structure(grid, self.config.header_scan_rows, &mut report) else {
            return (Vec::new(), report);
        };
        report.header_row_index = Some(structure.header_row_index);
        report.structural_rows = structure.data_start;

        let rows = build_hierarchy(grid, &structure, &self.config.hierarchy, &mut report);
        let rows = self.summary.apply(rows, &mut report);
        let transactions = normalize(rows, meta);
        report.final_transaction_rows = transactions.len();
        debug_assert!(report.is_partitioned(), "{report:?}");

        info!(
            rows_read = report.total_rows_read,
            transactions = report.final_transaction_rows,
            invalid_dates = report.rows_with_invalid_dates,
            summary_removed = report.rows_removed_summary(),
            "ingested GL"
        );
        (transactions, report)
    }

    /// Read and normalize a file. An unreadable source is reported as a
    /// warning with an empty table rather than an error.
    pub fn ingest_file(
        &self,
        path: &Path,
        entity: &str,
        source_system: &str,
        sheet: Option<&str>,
    ) -> (Vec<CanonicalTransaction>, ProcessingReport) {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let meta = SourceMeta::new(entity, source_system, &file_name);

        match read_grid(path, sheet) {
            Ok(grid) => self.ingest_grid(&grid, &meta),
            Err(e) => {
                let mut report = ProcessingReport::default();
                report.warn(format!("Error reading source file: {e}"));
                (Vec::new(), report)
            }
        }
    }
}
