use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::ingest::{IngestConfig, Ingestor};
use crate::models::{CanonicalTransaction, RawGrid, SourceMeta};
use crate::reader::file_checksum;
use crate::report::ProcessingReport;
use crate::validator::{ValidationConfig, ValidationResult, Validator};

/// Everything one source produces: canonical rows, how they were derived,
/// and whether they are fit for downstream use.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub transactions: Vec<CanonicalTransaction>,
    pub report: ProcessingReport,
    pub validation: ValidationResult,
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub checksum: Option<String>,
    /// `None` when the file was skipped as a duplicate of an earlier one.
    pub output: Option<PipelineOutput>,
}

#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub files: Vec<FileOutcome>,
    pub consolidated: ValidationResult,
}

/// Ingestion followed immediately by validation.
#[derive(Debug, Clone)]
pub struct Pipeline {
    ingestor: Ingestor,
    validator: Validator,
}

impl Pipeline {
    pub fn new(ingest: IngestConfig, validation: ValidationConfig) -> Result<Self> {
        Ok(Self {
            ingestor: Ingestor::new(ingest)?,
            validator: Validator::new(validation),
        })
    }

    pub fn process_grid(&self, grid: &RawGrid, meta: &SourceMeta) -> PipelineOutput {
        let (transactions, report) = self.ingestor.ingest_grid(grid, meta);
        self.finish(transactions, report)
    }

    pub fn process_file(
        &self,
        path: &Path,
        entity: &str,
        source_system: &str,
        sheet: Option<&str>,
    ) -> PipelineOutput {
        let (transactions, report) = self.ingestor.ingest_file(path, entity, source_system, sheet);
        self.finish(transactions, report)
    }

    fn finish(&self, transactions: Vec<CanonicalTransaction>, report: ProcessingReport) -> PipelineOutput {
        let validation = self.validator.validate(&transactions, Some(&report));
        PipelineOutput {
            transactions,
            report,
            validation,
        }
    }

    /// Process several files for one entity. Files are independent, so they
    /// run on separate threads; a file whose contents match an earlier one
    /// is skipped. The consolidated result covers every processed file.
    pub fn process_batch(
        &self,
        paths: &[PathBuf],
        entity: &str,
        source_system: &str,
        sheet: Option<&str>,
    ) -> BatchOutput {
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        let mut files: Vec<FileOutcome> = Vec::with_capacity(paths.len());

        for path in paths {
            // An unreadable file still goes through the pipeline so the
            // read failure lands in its report.
            let checksum = file_checksum(path).ok();
            let duplicate = checksum.as_ref().is_some_and(|c| !seen.insert(c.clone()));
            if duplicate {
                warn!(path = %path.display(), "skipping duplicate file (same checksum)");
            } else {
                pending.push(files.len());
            }
            files.push(FileOutcome {
                path: path.clone(),
                checksum,
                output: None,
            });
        }

        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .max(1);
        let chunk_size = pending.len().div_ceil(workers).max(1);

        let results: Vec<(usize, PipelineOutput)> = std::thread::scope(|scope| {
            let handles: Vec<_> = pending
                .chunks(chunk_size)
                .map(|chunk| {
                    let files = &files;
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|&i| {
                                let output =
                                    self.process_file(&files[i].path, entity, source_system, sheet);
                                (i, output)
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });

        for (i, output) in results {
            files[i].output = Some(output);
        }

        let consolidated = ValidationResult::consolidate(
            files
                .iter()
                .filter_map(|f| f.output.as_ref())
                .map(|o| (&o.validation, Some(&o.report))),
        );
        info!(
            files = files.len(),
            processed = pending.len(),
            status = consolidated.status.as_str(),
            "batch complete"
        );

        BatchOutput {
            files,
            consolidated,
        }
    }
}
