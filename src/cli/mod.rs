pub mod batch;
pub mod config;
pub mod demo;
pub mod ingest;
pub mod output;
pub mod validate;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::Result;
use crate::logging::LogFormat;
use crate::pipeline::Pipeline;
use crate::settings::Settings;
use crate::validator::ValidationConfig;

#[derive(Parser)]
#[command(
    name = "glprep",
    version,
    about = "Normalize and validate messy General Ledger exports."
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Log output format
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
    /// Settings file (default: ~/.config/glprep/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Normalize a GL export and print the processing report.
    Ingest {
        #[command(flatten)]
        source: SourceArgs,
        /// Write the canonical table here (.csv or .json)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Write the processing report and validation result here as JSON
        #[arg(long)]
        summary: Option<PathBuf>,
        /// Number of normalized rows to preview
        #[arg(long, default_value = "10")]
        preview: usize,
        #[command(flatten)]
        checks: ValidationArgs,
    },
    /// Normalize and validate a GL export. Exits with status 2 on FAIL.
    Validate {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        checks: ValidationArgs,
    },
    /// Process several GL exports for one entity and consolidate the results.
    Batch {
        /// GL files (CSV, TSV or Excel)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Entity the files belong to
        #[arg(long)]
        entity: String,
        /// Source system label (default from settings)
        #[arg(long = "source-system")]
        source_system: Option<String>,
        /// Worksheet name for Excel files
        #[arg(long)]
        sheet: Option<String>,
        /// Write one canonical CSV per processed file into this directory
        #[arg(long = "output-dir")]
        output_dir: Option<PathBuf>,
        #[command(flatten)]
        checks: ValidationArgs,
    },
    /// Write a sample messy GL export and run it through the pipeline.
    Demo {
        /// Where to write the sample CSV
        #[arg(long, short, default_value = "demo_gl.csv")]
        output: PathBuf,
        /// Number of balanced journal entries to generate
        #[arg(long, default_value_t = crate::demo::DEFAULT_ENTRIES)]
        entries: usize,
        /// Random seed
        #[arg(long, default_value_t = crate::demo::DEFAULT_SEED)]
        seed: u64,
    },
    /// Show or initialise settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective settings as JSON.
    Show,
    /// Write the default settings file.
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// GL file (CSV, TSV or Excel)
    pub file: PathBuf,
    /// Entity the file belongs to
    #[arg(long)]
    pub entity: String,
    /// Source system label (default from settings)
    #[arg(long = "source-system")]
    pub source_system: Option<String>,
    /// Worksheet name for Excel files
    #[arg(long)]
    pub sheet: Option<String>,
}

/// Per-run overrides of the validation thresholds in settings.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidationArgs {
    /// Maximum allowed |debits - credits|
    #[arg(long)]
    pub tolerance: Option<f64>,
    /// Minimum number of transactions
    #[arg(long = "min-transactions")]
    pub min_transactions: Option<usize>,
    /// Maximum share of rows without a valid date (0-1)
    #[arg(long = "max-date-failure-rate")]
    pub max_date_failure_rate: Option<f64>,
}

impl ValidationArgs {
    pub fn apply(&self, config: &mut ValidationConfig) {
        if let Some(t) = self.tolerance {
            config.debit_credit_tolerance = t;
        }
        if let Some(n) = self.min_transactions {
            config.min_transactions = n;
        }
        if let Some(r) = self.max_date_failure_rate {
            config.max_date_parse_failure_rate = r;
        }
    }
}

/// Build a pipeline from settings with command-line overrides applied.
pub(crate) fn build_pipeline(settings: &Settings, checks: &ValidationArgs) -> Result<Pipeline> {
    let mut validation = settings.validation.clone();
    checks.apply(&mut validation);
    Pipeline::new(settings.ingest.clone(), validation)
}

pub(crate) fn source_system<'a>(settings: &'a Settings, flag: &'a Option<String>) -> &'a str {
    flag.as_deref().unwrap_or(&settings.default_source_system)
}
