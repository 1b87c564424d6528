mod cells;
mod cli;
mod demo;
mod detector;
mod error;
mod export;
mod fmt;
mod hierarchy;
mod ingest;
mod logging;
mod models;
mod normalizer;
mod pipeline;
mod reader;
mod report;
mod settings;
mod summary;
mod validator;

use clap::Parser;

use cli::{Cli, Commands, ConfigCommands};
use logging::{init_logging, LogConfig};
use validator::ValidationStatus;

/// Exit status for a run that completed but whose data failed validation.
const EXIT_VALIDATION_FAILED: i32 = 2;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&LogConfig::from_verbosity(cli.verbose, cli.log_format)) {
        eprintln!("Error: {e}");
    }
    let settings = settings::load_settings(cli.config.as_deref());

    let result = match cli.command {
        Commands::Ingest {
            source,
            output,
            summary,
            preview,
            checks,
        } => cli::ingest::run(
            &settings,
            &source,
            output.as_deref(),
            summary.as_deref(),
            preview,
            &checks,
        )
        .map(|()| ValidationStatus::Pass),
        Commands::Validate { source, checks } => cli::validate::run(&settings, &source, &checks),
        Commands::Batch {
            files,
            entity,
            source_system,
            sheet,
            output_dir,
            checks,
        } => cli::batch::run(
            &settings,
            &files,
            &entity,
            source_system.as_deref(),
            sheet.as_deref(),
            output_dir.as_deref(),
            &checks,
        ),
        Commands::Demo {
            output,
            entries,
            seed,
        } => cli::demo::run(&settings, &output, entries, seed).map(|()| ValidationStatus::Pass),
        Commands::Config { command } => match command {
            ConfigCommands::Show => cli::config::show(&settings),
            ConfigCommands::Init { force } => cli::config::init(cli.config.as_deref(), force),
        }
        .map(|()| ValidationStatus::Pass),
    };

    match result {
        Ok(ValidationStatus::Pass) => {}
        Ok(ValidationStatus::Fail) => std::process::exit(EXIT_VALIDATION_FAILED),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
