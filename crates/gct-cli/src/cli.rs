use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

/// Source model families the translator understands.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputModel {
    /// Relational object/membership/property export
    Plexos,
    /// Flat per-technology tabular export
    Reeds,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a system from a source model and export it
    Translate {
        /// Source model family
        #[arg(long, value_enum)]
        input_model: InputModel,

        /// Run configuration JSON
        #[arg(long)]
        run_config: PathBuf,

        /// Model defaults JSON, layered over the built-in defaults
        #[arg(long)]
        model_config: Option<PathBuf>,

        /// Export schema JSON for the target format
        #[arg(long)]
        export_schema: Option<PathBuf>,

        /// Serialize the built system to this JSON file as well
        #[arg(long)]
        system_out: Option<PathBuf>,

        /// Override the run folder from the run configuration
        #[arg(long)]
        run_folder: Option<PathBuf>,

        /// Override the output folder from the run configuration
        #[arg(long)]
        output: Option<PathBuf>,

        /// Override the study year from the run configuration
        #[arg(long)]
        study_year: Option<i32>,

        /// Override the weather year from the run configuration
        #[arg(long)]
        weather_year: Option<i32>,

        /// Override the scenario from the run configuration
        #[arg(long)]
        scenario: Option<String>,
    },
    /// Check a serialized system for dangling references
    Validate {
        /// System JSON produced by `translate --system-out`
        system: PathBuf,
    },
    /// Export a previously serialized system
    Export {
        /// System JSON produced by `translate --system-out`
        system: PathBuf,

        /// Run configuration JSON
        #[arg(long)]
        run_config: PathBuf,

        /// Export schema JSON for the target format
        #[arg(long)]
        export_schema: Option<PathBuf>,
    },
}
