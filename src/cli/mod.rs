pub mod import;
pub mod init;
pub mod status;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "fxdeals", about = "Batch FX deal importer with per-row validation.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the deal warehouse database.
    Init {
        /// Path for fxdeals data (default: ~/.local/share/fxdeals)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import a batch of deals from a CSV or JSON file.
    Import {
        /// Path to the batch file
        file: String,
        /// Input format (default: inferred from the file extension)
        #[arg(long, value_enum)]
        format: Option<InputFormat>,
        /// Print the summary as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show deal counts and recent imports.
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    Csv,
    Json,
}
