// Commandline argument parser using clap for air2sofa

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct AirArgs {
    #[command(subcommand)]
    /// Which task to perform, a single conversion or a whole directory
    pub command: CommandTask,

    /// Only report warnings and failures
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// Convert one intermediate .mat file to a SOFA file
    #[command(about)]
    Single(SingleCommand),

    /// Convert every matching .mat file in a directory
    #[command(about)]
    Batch(BatchCommand),
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct SingleCommand {
    /// Path of the intermediate .mat file to convert
    pub input: PathBuf,

    /// Directory the .sofa file is written to
    #[arg(short = 'o', long = "out_dir", default_value = "out_sofa")]
    pub out_dir: PathBuf,

    /// Replace an existing output file instead of skipping it
    #[arg(long = "overwrite")]
    pub overwrite: bool,
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct BatchCommand {
    /// Directory containing the intermediate .mat files
    #[arg(short = 'i', long = "in_dir", default_value = "out_intermediate")]
    pub in_dir: PathBuf,

    /// Directory the .sofa files are written to
    #[arg(short = 'o', long = "out_dir", default_value = "out_sofa")]
    pub out_dir: PathBuf,

    /// Glob pattern for file names inside the input directory
    #[arg(short = 'p', long = "pattern", default_value = "*.mat")]
    pub pattern: String,

    /// Replace existing output files instead of skipping them
    #[arg(long = "overwrite")]
    pub overwrite: bool,
}
