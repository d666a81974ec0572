use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "class-sealer")]
#[command(about = "Mark leaf JVM classes final and seal closed hierarchies across a whole link set")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Diagnostic level: all, trace, debug, info, warning, error or off
    #[arg(long, value_name = "LEVEL", default_value = "warning", global = true)]
    pub log: String,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Analyze a link set and write the rewritten copy
    Seal {
        /// Jars (one unit each) or exploded directories (one subdirectory per unit)
        #[arg(required = true, value_name = "INPUT")]
        inputs: Vec<PathBuf>,

        #[arg(short = 'o', long, value_name = "DIR")]
        out: PathBuf,

        /// `*` or a comma-separated list of units to rewrite
        #[arg(long, value_name = "UNITS", default_value = "*")]
        units: String,

        #[arg(long)]
        no_final: bool,

        #[arg(long)]
        no_seal: bool,

        #[arg(short = 'f', long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
    /// Print what the reader sees in one class file
    Inspect {
        #[arg(value_name = "CLASS_FILE")]
        class_file: PathBuf,
    },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum ReportFormat {
    Json,
    Text,
}
