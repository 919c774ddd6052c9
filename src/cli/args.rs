use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Applies //go:fix inline directives to Go code
#[derive(Parser)]
#[command(name = "gofix")]
#[command(version)]
#[command(about = "Inline calls, constants and type aliases marked //go:fix inline", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log filter directive, e.g. `gofix=debug`
    #[arg(long, global = true, value_name = "FILTER")]
    pub log: Option<String>,

    /// Print how long each phase took
    #[arg(long, global = true)]
    pub timings: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report uses of inlinable functions, constants and type aliases
    Check {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Show source excerpts
        #[arg(short, long)]
        verbose: bool,
    },
    /// Apply the suggested fixes
    Fix {
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Inline a single call
    Inline {
        /// Go source file holding the call
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Position of the call: `line:col` or a byte offset
        #[arg(value_name = "POS")]
        position: String,

        /// Write the result back instead of printing it
        #[arg(short, long)]
        write: bool,

        /// Fail instead of wrapping the body in a function literal
        #[arg(long)]
        no_literalize: bool,

        /// Print the inliner's decisions
        #[arg(short, long)]
        verbose: bool,
    },
    /// Helpers for bisecting over inlining changes
    Bisect {
        #[command(subcommand)]
        command: BisectCommand,
    },
}

#[derive(Args)]
pub struct AnalysisArgs {
    /// Package directories; packages below them are included
    #[arg(value_name = "DIR", default_value = ".")]
    pub dirs: Vec<PathBuf>,

    /// Bisect pattern selecting the enabled changes
    #[arg(long, value_name = "PATTERN")]
    pub bisect: Option<String>,

    /// Worker threads (0 = one per CPU)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Subcommand)]
pub enum BisectCommand {
    /// Print the match marker for a change id
    Marker {
        /// Change id, decimal or `0x` hex
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Remove the match marker from a line and print the line and the id
    Cut {
        #[arg(value_name = "LINE")]
        line: String,
    },
}
