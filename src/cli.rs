mod help_text;

use clap::{Args, Parser, Subcommand, ValueEnum};
use help_text::{ASSEMBLE_LONG_ABOUT, DELTA_LONG_ABOUT, REBUILD_LONG_ABOUT, ROOT_LONG_ABOUT};
use std::path::PathBuf;

/// Flatten a source tree into one Markdown snapshot, and turn snapshots back into files
#[derive(Parser, Debug)]
#[command(name = "flatsnap", version, about, long_about = ROOT_LONG_ABOUT)]
pub struct Cli {
    /// Change to DIRECTORY before doing anything
    #[arg(short = 'C', value_name = "DIRECTORY", global = true)]
    pub directory: Option<PathBuf>,

    /// Increase logging verbosity (-v info, -vv debug). Takes precedence over RUST_LOG.
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "log_level"
    )]
    pub verbose: u8,

    /// Set the log level explicitly. Takes precedence over RUST_LOG.
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a snapshot document
    #[command(long_about = ASSEMBLE_LONG_ABOUT)]
    Assemble {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Snapshot document to write [default: codebase.md]
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Only include files changed since this snapshot
        #[arg(short = 's', long, value_name = "SNAPSHOT")]
        since: Option<PathBuf>,

        /// Save the effective settings of this run as TOML
        #[arg(long, value_name = "FILE")]
        save_config: Option<PathBuf>,
    },

    /// List files changed since a snapshot
    #[command(long_about = DELTA_LONG_ABOUT)]
    Delta {
        /// Snapshot document to compare against
        #[arg(short = 's', long, value_name = "SNAPSHOT")]
        since: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Recreate files from a snapshot document
    #[command(long_about = REBUILD_LONG_ABOUT)]
    Rebuild {
        /// Snapshot document to read
        #[arg(value_name = "DOCUMENT")]
        document: PathBuf,

        /// Directory to write the files into
        #[arg(short = 'o', long, value_name = "DIR", default_value = ".")]
        output_dir: PathBuf,

        /// Show what would be created without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the default exclude patterns
    Excludes,
}

/// Which files a snapshot covers. Shared by `assemble` and `delta`.
#[derive(Args, Debug, Default)]
pub struct SelectionArgs {
    /// Files or directories to include [default: .]
    #[arg(value_name = "PATHS")]
    pub paths: Vec<PathBuf>,

    /// Extensions or exact file names to include (e.g. rs .toml env.j2 Dockerfile)
    #[arg(short = 'e', long = "ext", value_name = "EXT", num_args = 1..)]
    pub extensions: Vec<String>,

    /// Additional exclude patterns
    #[arg(short = 'x', long = "exclude", value_name = "PATTERN", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Only look at the top level of each directory
    #[arg(long)]
    pub no_recursive: bool,

    /// Do not apply the default exclude patterns
    #[arg(long)]
    pub no_default_excludes: bool,

    /// Size in megabytes above which files are truncated or skipped
    #[arg(long, value_name = "MB")]
    pub max_size: Option<f64>,

    /// Skip large files instead of truncating them
    #[arg(long)]
    pub no_truncate: bool,

    /// Do not add directory READMEs as context
    #[arg(long)]
    pub no_readmes: bool,

    /// Read settings from a TOML file; other flags override it
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
