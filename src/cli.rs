//! CLI argument parsing for buildtrace

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "buildtrace")]
#[command(version)]
#[command(about = "Reconstruct a build's process tree from a filtered strace log", long_about = None)]
pub struct Cli {
    /// Filtered strace log to read (defaults to stdin).
    ///
    /// Produce one with:
    ///   strace -ftts 1024 make -Bsj12 2>&1 | egrep 'exit_group|vfork|execve'
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Write the JSON tree to FILE instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Minimal process duration to keep, in milliseconds
    #[arg(
        short = 't',
        long = "threshold-ms",
        value_name = "MS",
        default_value = "100"
    )]
    pub threshold_ms: i64,

    /// Pretty-print the JSON output
    #[arg(long = "pretty")]
    pub pretty: bool,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
