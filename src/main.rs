use anyhow::{Context, Result};
use buildtrace::assembler::TreeAssembler;
use buildtrace::cli::Cli;
use buildtrace::tree::ProcessTree;
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader, Write};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn reconstruct(cli: &Cli) -> Result<ProcessTree> {
    match &cli.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open trace log {}", path.display()))?;
            Ok(TreeAssembler::reconstruct(BufReader::new(file))?)
        }
        None => Ok(TreeAssembler::reconstruct(io::stdin().lock())?),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let mut tree = reconstruct(&cli)?;
    tree.apply_threshold(cli.threshold_ms);

    let json = if cli.pretty {
        tree.to_json_pretty()?
    } else {
        tree.to_json()?
    };

    match &cli.output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }

    Ok(())
}
