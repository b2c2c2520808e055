//! tei2dts CLI - TEI XML to static DTS file tree.
//!
//! Converts one TEI document into the files a plain web server needs to
//! publish it through the document and navigation endpoints of a
//! Distributed Text Services API.

mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands::ConvertArgs;
use output::Output;

/// tei2dts - Create a static DTS file structure from TEI XML.
#[derive(Parser)]
#[command(name = "tei2dts", version, about)]
struct Cli {
    #[command(flatten)]
    convert: ConvertArgs,

    /// Log level (overrides RUST_LOG).
    #[arg(
        short,
        long,
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    log_level: Option<String>,

    /// Enable verbose output (same as --log-level info).
    #[arg(short, long, conflicts_with = "log_level")]
    verbose: bool,
}

impl Cli {
    /// Log filter: explicit level, then --verbose, then RUST_LOG, else warn.
    fn env_filter(&self) -> EnvFilter {
        if let Some(level) = &self.log_level {
            EnvFilter::new(level)
        } else if self.verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    tracing_subscriber::fmt()
        .with_env_filter(cli.env_filter())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = cli.convert.execute() {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
