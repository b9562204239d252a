//! # fb2pdf CLI
//!
//! Usage:
//!   fb2pdf book.fb2                      writes book.pdf
//!   fb2pdf book.fb2 -o out.pdf
//!   fb2pdf --skip-unknown false book.fb2 fail on the first unknown element

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fb2pdf::{default_output_path, ConvertOptions, Converter};

#[derive(Parser)]
#[command(name = "fb2pdf")]
#[command(version, about = "Convert FictionBook (FB2) e-books to PDF", long_about = None)]
struct Cli {
    /// FB2 book to convert
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output PDF (default: INPUT with .fb2 replaced by .pdf)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Skip and list unknown elements instead of failing
    #[arg(long, value_name = "BOOL", default_value_t = true, action = clap::ArgAction::Set)]
    skip_unknown: bool,

    /// Directory with TrueType fonts to embed
    #[arg(long, value_name = "DIR")]
    font_dir: Option<PathBuf>,

    /// Write a JSON summary of the conversion
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Do not list unknown elements
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    let converter = Converter::new(ConvertOptions {
        skip_unknown: cli.skip_unknown,
        font_dir: cli.font_dir.clone(),
    });
    let report = converter.convert_file(&cli.input, &output)?;

    if !cli.quiet {
        for name in &report.unknown_elements {
            println!("unknown element: {name}");
        }
    }

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json)
            .map_err(|e| format!("failed to write report {}: {e}", path.display()))?;
    }

    Ok(())
}
