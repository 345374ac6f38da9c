//! Binary entry point for running myrial programs.
#![forbid(unsafe_code)]

#[path = "myrial/config.rs"]
mod config;

use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use myrial::{
    logging::init_logging,
    query::{Driver, DriverOptions, EvalMode, ExecutorOptions, Output, OutputSink},
    MyrialError,
};
use tracing::{debug, info};

use crate::config::CliConfig;

#[derive(Parser, Debug)]
#[command(
    name = "myrial",
    version,
    about = "Evaluate a myrial query program under bag semantics"
)]
struct Cli {
    #[arg(value_name = "FILE", help = "Program file to run")]
    file: Option<PathBuf>,

    #[arg(long, help = "Materialize every assignment into the store")]
    eager: bool,

    #[arg(long, help = "Owner recorded in materialized relation keys")]
    owner: Option<String>,

    #[arg(long, help = "Fail a DO ... WHILE loop after this many iterations")]
    max_iterations: Option<u64>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Base directory for relative LOAD paths (defaults to the program's directory)"
    )]
    data_dir: Option<PathBuf>,

    #[arg(
        long,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for DUMP, DESCRIBE, and EXPLAIN"
    )]
    format: OutputFormat,

    #[arg(long, env = "MYRIAL_CONFIG", value_name = "FILE", help = "Path to config.toml")]
    config: Option<PathBuf>,

    #[arg(long, help = "Tracing filter, e.g. `info` or `myrial=debug`")]
    log_level: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

struct StdoutSink {
    format: OutputFormat,
}

impl OutputSink for StdoutSink {
    fn emit(&mut self, output: Output) -> myrial::Result<()> {
        let mut out = io::stdout().lock();
        let written = match self.format {
            OutputFormat::Text => writeln!(out, "{output}"),
            OutputFormat::Json => serde_json::to_writer(&mut out, &output)
                .map_err(io::Error::from)
                .and_then(|()| writeln!(out)),
        };
        written.map_err(MyrialError::Output)
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let Some(file) = cli.file.clone() else {
        eprintln!("No input file provided");
        std::process::exit(1);
    };
    let config = CliConfig::load(cli.config.clone())?;

    let level = cli
        .log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .or_else(|| config.log_level().map(str::to_owned))
        .unwrap_or_else(|| "warn".to_owned());
    init_logging(&level)?;
    debug!(config = ?config.path(), "cli.config.loaded");

    let source = fs::read_to_string(&file).map_err(|source| MyrialError::Load {
        path: file.clone(),
        source,
    })?;

    let mode = if cli.eager {
        EvalMode::Eager
    } else {
        config.mode().unwrap_or_default()
    };
    let options = DriverOptions {
        mode,
        owner: cli
            .owner
            .clone()
            .or_else(|| config.owner().map(str::to_owned))
            .unwrap_or_else(|| DriverOptions::default().owner),
        program: file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned()),
        max_iterations: cli.max_iterations.or(config.max_iterations()),
    };
    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| config.data_dir().map(PathBuf::from))
        .or_else(|| file.parent().map(PathBuf::from));

    let mut driver = Driver::new(options, ExecutorOptions { data_dir });
    info!(
        file = %file.display(),
        mode = ?mode,
        run_id = driver.run_id(),
        "cli.run.started"
    );
    let mut sink = StdoutSink { format: cli.format };
    driver.run_source(&source, &mut sink)?;
    info!(run_id = driver.run_id(), "cli.run.completed");
    Ok(())
}
