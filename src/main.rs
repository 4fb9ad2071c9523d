//! vm-bridge CLI entry point.
//!
//! Assembles one program with the guest module, runs it, and prints the
//! guest's output on stdout. Status messages and logs go to stderr.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use vm_bridge_common::ConfigFile;
use vm_bridge_core::{CompiledModule, WasmEngine};
use vm_bridge_session::{AssembleOutcome, RunOutcome, SessionController};

/// Assemble and run a program inside the assembler/VM guest module.
#[derive(Debug, Parser)]
#[command(name = "vm-bridge", version, about)]
struct Cli {
    /// Program source file, or `-` to read it from stdin.
    program: PathBuf,

    /// Guest module (.wasm or .wat); overrides `[guest] module`.
    #[arg(long, env = "VM_BRIDGE_GUEST")]
    guest: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Whitespace-separated input values.
    #[arg(long, conflicts_with = "input_file")]
    input: Option<String>,

    /// File holding whitespace-separated input values.
    #[arg(long)]
    input_file: Option<PathBuf>,

    /// Number of times to run the assembled program.
    #[arg(long, default_value_t = 1)]
    runs: u32,

    /// Print a JSON session report instead of plain output.
    #[arg(long)]
    json: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// What happened during one CLI invocation.
#[derive(Debug, Serialize)]
struct SessionReport {
    assemble: AssembleOutcome,
    runs: Vec<RunReport>,
    status: String,
}

#[derive(Debug, Serialize)]
struct RunReport {
    #[serde(flatten)]
    outcome: RunOutcome,
    output: Vec<String>,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,vm_bridge=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

fn read_program(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read program from stdin")?;
        return Ok(source);
    }

    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read program {}", path.display()))
}

fn read_input(cli: &Cli) -> anyhow::Result<String> {
    match (&cli.input, &cli.input_file) {
        (Some(input), _) => Ok(input.clone()),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.log_format);

    // Load configuration
    let config = match &cli.config {
        Some(path) => ConfigFile::from_file(path)
            .with_context(|| format!("Invalid configuration {}", path.display()))?,
        None => ConfigFile::default(),
    };

    let guest_path = cli
        .guest
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.guest.module));

    info!(guest = %guest_path.display(), "Configuration loaded");

    let program = read_program(&cli.program)?;
    let input = read_input(&cli)?;

    let engine = WasmEngine::new(&config.runtime.engine)?;
    let module = CompiledModule::from_file(engine.inner(), &guest_path)
        .with_context(|| format!("Failed to load guest module {}", guest_path.display()))?;
    let mut session = SessionController::new(&engine, &module, &config.runtime.execution)?;

    let assemble = session.assemble(&program, &input)?;

    let mut runs = Vec::new();
    if assemble.is_assembled() {
        for _ in 0..cli.runs {
            let outcome = session.run()?;

            if !cli.json {
                print!("{}", session.output().text());
            }

            let halted = outcome.is_halted();
            runs.push(RunReport {
                outcome,
                output: session.output().lines().to_vec(),
            });

            if !halted {
                break;
            }
        }
    }

    let succeeded = assemble.is_assembled() && runs.iter().all(|run| run.outcome.is_halted());

    if cli.json {
        let report = SessionReport {
            assemble,
            runs,
            status: session.status().to_string(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!("{}", session.status());
    }

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
