// Lockstep - Cycle-Accurate Multicore Simulation Driver
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::Parser;
use lockstep_config::SimConfig;
use lockstep_core::{register_builtins, CycleEngine, Machine, SimSummary};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

const EXIT_OK: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Lockstep multicore simulation driver",
    long_about = None
)]
struct Cli {
    /// Path to the simulation config (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Machine template to assemble (overrides the config file)
    #[arg(short, long)]
    machine: Option<String>,

    /// Core count for templates that consume it (overrides the config file)
    #[arg(long)]
    num_cores: Option<u32>,

    /// Committed-instruction budget (overrides the config file)
    #[arg(long)]
    stop_at_user_insns: Option<u64>,

    /// Advance the cores across worker threads
    #[arg(long)]
    threaded: bool,

    /// Simulation log verbosity (overrides the config file)
    #[arg(long)]
    loglevel: Option<u8>,

    /// Write a JSON run summary to this path
    #[arg(long)]
    result_json: Option<PathBuf>,

    /// Enable debug-level diagnostics
    #[arg(short, long)]
    trace: bool,
}

#[derive(Debug, Serialize)]
struct RunResult<'a> {
    result_schema_version: &'static str,
    #[serde(flatten)]
    summary: &'a SimSummary,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    run(cli)
}

fn run(cli: Cli) -> ExitCode {
    let mut config = match &cli.config {
        Some(path) => match SimConfig::from_file(path) {
            Ok(config) => config,
            Err(err) => {
                error!("{err:#}");
                return ExitCode::from(EXIT_CONFIG_ERROR);
            }
        },
        None => SimConfig::default(),
    };

    if let Some(machine) = cli.machine {
        config.machine_config = machine;
    }
    if let Some(num_cores) = cli.num_cores {
        config.num_cores = num_cores;
    }
    if let Some(budget) = cli.stop_at_user_insns {
        config.stop_at_user_insns = budget;
    }
    if cli.threaded {
        config.threaded_simulation = true;
    }
    if let Some(loglevel) = cli.loglevel {
        config.loglevel = loglevel;
    }

    if let Err(err) = config.validate() {
        error!("invalid configuration: {err}");
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }

    register_builtins();

    let mut machine = Machine::new(config.machine_config.clone(), config);
    if let Err(err) = machine.assemble() {
        error!("machine assembly failed: {err}");
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }
    info!(
        machine = %machine.name(),
        cores = machine.num_cores(),
        "machine assembled"
    );

    let mut engine = match CycleEngine::new(machine) {
        Ok(engine) => engine,
        Err(err) => {
            error!("could not set up the cycle engine: {err}");
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };

    let summary = match engine.simulate() {
        Ok(summary) => summary,
        Err(err) => {
            error!("simulation failed: {err}");
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };

    println!(
        "{}: exited after {} cycles, {} instructions committed ({:?})",
        summary.machine, summary.cycles, summary.total_user_insns_committed, summary.stop_reason
    );

    if let Some(path) = &cli.result_json {
        let result = RunResult {
            result_schema_version: RESULT_SCHEMA_VERSION,
            summary: &summary,
        };
        let payload = match serde_json::to_string_pretty(&result) {
            Ok(payload) => payload,
            Err(err) => {
                error!("could not serialize the run summary: {err}");
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
        };
        if let Err(err) = std::fs::write(path, payload) {
            error!("could not write {path:?}: {err}");
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
        info!(path = %path.display(), "run summary written");
    }

    ExitCode::from(EXIT_OK)
}
