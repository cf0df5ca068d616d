// Kiln - kilnd
// Module: Command-line Runner
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! # Kiln runner (kilnd)
//!
//! Loads a WebAssembly module, instantiates it and optionally calls one of
//! its exported functions.
//!
//! ## Usage
//!
//! ```bash
//! kilnd <module.wasm|module.wat> [--invoke NAME] [ARGS...] [--fuel N] [--timeout-ms N]
//!       [--max-call-depth N] [--config FILE] [--stats] [--log-format pretty|compact|json]
//! ```
//!
//! Results are printed to stdout, one per line. Without `--invoke` the
//! exported functions are listed instead. Guests can log through the
//! `env.log(level, ptr, len)` import. Any failure, a trap included, is
//! reported on stderr and exits with status 1.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod values;

use std::{
    io,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use kiln::{logging::LoggingExt, Engine, Extern, InterruptHandle, Linker, Store};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::{FileConfig, Overrides};

/// Kiln WebAssembly runner
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// WebAssembly module, binary or text format (`.wat`)
    module: PathBuf,

    /// Exported function to call
    #[arg(long, value_name = "NAME")]
    invoke: Option<String>,

    /// Arguments for the invoked function, parsed per its parameter types
    #[arg(allow_negative_numbers = true, value_name = "ARGS")]
    args: Vec<String>,

    /// Run with the given amount of fuel, one unit per executed instruction
    #[arg(long)]
    fuel: Option<u64>,

    /// Interrupt execution after this many milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Maximum nesting of WebAssembly calls
    #[arg(long, value_name = "N")]
    max_call_depth: Option<usize>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print execution statistics to stderr
    #[arg(long)]
    stats: bool,

    /// Format of diagnostic output on stderr
    #[arg(long, value_enum, env = "RUST_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Compact,
    Json,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = initialize_tracing(args.log_format) {
        eprintln!("warning: {err:#}");
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        },
    }
}

/// Install the tracing subscriber and route `log` records into it.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
fn initialize_tracing(format: LogFormat) -> Result<()> {
    tracing_log::LogTracer::init().context("failed to forward log records")?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).with_target(true);

    match format {
        LogFormat::Json => tracing::subscriber::set_global_default(subscriber.json().finish()),
        LogFormat::Compact => tracing::subscriber::set_global_default(subscriber.compact().finish()),
        LogFormat::Pretty => tracing::subscriber::set_global_default(subscriber.pretty().finish()),
    }
    .context("failed to install tracing subscriber")
}

fn run(args: &Args) -> Result<()> {
    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = file_config.merge(Overrides {
        fuel:           args.fuel,
        timeout_ms:     args.timeout_ms,
        max_call_depth: args.max_call_depth,
    });
    debug!(?settings, "configuration");

    let bytes = load_module(&args.module)?;
    let engine = Engine::new(settings.engine);
    let start = Instant::now();
    let module = engine.compile(&bytes).with_context(|| format!("failed to compile {}", args.module.display()))?;
    info!("compiled {} in {:?}", args.module.display(), start.elapsed());

    let mut store = Store::new(&engine, ());
    if let Some(fuel) = settings.fuel {
        store.set_fuel(fuel)?;
    }
    let mut linker = Linker::new();
    linker.define_logging()?;

    let _watchdog = settings.timeout_ms.map(|ms| Watchdog::start(store.interrupt_handle(), Duration::from_millis(ms)));

    let instance = linker.instantiate(&mut store, &module).context("failed to instantiate module")?;

    match &args.invoke {
        Some(name) => {
            let func = instance
                .get_func(&store, name)
                .ok_or_else(|| anyhow!("module has no exported function `{name}`"))?;
            let ty = func.ty(&store)?;
            let params = values::parse_args(&args.args, &ty)?;

            let start = Instant::now();
            let results = func.call(&mut store, &params).with_context(|| format!("failed to invoke `{name}`"))?;
            info!("`{name}` returned in {:?}", start.elapsed());
            for value in results {
                println!("{value}");
            }
        },
        None => {
            if !args.args.is_empty() {
                return Err(anyhow!("arguments given without --invoke"));
            }
            for (name, ext) in instance.exports(&store) {
                if let Extern::Func(func) = ext {
                    println!("{name}: {}", func.ty(&store)?);
                }
            }
        },
    }

    if args.stats {
        report_stats(&store, settings.fuel);
    }
    Ok(())
}

/// Read a module, converting the text format when the file ends in `.wat`.
fn load_module(path: &Path) -> Result<Vec<u8>> {
    if path.extension().is_some_and(|ext| ext == "wat") {
        return wat::parse_file(path).with_context(|| format!("failed to parse {}", path.display()));
    }
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    info!("loaded {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

fn report_stats(store: &Store, fuel: Option<u64>) {
    eprintln!("{}", store.stats());
    if let (Some(initial), Some(remaining)) = (fuel, store.fuel_remaining()) {
        eprintln!("fuel consumed:      {}", initial.saturating_sub(remaining));
    }
    for (index, pages) in store.memory_peaks().iter().enumerate() {
        eprintln!("memory {index} peak:      {pages} pages");
    }
}

/// Interrupts the store once its deadline passes, unless dropped first
struct Watchdog {
    cancel: mpsc::Sender<()>,
}

impl Watchdog {
    fn start(handle: InterruptHandle, timeout: Duration) -> Self {
        let (cancel, cancelled) = mpsc::channel::<()>();
        thread::spawn(move || {
            if let Err(mpsc::RecvTimeoutError::Timeout) = cancelled.recv_timeout(timeout) {
                debug!("timeout of {timeout:?} reached, interrupting");
                handle.interrupt();
            }
        });
        Self { cancel }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        let _ = self.cancel.send(());
    }
}
