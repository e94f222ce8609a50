// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! # WasmBoot Daemon (wasmbootd)
//!
//! Loads a WebAssembly module the way an embedding host would: fetch it,
//! compile it, run its entry point on a first instance, then keep a second
//! instance of the same module alive for further calls.
//!
//! ## Usage
//!
//! ```bash
//! wasmbootd run [RESOURCE] [--config <file>] [--base <dir|url>] [--entry <export>]
//!               [--strategy auto|streaming|buffered] [--call <export[:arg,...]>]... [--stats]
//! wasmbootd inspect [RESOURCE] [--config <file>] [--base <dir|url>] [--strategy <s>]
//! ```
//!
//! `run` exits with the guest's exit code. Logs go to stderr; set
//! `RUST_LOG` for filtering and `RUST_LOG_FORMAT` (`json`, `compact` or
//! `pretty`) to override the configured log format.

#![warn(missing_docs)]

use std::{env, path::PathBuf, process::ExitCode, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use wasmboot_host::Value;
use wasmboot_loader::{
    CompiledModule, DaemonConfig, EntryPointBridge, ExportInfo, LogFormat, Loader, LoaderState,
    LoggingConfig, Session, StrategyPreference,
};

/// WasmBoot daemon CLI arguments
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a module, run its entry point and keep a fresh instance for calls
    Run(RunArgs),
    /// Fetch and compile a module and list its imports and exports
    Inspect(SourceArgs),
}

/// Where the module comes from and how it is compiled
#[derive(Args, Debug, Clone, Default)]
struct SourceArgs {
    /// Module path or URL, relative to the base. Defaults to the configured resource
    resource: Option<String>,

    /// TOML configuration file
    #[arg(short, long, env = "WASMBOOTD_CONFIG")]
    config: Option<PathBuf>,

    /// Directory or URL relative resources resolve against
    #[arg(short, long)]
    base: Option<String>,

    /// Compile strategy: auto, streaming or buffered
    #[arg(short, long)]
    strategy: Option<StrategyPreference>,
}

#[derive(Args, Debug, Clone, Default)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Entry point export run on the first instance
    #[arg(short, long)]
    entry: Option<String>,

    /// Export to call on the live instance after the run, as `name` or
    /// `name:arg,arg`. Arguments are parsed by the export's parameter types.
    /// May be repeated
    #[arg(long = "call", value_name = "EXPORT")]
    calls: Vec<String>,

    /// Show phase timings, the module digest and the state history
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let config = load_config(&args.source, args.entry.as_deref())?;
            initialize_tracing(&config.logging);
            run(&config, &args).await
        }
        Command::Inspect(args) => {
            let config = load_config(&args, None)?;
            initialize_tracing(&config.logging);
            inspect(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Read the configuration file, if any, and apply command line overrides
fn load_config(source: &SourceArgs, entry: Option<&str>) -> Result<DaemonConfig> {
    let mut config = match &source.config {
        Some(path) => DaemonConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => DaemonConfig::default(),
    };

    if let Some(resource) = &source.resource {
        config.loader.resource.clone_from(resource);
    }
    if let Some(base) = &source.base {
        config.loader.base = Some(base.clone());
    }
    if let Some(strategy) = source.strategy {
        config.loader.strategy = strategy;
    }
    if let Some(entry) = entry {
        config.bindings.entry_point = entry.to_string();
    }

    config.loader.validate().context("Invalid loader configuration")?;
    config.bindings.validate().context("Invalid bindings configuration")?;
    Ok(config)
}

/// Initialize the tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level, and
/// `RUST_LOG_FORMAT` over the configured format.
fn initialize_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let format = env::var("RUST_LOG_FORMAT")
        .ok()
        .and_then(|value| value.parse::<LogFormat>().ok())
        .unwrap_or(logging.format);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

async fn run(config: &DaemonConfig, args: &RunArgs) -> Result<ExitCode> {
    let bridge =
        EntryPointBridge::from_config(&config.bindings).context("Failed to create host bindings")?;
    let loader = Loader::new(config.loader.clone(), bridge).context("Failed to create loader")?;

    let mut session = loader
        .load_default()
        .await
        .with_context(|| format!("Failed to load {}", config.loader.resource))?;
    info!(outcome = %session.outcome(), "Program finished");

    for call in &args.calls {
        let (export, params) = parse_call(call, session.exports())?;
        let results = session
            .call(&export, &params)
            .await
            .with_context(|| format!("Call to `{export}` failed"))?;
        println!("{export}: {}", format_values(&results));
    }

    if args.stats {
        display_session_stats(&session);
    }

    Ok(ExitCode::from(exit_status(session.outcome().exit_code())))
}

async fn inspect(config: &DaemonConfig) -> Result<()> {
    let bridge =
        EntryPointBridge::from_config(&config.bindings).context("Failed to create host bindings")?;
    let loader = Loader::new(config.loader.clone(), bridge).context("Failed to create loader")?;

    let module = loader
        .inspect_resource(&config.loader.resource)
        .await
        .with_context(|| format!("Failed to compile {}", config.loader.resource))?;
    display_module(&config.loader.resource, &module);
    Ok(())
}

/// Split a `--call` value into the export name and its parsed arguments
fn parse_call(call: &str, exports: &[ExportInfo]) -> Result<(String, Vec<Value>)> {
    let (name, args) = call.split_once(':').unwrap_or((call, ""));
    let export = exports
        .iter()
        .find(|export| export.name == name)
        .with_context(|| format!("`{name}` is not exported"))?;
    let signature = export
        .signature
        .as_ref()
        .with_context(|| format!("`{name}` is not a callable function"))?;

    let texts: Vec<&str> =
        if args.trim().is_empty() { Vec::new() } else { args.split(',').collect() };
    if texts.len() != signature.params.len() {
        bail!(
            "`{name}` takes {} argument(s) {signature}, got {}",
            signature.params.len(),
            texts.len()
        );
    }

    let params = signature
        .params
        .iter()
        .zip(texts)
        .map(|(ty, text)| Value::parse(*ty, text))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid arguments for `{name}`"))?;
    Ok((name.to_string(), params))
}

/// Map a guest exit code onto a process exit status
fn exit_status(code: i32) -> u8 {
    debug!(code, "Exiting");
    (code & 0xff) as u8
}

fn format_values<T: std::fmt::Display>(values: &[T]) -> String {
    if values.is_empty() {
        return "()".to_string();
    }
    values.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn display_module(resource: &str, module: &CompiledModule) {
    println!("module:  {resource}");
    println!("size:    {} bytes", module.size());
    println!("sha256:  {}", module.digest_hex());

    println!("imports:");
    for import in module.imports() {
        println!("  {import}");
    }
    println!("exports:");
    for export in module.exports() {
        println!("  {export}");
    }
}

fn display_session_stats(session: &Session) {
    let timings = session.timings();
    let history =
        session.history().iter().map(LoaderState::as_str).collect::<Vec<_>>().join(" -> ");

    println!("=== Load Statistics ===");
    println!("sha256:                   {}", session.module().digest_hex());
    println!("module size:              {} bytes", session.module().size());
    println!("outcome:                  {}", session.outcome());
    println!("compile and instantiate:  {}", format_duration(timings.compile_and_instantiate));
    println!("run:                      {}", format_duration(timings.run));
    println!("re-instantiate:           {}", format_duration(timings.reinstantiate));
    println!("total:                    {}", format_duration(timings.total()));
    println!("history:                  {history}");
}

fn format_duration(duration: Duration) -> String {
    format!("{:.3} ms", duration.as_secs_f64() * 1000.0)
}
