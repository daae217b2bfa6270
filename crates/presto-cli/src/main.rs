//! Presto CLI: parses arguments, wires up logging, builds the pipeline
//! from a runbook YAML file, and drives the orchestrator.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use presto_core::Error as CoreError;

/// A declarative pipeline runner: walk a DAG of commands, fanning each
/// node out over the scope values of the files it touches.
#[derive(Parser)]
#[command(name = "presto", version, disable_version_flag = true, about, long_about = None)]
struct Cli {
    /// Print version information.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: (),

    /// Logging verbosity: DEBUG, INFO, WARNING, ERROR or CRITICAL.
    #[arg(long, default_value = "INFO")]
    log: String,

    /// Number of worker slots; 0 uses the host's CPU count.
    #[arg(long, default_value_t = 0)]
    workers: usize,

    /// Print the commands each node would run instead of running them.
    #[arg(short = 'p', long)]
    print: bool,

    /// Re-run scope values that already succeeded.
    #[arg(short = 'f', long)]
    force: bool,

    /// Start execution from this node instead of the root.
    #[arg(short = 'n', long)]
    node: Option<String>,

    /// Replace a declared scope's expression: NAME:REGEXP. May repeat.
    #[arg(short = 's', long = "override_scope")]
    override_scope: Vec<String>,

    /// Print a summary of each node's persisted status instead of running.
    #[arg(short = 'r', long)]
    report: bool,

    /// Path to the runbook YAML file.
    pipe_yaml: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let runbook_dir = cli
        .pipe_yaml
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let presto_dir = runbook_dir.join(".presto");
    if let Err(err) = ensure_presto_dir(&presto_dir) {
        eprintln!("{err:#}");
        std::process::exit(-1);
    }

    let (level, critical) = parse_log_level(&cli.log);
    let _guard = setup_logging(&presto_dir, level);
    if critical {
        error!(critical = true, "--log CRITICAL has no tracing equivalent; logging at ERROR");
    }

    let scope_overrides = match parse_scope_overrides(&cli.override_scope) {
        Ok(map) => map,
        Err(bad) => {
            error!(critical = true, "malformed scope to override: '{bad}'. Have to be: SCOPE_NAME:regexp");
            std::process::exit(-1);
        }
    };

    let runtime = tokio::runtime::Runtime::new().expect("failed to start async runtime");
    let exit_code = runtime.block_on(run(cli, presto_dir, scope_overrides));
    std::process::exit(exit_code);
}

async fn run(cli: Cli, presto_dir: PathBuf, scope_overrides: HashMap<String, String>) -> i32 {
    if cli.report {
        return match commands::report::report(&cli.pipe_yaml, &scope_overrides, &presto_dir) {
            Ok(()) => 0,
            Err(err) => {
                error!(critical = true, %err, "could not build report");
                -1
            }
        };
    }

    let pipeline = match presto_runbook::load_pipeline(&cli.pipe_yaml, &scope_overrides) {
        Ok(pipeline) => pipeline,
        Err(CoreError::MalformedDataModel(msg)) if msg.contains("empty") => {
            error!(critical = true, "empty <pipe.yaml> file.");
            return 1;
        }
        Err(CoreError::CyclicPipeline(cycles)) => {
            error!(critical = true, ?cycles, "Pipeline can't be cyclic");
            return -1;
        }
        Err(err) => {
            error!(critical = true, %err, "could not build pipeline");
            return -1;
        }
    };

    let workers = if cli.workers == 0 {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    } else {
        cli.workers
    };

    commands::run::run(pipeline, presto_dir, workers, cli.print, cli.force, cli.node.as_deref()).await
}

/// `CRITICAL` has no `tracing` equivalent; it logs at `ERROR` with an
/// extra field rather than inventing a fifth level.
fn parse_log_level(raw: &str) -> (tracing::Level, bool) {
    match raw.to_ascii_uppercase().as_str() {
        "DEBUG" => (tracing::Level::DEBUG, false),
        "WARNING" | "WARN" => (tracing::Level::WARN, false),
        "ERROR" => (tracing::Level::ERROR, false),
        "CRITICAL" => (tracing::Level::ERROR, true),
        _ => (tracing::Level::INFO, false),
    }
}

fn ensure_presto_dir(presto_dir: &std::path::Path) -> anyhow::Result<()> {
    use anyhow::Context;
    std::fs::create_dir_all(presto_dir).with_context(|| format!("could not create {}", presto_dir.display()))
}

fn parse_scope_overrides(raw: &[String]) -> Result<HashMap<String, String>, String> {
    let mut overrides = HashMap::new();
    for entry in raw {
        match entry.split_once(':') {
            Some((name, regexp)) => {
                overrides.insert(name.to_string(), regexp.to_string());
            }
            None => return Err(entry.clone()),
        }
    }
    Ok(overrides)
}

fn setup_logging(presto_dir: &std::path::Path, level: tracing::Level) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(presto_dir, "presto.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    guard
}
