use anyhow::Context;
use clap::Parser;
use matchx::{EngineConfig, Operation, Orchestrator};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, info_span, Level};
use tracing_subscriber::FmtSubscriber;

/// Replay a log of operations against a fresh matching engine
#[derive(Parser, Debug)]
#[command(name = "matchx")]
#[command(about = "An embedding-based entity matching engine", long_about = None)]
struct Args {
    /// Engine configuration (JSON). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON array of operations, e.g. [{"type": "ADD", "info": [...]}]
    #[arg(short, long)]
    operations: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // results go to stdout, logs stay on stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting matchx v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading config {:?}", path))?,
        None => EngineConfig::default(),
    };

    let raw = std::fs::read_to_string(&args.operations)
        .with_context(|| format!("reading operations {:?}", args.operations))?;
    let operations: Vec<Operation> =
        serde_json::from_str(&raw).context("parsing operations")?;
    info!("Loaded {} operations from {:?}", operations.len(), args.operations);

    let engine = Orchestrator::builder_from_config(&config)?
        .span(info_span!("engine", source = %args.operations.display()))
        .build();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut mutations = 0usize;
    for (i, operation) in operations.into_iter().enumerate() {
        let kind = operation.kind();
        if kind.is_mutating() {
            mutations += 1;
        }
        let output = engine
            .on_operation(operation)
            .with_context(|| format!("operation #{} ({}) failed", i, kind))?;
        serde_json::to_writer(&mut out, &output)?;
        writeln!(out)?;
    }

    info!(
        "Replay finished: {} mutations applied, {} entities stored",
        mutations,
        engine.len()
    );
    Ok(())
}
