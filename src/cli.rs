//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{read_data_config, validate_config, DataConfig};
use crate::domain::error::StockframeError;
use crate::domain::ohlcv::Bar;
use crate::domain::session::{Evaluation, Session};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "stockframe", about = "Indicator and signal engine for OHLCV bars")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load bars, compute indicators and print the current signals
    Signals {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Replay the last bars of each symbol one timestamp at a time
    Replay {
        #[arg(short, long)]
        config: PathBuf,
        /// Bars per symbol held back from the initial history
        #[arg(long, default_value_t = 1)]
        holdback: usize,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Install a stderr `fmt` subscriber filtered by `RUST_LOG` (default INFO).
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .init()
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Signals { config } => run_signals(&config),
        Command::Replay { config, holdback } => run_replay(&config, holdback),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_signals(config_path: &Path) -> Result<(), StockframeError> {
    info!(config = %config_path.display(), "loading config");
    let config = FileConfigAdapter::from_file(config_path)?;
    let data = read_data_config(&config)?;
    let evaluation = run_signals_pipeline(&config, &CsvAdapter::new(data.path))?;
    for line in format_evaluation(&evaluation) {
        println!("{line}");
    }
    Ok(())
}

fn run_replay(config_path: &Path, holdback: usize) -> Result<(), StockframeError> {
    info!(config = %config_path.display(), holdback, "loading config");
    let config = FileConfigAdapter::from_file(config_path)?;
    let data = read_data_config(&config)?;
    let steps = run_replay_pipeline(&config, &CsvAdapter::new(data.path), holdback)?;
    for (timestamp, evaluation) in &steps {
        for line in format_evaluation(evaluation) {
            println!("{timestamp} {line}");
        }
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), StockframeError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = FileConfigAdapter::from_file(config_path)?;
    let strategy = validate_config(&config)?;

    eprintln!("\nStrategy: {}", strategy.name);
    eprintln!("\nIndicators:");
    for definition in &strategy.indicators {
        eprintln!("  {}: {}", definition.name, definition.formula);
    }
    eprintln!("\nRules:");
    for rule in &strategy.rules {
        eprintln!("  {}", rule.key());
    }
    for rule in &strategy.ticker_rules {
        eprintln!("  {} {}", rule.ticker, rule.condition.key());
    }
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

/// Load history, install the strategy, refresh and evaluate once.
pub fn run_signals_pipeline(
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
) -> Result<Evaluation, StockframeError> {
    let data = read_data_config(config)?;
    let bars = load_bars(&data, data_port)?;
    let mut session = build_session(config, bars)?;
    session.refresh();
    session.evaluate()
}

/// Hold back the last `holdback` bars of every symbol, then feed them in
/// timestamp order through [`Session::ingest`]. Returns one evaluation per
/// distinct timestamp.
pub fn run_replay_pipeline(
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
    holdback: usize,
) -> Result<Vec<(i64, Evaluation)>, StockframeError> {
    let data = read_data_config(config)?;
    let bars = load_bars(&data, data_port)?;
    let (history, pending) = split_holdback(bars, holdback);
    let mut session = build_session(config, history)?;
    session.await_symbols(pending.values().flatten().map(|bar| bar.symbol.clone()));
    session.refresh();

    let mut steps = Vec::with_capacity(pending.len());
    for (timestamp, batch) in pending {
        steps.push((timestamp, session.ingest(batch)?));
    }
    Ok(steps)
}

pub fn load_bars(data: &DataConfig, data_port: &dyn DataPort) -> Result<Vec<Bar>, StockframeError> {
    let symbols = match &data.symbols {
        Some(symbols) => symbols.clone(),
        None => data_port.list_symbols()?,
    };
    let mut bars = Vec::new();
    for symbol in &symbols {
        bars.extend(data_port.fetch_bars(symbol)?);
    }
    info!(symbols = symbols.len(), bars = bars.len(), "loaded bars");
    Ok(bars)
}

fn build_session(config: &dyn ConfigPort, history: Vec<Bar>) -> Result<Session, StockframeError> {
    let strategy = validate_config(config)?;
    let mut session = Session::new(history)?;
    let (engine, evaluator) = session.parts_mut();
    strategy.install(engine, evaluator)?;
    Ok(session)
}

/// Split into the initial history and the held-back bars grouped by
/// timestamp.
pub fn split_holdback(bars: Vec<Bar>, holdback: usize) -> (Vec<Bar>, BTreeMap<i64, Vec<Bar>>) {
    let mut by_symbol: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
    for bar in bars {
        by_symbol.entry(bar.symbol.clone()).or_default().push(bar);
    }

    let mut history = Vec::new();
    let mut pending: BTreeMap<i64, Vec<Bar>> = BTreeMap::new();
    for mut series in by_symbol.into_values() {
        series.sort_by_key(|b| b.timestamp);
        let tail = series.split_off(series.len().saturating_sub(holdback));
        history.extend(series);
        for bar in tail {
            pending.entry(bar.timestamp).or_default().push(bar);
        }
    }
    (history, pending)
}

pub fn format_evaluation(evaluation: &Evaluation) -> Vec<String> {
    let mut lines = Vec::new();
    for symbol in &evaluation.decisions.buys {
        lines.push(format!("buy {symbol}"));
    }
    for symbol in &evaluation.decisions.sells {
        lines.push(format!("sell {symbol}"));
    }
    for (ticker, cash) in &evaluation.ticker_decisions.buys {
        lines.push(format!("buy {ticker} cash={cash}"));
    }
    for (ticker, close) in &evaluation.ticker_decisions.sells {
        lines.push(format!("sell {ticker} close_position={close}"));
    }
    lines
}
