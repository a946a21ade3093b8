//! CLI integration tests.
//!
//! Tests cover:
//! - Signals pipeline with MockDataPort and an in-memory config
//! - Replay pipeline: holdback, per-timestamp ingestion
//! - Commands end to end with INI and CSV files on disk
//! - Exit codes for configuration and data errors

mod common;

use clap::Parser;
use common::*;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use stockframe::adapters::file_config_adapter::FileConfigAdapter;
use stockframe::cli::{self, Cli};
use stockframe::domain::error::StockframeError;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn exit_code_str(code: ExitCode) -> String {
    format!("{:?}", code)
}

const RSI_INI: &str = r#"
[data]
path = unused
symbols = aapl, msft

[strategy]
name = RSI Extremes

[indicator.rsi]
formula = rsi
period = 14

[threshold.rsi]
buy = 30
buy_operator = <=
sell = 70
sell_operator = >=

[ticker.msft.rsi]
buy = 30
buy_operator = le
sell = 70
sell_operator = ge
buy_cash_quantity = 1000
"#;

fn rsi_port() -> MockDataPort {
    MockDataPort::new()
        .with_bars("AAPL", generate_bars("AAPL", 20, 100.0, 1.0))
        .with_bars("MSFT", generate_bars("MSFT", 20, 200.0, -1.0))
}

mod signals_pipeline {
    use super::*;

    #[test]
    fn rsi_strategy_from_config() {
        let config = FileConfigAdapter::from_string(RSI_INI).unwrap();
        let evaluation = cli::run_signals_pipeline(&config, &rsi_port()).unwrap();

        assert_eq!(
            evaluation.decisions.buys.iter().collect::<Vec<_>>(),
            vec!["MSFT"]
        );
        assert_eq!(
            evaluation.decisions.sells.iter().collect::<Vec<_>>(),
            vec!["AAPL"]
        );
        assert_eq!(evaluation.ticker_decisions.buys.get("MSFT"), Some(&1000.0));
        assert!(evaluation.ticker_decisions.sells.is_empty());
    }

    #[test]
    fn symbols_default_to_data_source_listing() {
        let config = FileConfigAdapter::from_string(
            "[data]\npath = unused\n[indicator.change]\nformula = change_in_price\n\
             [threshold.change]\nbuy = 0\nbuy_operator = >\nsell = 0\nsell_operator = <\n",
        )
        .unwrap();
        let evaluation = cli::run_signals_pipeline(&config, &rsi_port()).unwrap();
        assert!(evaluation.decisions.buys.contains("AAPL"));
        assert!(evaluation.decisions.sells.contains("MSFT"));
    }

    #[test]
    fn data_errors_propagate() {
        let config = FileConfigAdapter::from_string(RSI_INI).unwrap();
        let port = rsi_port().with_error("MSFT", "feed unavailable");
        let err = cli::run_signals_pipeline(&config, &port).unwrap_err();
        assert!(matches!(err, StockframeError::Data { .. }));
        assert_eq!(exit_code_str((&err).into()), exit_code_str(ExitCode::from(3)));
    }

    #[test]
    fn dangling_rule_is_rejected() {
        let config = FileConfigAdapter::from_string(
            "[data]\npath = unused\n[comparison.x]\nleft = a\nright = b\n\
             buy_operator = >\nsell_operator = <\n",
        )
        .unwrap();
        let err = cli::run_signals_pipeline(&config, &rsi_port()).unwrap_err();
        assert!(matches!(err, StockframeError::UnknownIndicator { .. }));
    }

    #[test]
    fn ticker_rule_for_unloaded_symbol() {
        let config = FileConfigAdapter::from_string(
            "[data]\npath = unused\nsymbols = AAPL\n[indicator.rsi]\nformula = rsi\nperiod = 3\n\
             [ticker.tsla.rsi]\nbuy = 30\nbuy_operator = <\nsell = 70\nsell_operator = >\n\
             buy_cash_quantity = 10\n",
        )
        .unwrap();
        let err = cli::run_signals_pipeline(&config, &rsi_port()).unwrap_err();
        assert!(matches!(err, StockframeError::UnknownSymbol { symbol } if symbol == "TSLA"));
    }
}

mod replay_pipeline {
    use super::*;

    const CROSS_INI: &str = r#"
[data]
path = unused

[indicator.sma_5]
formula = sma
period = 5

[indicator.sma_20]
formula = sma
period = 20

[comparison.golden_cross]
left = sma_5
right = sma_20
buy_operator = >
sell_operator = <
"#;

    #[test]
    fn crossing_bar_is_the_first_buy() {
        let mut closes = vec![100.0; 24];
        closes.push(150.0);
        let port = MockDataPort::new().with_bars("XYZ", bars_from_closes("XYZ", &closes));
        let config = FileConfigAdapter::from_string(CROSS_INI).unwrap();

        let steps = cli::run_replay_pipeline(&config, &port, 3).unwrap();

        let timestamps: Vec<i64> = steps.iter().map(|(t, _)| *t / DAY_MS).collect();
        assert_eq!(timestamps, vec![22, 23, 24]);
        assert!(steps[0].1.decisions.buys.is_empty());
        assert!(steps[1].1.decisions.buys.is_empty());
        assert!(steps[2].1.decisions.buys.contains("XYZ"));
    }

    #[test]
    fn replay_matches_single_pass_on_last_step() {
        let config = FileConfigAdapter::from_string(RSI_INI).unwrap();
        let port = rsi_port();

        let steps = cli::run_replay_pipeline(&config, &port, 5).unwrap();
        let single = cli::run_signals_pipeline(&config, &port).unwrap();

        assert_eq!(steps.len(), 5);
        assert_eq!(steps.last().map(|(_, e)| e), Some(&single));
    }

    #[test]
    fn ticker_rule_waits_for_late_symbol() {
        let msft: Vec<_> = (17..20)
            .map(|day| make_bar("MSFT", day, 100.0 + day as f64))
            .collect();
        let port = MockDataPort::new()
            .with_bars("AAPL", generate_bars("AAPL", 20, 100.0, 1.0))
            .with_bars("MSFT", msft);
        let config = FileConfigAdapter::from_string(
            "[data]\npath = unused\n[indicator.rsi]\nformula = rsi\nperiod = 3\n\
             [ticker.msft.rsi]\nbuy = 30\nbuy_operator = <=\nsell = 70\nsell_operator = >=\n\
             buy_cash_quantity = 1000\nclose_position_when_sell = true\n",
        )
        .unwrap();

        let steps = cli::run_replay_pipeline(&config, &port, 5).unwrap();

        let days: Vec<i64> = steps.iter().map(|(t, _)| *t / DAY_MS).collect();
        assert_eq!(days, vec![15, 16, 17, 18, 19]);
        for (_, evaluation) in &steps[..3] {
            assert!(evaluation.ticker_decisions.is_empty());
        }
        assert_eq!(steps[4].1.ticker_decisions.sells.get("MSFT"), Some(&true));
    }

    #[test]
    fn holdback_larger_than_history_starts_empty() {
        let port = MockDataPort::new().with_bars("XYZ", bars_from_closes("XYZ", &[1.0, 2.0]));
        let config = FileConfigAdapter::from_string(
            "[data]\npath = unused\n[indicator.change]\nformula = change_in_price\n\
             [threshold.change]\nbuy = 0\nbuy_operator = >\nsell = 0\nsell_operator = <\n",
        )
        .unwrap();

        let steps = cli::run_replay_pipeline(&config, &port, 10).unwrap();
        assert_eq!(steps.len(), 2);
        assert!(steps[0].1.decisions.is_empty());
        assert!(steps[1].1.decisions.buys.contains("XYZ"));
    }
}

mod commands_on_disk {
    use super::*;

    fn write_csv(dir: &Path, symbol: &str, closes: &[f64]) {
        let mut content = String::from("timestamp,open,high,low,close,volume\n");
        for bar in bars_from_closes(symbol, closes) {
            content.push_str(&format!(
                "{},{},{},{},{},{}\n",
                bar.timestamp, bar.open, bar.high, bar.low, bar.close, bar.volume
            ));
        }
        fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
    }

    fn disk_config(dir: &Path) -> tempfile::NamedTempFile {
        write_temp_ini(&RSI_INI.replace("path = unused", &format!("path = {}", dir.display())))
    }

    #[test]
    fn signals_command_succeeds() {
        let dir = tempfile::TempDir::new().unwrap();
        let up: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let down: Vec<f64> = (0..20).map(|i| 200.0 - i as f64).collect();
        write_csv(dir.path(), "AAPL", &up);
        write_csv(dir.path(), "MSFT", &down);
        let ini = disk_config(dir.path());

        let code = cli::run(Cli::parse_from([
            "stockframe",
            "signals",
            "--config",
            ini.path().to_str().unwrap(),
        ]));
        assert_eq!(exit_code_str(code), exit_code_str(ExitCode::SUCCESS));
    }

    #[test]
    fn replay_command_succeeds() {
        let dir = tempfile::TempDir::new().unwrap();
        write_csv(dir.path(), "AAPL", &[10.0, 11.0, 12.0, 13.0]);
        write_csv(dir.path(), "MSFT", &[10.0, 9.0, 8.0, 7.0]);
        let ini = disk_config(dir.path());

        let code = cli::run(Cli::parse_from([
            "stockframe",
            "replay",
            "-c",
            ini.path().to_str().unwrap(),
            "--holdback",
            "2",
        ]));
        assert_eq!(exit_code_str(code), exit_code_str(ExitCode::SUCCESS));
    }

    #[test]
    fn missing_csv_is_a_data_error() {
        let dir = tempfile::TempDir::new().unwrap();
        write_csv(dir.path(), "AAPL", &[10.0, 11.0]);
        let ini = disk_config(dir.path());

        let code = cli::run(Cli::parse_from([
            "stockframe",
            "signals",
            "-c",
            ini.path().to_str().unwrap(),
        ]));
        assert_eq!(exit_code_str(code), exit_code_str(ExitCode::from(3)));
    }

    #[test]
    fn validate_command_accepts_valid_config() {
        let ini = write_temp_ini(RSI_INI);
        let code = cli::run(Cli::parse_from([
            "stockframe",
            "validate",
            "-c",
            ini.path().to_str().unwrap(),
        ]));
        assert_eq!(exit_code_str(code), exit_code_str(ExitCode::SUCCESS));
    }

    #[test]
    fn validate_command_rejects_bad_operator() {
        let ini = write_temp_ini(&RSI_INI.replace("buy_operator = <=", "buy_operator = =<"));
        let code = cli::run(Cli::parse_from([
            "stockframe",
            "validate",
            "-c",
            ini.path().to_str().unwrap(),
        ]));
        assert_eq!(exit_code_str(code), exit_code_str(ExitCode::from(2)));
    }

    #[test]
    fn validate_command_missing_file() {
        let code = cli::run(Cli::parse_from([
            "stockframe",
            "validate",
            "-c",
            "/nonexistent/stockframe.ini",
        ]));
        assert_eq!(exit_code_str(code), exit_code_str(ExitCode::from(2)));
    }

    #[test]
    fn validate_command_unknown_formula() {
        let ini = write_temp_ini(&RSI_INI.replace("formula = rsi", "formula = ichimoku"));
        let code = cli::run(Cli::parse_from([
            "stockframe",
            "validate",
            "-c",
            ini.path().to_str().unwrap(),
        ]));
        assert_eq!(exit_code_str(code), exit_code_str(ExitCode::from(4)));
    }
}
