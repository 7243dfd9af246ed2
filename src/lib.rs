#![allow(clippy::const_is_empty)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_else_if)]

// Core modules
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod models;
pub mod utils;

// The engine
pub mod engine;

use std::path::PathBuf;

// Re-export commonly used types
pub use config::{Mode, StrategyConfig};
pub use domain::{Candle, CandleSeries, Timeframe};
pub use engine::{CooldownGate, SignalEngine, SignalRequest, SignalResponse};
pub use error::SignalError;
pub use models::{Direction, ReasonCode, SignalLabel, TradePlan};

// CLI argument parsing
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Request JSON file. Omit or pass `-` to read stdin
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Strategy preset
    #[arg(long, short, default_value_t = Mode::Swing)]
    pub mode: Mode,

    /// JSON file overriding parts of the preset
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Overrides the request's symbol
    #[arg(long)]
    pub symbol: Option<String>,

    /// Pretty-print the response
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

impl Cli {
    pub fn reads_stdin(&self) -> bool {
        match &self.input {
            None => true,
            Some(path) => path.as_os_str() == "-",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["zone-signal"]);
        assert_eq!(cli.mode, Mode::Swing);
        assert!(cli.reads_stdin());
        assert!(!cli.pretty);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "zone-signal",
            "--input",
            "req.json",
            "--mode",
            "SCALP",
            "--symbol",
            "ethusdt",
            "--pretty",
        ]);
        assert_eq!(cli.mode, Mode::Scalp);
        assert!(!cli.reads_stdin());
        assert_eq!(cli.symbol.as_deref(), Some("ethusdt"));
        assert!(cli.pretty);

        let dash = Cli::parse_from(["zone-signal", "-i", "-"]);
        assert!(dash.reads_stdin());
    }
}
