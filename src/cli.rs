//! Command-line interface.

use crate::app::AppOptions;
use crate::export::ExportFormat;
use crate::models::Direction;
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Price alerts and portfolio valuation for stocks and crypto.
///
/// Alerts, holdings and the watchlist are stored as JSON files in the data
/// directory. `tickerwatch monitor` polls quotes in the background and
/// prints a notification every time an active alert's condition holds.
#[derive(Parser, Debug, Clone)]
#[command(name = "tickerwatch")]
#[command(version)]
#[command(about = "Price alerts and portfolio valuation from the terminal", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file path
    #[arg(short = 'c', long, global = true, env = "TICKERWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding alerts.json, portfolio.json and watchlist.json
    #[arg(long, global = true, env = "TICKERWATCH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Keep everything in memory; nothing is written to disk
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// API timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Ring the terminal bell when an alert fires
    #[arg(long, global = true)]
    pub bell: bool,

    /// Verbose output - debug logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Manage price alerts
    #[command(subcommand)]
    Alert(AlertCommand),

    /// Manage portfolio holdings
    #[command(subcommand)]
    Portfolio(PortfolioCommand),

    /// Manage the watchlist
    #[command(subcommand)]
    Watch(WatchCommand),

    /// Poll quotes, fire alerts and print a live ticker until interrupted
    Monitor {
        /// Stop after N ticker refreshes (0 means run until Ctrl-C)
        #[arg(short = 'n', long, default_value = "0")]
        iterations: u64,
    },

    /// Write a sample configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum AlertCommand {
    /// Create an alert, e.g. `alert add AAPL above 200`
    Add {
        symbol: String,
        #[arg(value_enum)]
        direction: DirectionArg,
        price: f64,
    },
    /// List all alerts
    List,
    /// Pause or resume an alert
    Toggle { id: String },
    /// Delete an alert
    Remove { id: String },
    /// Evaluate active alerts once, now
    Check,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PortfolioCommand {
    /// Add shares; an existing holding is merged at average cost
    Add(AddHoldingArgs),
    /// Remove every share of a symbol
    Remove { symbol: String },
    /// List holdings without fetching quotes
    List,
    /// Value the portfolio against live quotes
    Value {
        /// Export format instead of the table
        #[arg(long, value_enum)]
        export: Option<ExportArg>,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AddHoldingArgs {
    pub symbol: String,
    pub shares: f64,
    /// Price paid per share
    pub price: f64,
    /// Purchase date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum WatchCommand {
    /// Track a symbol
    Add {
        symbol: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Stop tracking a symbol
    Remove { symbol: String },
    /// Replace (or clear, when omitted) the notes on a symbol
    Note { symbol: String, notes: Option<String> },
    /// List tracked symbols
    List,
}

/// Alert direction.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    /// Fire when the price is at or above the target
    Above,
    /// Fire when the price is at or below the target
    Below,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Above => Direction::Above,
            DirectionArg::Below => Direction::Below,
        }
    }
}

/// Export format for valuations.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportArg {
    /// Plain text format
    Text,
    /// Comma-separated values (CSV)
    Csv,
    /// JavaScript Object Notation (JSON)
    Json,
}

impl From<ExportArg> for ExportFormat {
    fn from(arg: ExportArg) -> Self {
        match arg {
            ExportArg::Text => ExportFormat::Text,
            ExportArg::Csv => ExportFormat::Csv,
            ExportArg::Json => ExportFormat::Json,
        }
    }
}

impl Args {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Args::parse()
    }

    pub fn app_options(&self) -> AppOptions {
        AppOptions {
            data_dir: self.data_dir.clone(),
            ephemeral: self.ephemeral,
            timeout: self.timeout,
            bell: self.bell,
        }
    }
}
