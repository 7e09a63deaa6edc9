//! Command-line arguments for the stock trader.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::{Parser, Subcommand};
use trader_common::symbols::normalize_symbol;
use trader_common::{StopSpec, TraderError};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "stock_trader", version, about, long_about = None)]
pub struct Args {
    /// Symbols known to the paper broker, comma separated.
    #[clap(
        long,
        value_delimiter = ',',
        default_value = "AAPL,MSFT,GOOGL,AMZN,TSLA",
        value_parser = parse_symbol
    )]
    pub universe: Vec<String>,

    /// Starting price of every symbol in the paper broker.
    #[clap(long, default_value_t = 100.0)]
    pub initial_price: f64,

    /// Orders above this quantity are rejected by the paper broker.
    #[clap(long, default_value_t = 10_000.0)]
    pub max_order_quantity: f64,

    /// What to do.
    #[command(subcommand)]
    pub command: Action,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Action {
    /// Print a fresh quote as JSON.
    Quote {
        /// Instrument symbol.
        #[clap(value_parser = parse_symbol)]
        symbol: String,
    },
    /// Place a buy order.
    Buy(OrderArgs),
    /// Place a sell order.
    Sell(OrderArgs),
    /// Poll quotes for a few symbols and log them until Ctrl+C.
    Stream {
        /// Symbols to stream, comma separated.
        #[clap(long, value_delimiter = ',', value_parser = parse_symbol)]
        symbols: Vec<String>,

        /// Path to a text file with more symbols.
        /// Symbols may be separated by commas, spaces, or new lines.
        #[clap(long)]
        path: Option<String>,

        /// Seconds between two polls of the same symbol.
        #[clap(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: u64,

        /// Stop after this many seconds instead of waiting for Ctrl+C.
        #[clap(long)]
        duration_secs: Option<u64>,
    },
}

/// Arguments shared by `buy` and `sell`.
#[derive(Debug, clap::Args)]
pub struct OrderArgs {
    /// Instrument symbol.
    #[clap(value_parser = parse_symbol)]
    pub symbol: String,

    /// Number of shares.
    pub quantity: f64,

    /// Limit price; market order when omitted.
    #[clap(long)]
    pub limit: Option<f64>,

    /// Stop trigger such as `$5`, `-3.25%` or `+2$`.
    #[clap(long, allow_hyphen_values = true, value_parser = parse_stop)]
    pub stop: Option<StopSpec>,
}

/// Same rules as symbols read from a `--path` file.
fn parse_symbol(raw: &str) -> Result<String, TraderError> {
    normalize_symbol(raw)
}

fn parse_stop(raw: &str) -> Result<StopSpec, TraderError> {
    StopSpec::parse(raw)
}
