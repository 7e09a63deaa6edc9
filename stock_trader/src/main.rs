//! Stock Trader — command-line front end for the broker abstraction.
//!
//! The binary wires the `trader_common` contracts to an in-memory `PaperBroker`:
//!
//! - `quote` prints one fresh quote as JSON.
//! - `buy` / `sell` place market, limit, stop or stop-limit orders; `--stop` takes the
//!   stop grammar (`$5`, `-3.25%`, `+2$`).
//! - `stream` polls quotes for a few symbols through the broker's default streaming
//!   behaviour and logs each one until Ctrl+C or `--duration-secs` elapses.
//!
//! Usage example (CLI):
//! ```bash
//! stock_trader buy AAPL 10 --limit 180 --stop -2%
//! stock_trader stream --symbols AAPL,MSFT --interval-secs 30
//! ```
//!
//! Concurrency and shutdown:
//! - Every streamed symbol has its own poller thread; their callbacks forward events
//!   into one crossbeam channel drained by the main thread.
//! - Crossbeam `select!` multiplexes quote events, the Ctrl+C signal and the optional
//!   deadline; on exit each stream is stopped explicitly.
#![warn(missing_docs)]
mod args;
mod paper_broker;

use crate::args::{Action, Args, OrderArgs};
use crate::paper_broker::{PaperBroker, PaperBrokerConfig};
use clap::Parser;
use crossbeam_channel::{Sender, after, never, select, unbounded};
use log::{error, info, warn};
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration;
use trader_common::symbols::read_symbols;
use trader_common::{Broker, QuoteEvent, Result, Side, TraderError};

fn main() -> Result<(), TraderError> {
    init_logger();
    let args = Args::parse();
    let broker = Arc::new(PaperBroker::new(PaperBrokerConfig {
        symbols: args.universe.clone(),
        initial_price: args.initial_price,
        max_order_quantity: args.max_order_quantity,
    }));
    info!("Using {} broker", broker.name());

    match args.command {
        Action::Quote { symbol } => {
            let quote = broker.get_quote(&symbol)?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
        Action::Buy(order) => place_order(broker.as_ref(), Side::Buy, order)?,
        Action::Sell(order) => place_order(broker.as_ref(), Side::Sell, order)?,
        Action::Stream {
            symbols,
            path,
            interval_secs,
            duration_secs,
        } => {
            let mut requested = symbols;
            if let Some(path) = path {
                let file = File::open(&path)?;
                requested.extend(read_symbols(BufReader::new(file))?);
            }
            let mut symbols: Vec<String> = Vec::with_capacity(requested.len());
            for symbol in requested {
                if !symbols.contains(&symbol) {
                    symbols.push(symbol);
                }
            }
            if symbols.is_empty() {
                return Err(TraderError::InvalidArgument(
                    "no symbols to stream, use --symbols or --path".to_string(),
                ));
            }
            stream_quotes(
                &broker,
                &symbols,
                Duration::from_secs(interval_secs),
                duration_secs.map(Duration::from_secs),
            )?;
        }
    }
    Ok(())
}

fn place_order(broker: &dyn Broker, side: Side, order: OrderArgs) -> Result<()> {
    let stop = order.stop.as_ref();
    let accepted = match side {
        Side::Buy => broker.buy(&order.symbol, order.quantity, order.limit, stop)?,
        Side::Sell => broker.sell(&order.symbol, order.quantity, order.limit, stop)?,
    };
    if accepted {
        info!("{} order for {} {} accepted", side, order.quantity, order.symbol);
    } else {
        warn!("{} order for {} {} rejected", side, order.quantity, order.symbol);
    }
    Ok(())
}

/// Stream `symbols` until Ctrl+C or until `duration` elapsed.
fn stream_quotes(
    broker: &Arc<PaperBroker>,
    symbols: &[String],
    interval: Duration,
    duration: Option<Duration>,
) -> Result<()> {
    if symbols.len() > 2 {
        warn!(
            "Streaming {} symbols by polling; brokers may throttle this many requests",
            symbols.len()
        );
    }
    let (shutdown_tx, shutdown_rx) = unbounded::<()>();
    install_shutdown_handler(shutdown_tx)?;

    let (event_tx, event_rx) = unbounded::<QuoteEvent>();
    for symbol in symbols {
        let event_tx = event_tx.clone();
        broker.start_streaming_quotes_every(symbol, interval, move |event| {
            if let Err(e) = event_tx.send(event) {
                error!("Failed to forward quote event: {}", e);
            }
        })?;
    }
    drop(event_tx);

    let deadline = duration.map(after).unwrap_or_else(never);
    loop {
        select! {
            recv(event_rx) -> msg => match msg {
                Ok(QuoteEvent::Quote(quote)) => info!(
                    "QUOTE: {} Bid={:.2} Ask={:.2} Last={:.2} Volume={} Time={}",
                    quote.symbol,
                    quote.bid_price,
                    quote.ask_price,
                    quote.last_price,
                    quote.total_volume,
                    quote.datetime_of_quote
                ),
                Ok(QuoteEvent::Error { instrument, error }) => {
                    warn!("No quote for {} this round: {}", instrument, error)
                }
                Err(_) => break,
            },
            recv(shutdown_rx) -> _ => break,
            recv(deadline) -> _ => {
                info!("Streaming duration elapsed");
                break;
            }
        }
    }

    for symbol in symbols {
        broker.stop_streaming_quotes(symbol)?;
    }
    Ok(())
}

/// Send on `shutdown_tx` when Ctrl+C is pressed.
fn install_shutdown_handler(shutdown_tx: Sender<()>) -> Result<()> {
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down streams...");
        let _ = shutdown_tx.send(());
    })
    .map_err(|e| TraderError::Signal(format!("failed to set Ctrl+C handler: {}", e)))
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_shutdown_handler_is_a_signal_error() {
        let (tx, _rx) = unbounded::<()>();
        let _ = install_shutdown_handler(tx.clone());
        match install_shutdown_handler(tx) {
            Err(TraderError::Signal(msg)) => assert!(msg.contains("Ctrl+C")),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
