//! In-memory paper trading broker.
//!
//! `PaperBroker` implements [`Broker`] without any brokerage behind it: it knows a
//! fixed universe of symbols, moves each price with a small random walk on every
//! `get_quote` call and records the orders it accepts.
//!
//! Design notes:
//! - Every `get_quote` advances the walk, so two calls never return the same snapshot.
//! - Orders for unknown symbols or above `max_order_quantity` are rejected with
//!   `Ok(false)`, the way a real brokerage refuses an order.
//! - Session open/high/low and volume are tracked per symbol so quotes carry
//!   consistent candlestick data.

use chrono::Utc;
use log::{info, warn};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Mutex;

use trader_common::quote::{CandlestickData, HighsAndLows};
use trader_common::{
    Broker, Order, Quote, QuoteStreamManager, Result, Side, StopSpec, TraderError,
};

/// Settings for a paper broker.
#[derive(Debug, Clone)]
pub struct PaperBrokerConfig {
    /// Symbols the broker will quote and trade.
    pub symbols: Vec<String>,
    /// Starting price of every symbol.
    pub initial_price: f64,
    /// Orders above this quantity are rejected.
    pub max_order_quantity: f64,
}

impl Default for PaperBrokerConfig {
    fn default() -> Self {
        Self {
            symbols: ["AAPL", "MSFT", "GOOGL", "AMZN", "TSLA"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            initial_price: 100.0,
            max_order_quantity: 10_000.0,
        }
    }
}

/// Session state of one symbol.
struct Session {
    open: f64,
    last: f64,
    high: f64,
    low: f64,
    volume: u64,
}

impl Session {
    fn new(price: f64) -> Self {
        Self {
            open: price,
            last: price,
            high: price,
            low: price,
            volume: 0,
        }
    }
}

/// Paper trading adapter.
pub struct PaperBroker {
    sessions: Mutex<HashMap<String, Session>>,
    orders: Mutex<Vec<Order>>,
    max_order_quantity: f64,
    streams: QuoteStreamManager,
}

impl PaperBroker {
    /// Create a broker from `config`.
    pub fn new(config: PaperBrokerConfig) -> Self {
        let sessions = config
            .symbols
            .iter()
            .map(|s| (s.clone(), Session::new(config.initial_price)))
            .collect();
        Self {
            sessions: Mutex::new(sessions),
            orders: Mutex::new(Vec::new()),
            max_order_quantity: config.max_order_quantity,
            streams: QuoteStreamManager::new(),
        }
    }

    /// Orders accepted so far.
    pub fn orders(&self) -> Result<Vec<Order>> {
        Ok(self.orders.lock()?.clone())
    }

    /// Next price of a random walk around `current_price`, within +/-1%.
    fn next_price(current_price: f64) -> f64 {
        let mut rng = rand::rng();
        let change: f64 = rng.random_range(-0.01..0.01);
        let new_price = current_price * (1.0 + change);
        new_price.max(0.01)
    }

    fn place(&self, order: Order) -> Result<bool> {
        if !self.sessions.lock()?.contains_key(&order.instrument) {
            warn!("Rejected {}: unknown instrument", order);
            return Ok(false);
        }
        if order.quantity > self.max_order_quantity {
            warn!(
                "Rejected {}: quantity above limit {}",
                order, self.max_order_quantity
            );
            return Ok(false);
        }
        info!("Accepted {}", order);
        self.orders.lock()?.push(order);
        Ok(true)
    }
}

impl Broker for PaperBroker {
    fn name(&self) -> &str {
        "paper"
    }

    fn buy(
        &self,
        instrument: &str,
        quantity: f64,
        limit_price: Option<f64>,
        stop: Option<&StopSpec>,
    ) -> Result<bool> {
        self.place(Order::new(Side::Buy, instrument, quantity, limit_price, stop)?)
    }

    fn sell(
        &self,
        instrument: &str,
        quantity: f64,
        limit_price: Option<f64>,
        stop: Option<&StopSpec>,
    ) -> Result<bool> {
        self.place(Order::new(Side::Sell, instrument, quantity, limit_price, stop)?)
    }

    fn get_quote(&self, instrument: &str) -> Result<Quote> {
        let mut sessions = self.sessions.lock()?;
        let session = sessions
            .get_mut(instrument)
            .ok_or_else(|| TraderError::UnknownInstrument(instrument.to_string()))?;

        let mut rng = rand::rng();
        let last = Self::next_price(session.last);
        let last_size = 100 + rng.random_range(0..1000u64);
        let half_spread = (last * 0.0005).max(0.01);
        session.last = last;
        session.high = session.high.max(last);
        session.low = session.low.min(last);
        session.volume += last_size;

        Ok(Quote {
            description: format!("{} (paper)", instrument),
            datetime_of_quote: Utc::now(),
            exchange_name: "PAPER".to_string(),
            bid_price: last - half_spread,
            bid_size: 100 * rng.random_range(1..10u64),
            ask_price: last + half_spread,
            ask_size: 100 * rng.random_range(1..10u64),
            candlestick_data: CandlestickData {
                open_price: session.open,
                close_price: last,
                high_price: session.high,
                low_price: session.low,
            },
            highs_and_lows: HighsAndLows {
                high_today: session.high,
                low_today: session.low,
                ..HighsAndLows::default()
            },
            mark: last,
            last_price: last,
            last_size,
            regular_market_last_price: last,
            regular_market_last_size: last_size,
            total_volume: session.volume,
            ..Quote::new(instrument)
        })
    }

    fn quote_streams(&self) -> &QuoteStreamManager {
        &self.streams
    }
}
