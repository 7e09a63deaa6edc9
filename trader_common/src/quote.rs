//! Quote data model and JSON encoding helpers.
//!
//! A `Quote` is a point-in-time snapshot of market data for one instrument. Brokers
//! build a fresh one on every `get_quote` call; nothing mutates it afterwards.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result::Result;

/// Open/high/low/close of the current session.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CandlestickData {
    pub open_price: f64,
    pub close_price: f64,
    pub high_price: f64,
    pub low_price: f64,
}

/// Rolling highs and lows over the usual windows.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HighsAndLows {
    pub high_today: f64,
    pub high_last_7_days: f64,
    pub high_last_30_days: f64,
    pub high_last_365_days: f64,
    pub high_all_time: f64,
    pub low_today: f64,
    pub low_last_7_days: f64,
    pub low_last_30_days: f64,
    pub low_last_365_days: f64,
    pub low_all_time: f64,
}

/// Market quote for a single instrument.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Numeric security identifier, when the broker provides one.
    pub cusip: Option<u64>,
    /// Symbol identifier (e.g. `AAPL`).
    pub symbol: String,
    pub description: String,
    /// When the broker produced the quote.
    pub datetime_of_quote: DateTime<Utc>,
    pub exchange_name: String,
    /// Whether the data is delayed rather than real-time.
    pub delayed: bool,
    pub ask_price: f64,
    pub ask_size: u64,
    pub bid_price: f64,
    pub bid_size: u64,
    pub candlestick_data: CandlestickData,
    pub highs_and_lows: HighsAndLows,
    pub mark: f64,
    pub last_price: f64,
    pub last_size: u64,
    pub regular_market_last_price: f64,
    pub regular_market_last_size: u64,
    pub total_volume: u64,
    pub volatility: f64,
    pub dividend_amount: f64,
    pub dividend_date: Option<DateTime<Utc>>,
    pub dividend_yield: f64,
    pub pe_ratio: f64,
}

impl Quote {
    /// Empty quote for `symbol` stamped with the current time. Adapters fill in the
    /// fields they get from upstream.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            datetime_of_quote: Utc::now(),
            ..Self::default()
        }
    }

    /// Ask minus bid.
    pub fn spread(&self) -> f64 {
        self.ask_price - self.bid_price
    }

    /// Midpoint between bid and ask.
    pub fn mid(&self) -> f64 {
        (self.ask_price + self.bid_price) / 2.0
    }

    /// Encode the quote to JSON bytes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(self)?;
        Ok(json)
    }
}
