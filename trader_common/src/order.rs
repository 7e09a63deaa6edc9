//! Order requests handed to a broker adapter.
//!
//! [`Order::new`] validates what a caller passed to `buy`/`sell` and works out which
//! kind of order it is, so each adapter only has to translate an already valid
//! `Order` into its own wire format.
use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::TraderError;
use crate::result::Result;
use crate::stop::StopSpec;

/// Direction of an order.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Side {
    Buy,
    Sell,
}

/// Order type implied by the presence of a limit price and/or a stop.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
    StopLimit,
}

/// A validated order request.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub side: Side,
    pub instrument: String,
    pub quantity: f64,
    pub limit_price: Option<f64>,
    pub stop: Option<StopSpec>,
}

impl Order {
    /// Validate the arguments of a `buy`/`sell` call.
    ///
    /// The instrument must be non-empty, the quantity and the optional limit price
    /// finite and strictly positive. Anything else is [`TraderError::InvalidArgument`].
    pub fn new(
        side: Side,
        instrument: &str,
        quantity: f64,
        limit_price: Option<f64>,
        stop: Option<&StopSpec>,
    ) -> Result<Self> {
        if instrument.is_empty() {
            return Err(TraderError::InvalidArgument(
                "instrument must not be empty".to_string(),
            ));
        }
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(TraderError::InvalidArgument(format!(
                "quantity must be positive, got {}",
                quantity
            )));
        }
        if let Some(limit) = limit_price {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(TraderError::InvalidArgument(format!(
                    "limit price must be positive, got {}",
                    limit
                )));
            }
        }
        Ok(Self {
            side,
            instrument: instrument.to_string(),
            quantity,
            limit_price,
            stop: stop.copied(),
        })
    }

    /// Market, limit, stop or stop-limit.
    pub fn kind(&self) -> OrderKind {
        match (self.limit_price, self.stop) {
            (None, None) => OrderKind::Market,
            (Some(_), None) => OrderKind::Limit,
            (None, Some(_)) => OrderKind::Stop,
            (Some(_), Some(_)) => OrderKind::StopLimit,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.kind(),
            self.side,
            self.quantity,
            self.instrument
        )?;
        if let Some(limit) = self.limit_price {
            write!(f, " limit={}", limit)?;
        }
        if let Some(stop) = &self.stop {
            write!(f, " stop={}", stop)?;
        }
        Ok(())
    }
}
