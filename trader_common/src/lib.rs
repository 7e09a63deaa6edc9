//!
//! Broker abstraction shared by every brokerage adapter and the `stock_trader` CLI.
//!
//! This crate aggregates:
//! - `error` — unified error type `TraderError` used across the workspace.
//! - `result` — handy `Result<T, TraderError>` alias.
//! - `stop` — `StopSpec` and the stop string grammar.
//! - `quote` — the `Quote` snapshot returned by brokers.
//! - `order` — validated order requests and their kind.
//! - `broker` — the `Broker` trait adapters implement.
//! - `stream` — polling quote streams, one poller per instrument.
//! - `poller` — cancellable periodic task backing the streams.
//! - `symbols` — reading symbol lists.
#![warn(missing_docs)]
pub mod broker;
pub mod error;
pub mod order;
pub mod poller;
pub mod quote;
pub mod result;
pub mod stop;
pub mod stream;
pub mod symbols;

pub use broker::Broker;
pub use error::{SyntaxIssue, TraderError};
pub use order::{Order, OrderKind, Side};
pub use quote::Quote;
pub use result::Result;
pub use stop::{StopKind, StopSpec};
pub use stream::{DEFAULT_POLL_INTERVAL, QuoteEvent, QuoteStreamManager};
