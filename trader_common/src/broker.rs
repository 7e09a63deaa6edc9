//! Broker capability implemented by each brokerage adapter.
//!
//! To support a new brokerage implement [`Broker`]: orders and quotes are adapter
//! specific, quote streaming comes for free by polling `get_quote` through the
//! broker's own [`QuoteStreamManager`].
use std::sync::Arc;
use std::time::Duration;

use crate::error::TraderError;
use crate::quote::Quote;
use crate::result::Result;
use crate::stop::StopSpec;
use crate::stream::{DEFAULT_POLL_INTERVAL, QuoteEvent, QuoteStreamManager};

/// Trading API of one brokerage.
pub trait Broker: Send + Sync + 'static {
    /// Brokerage this adapter talks to.
    fn name(&self) -> &str;

    /// Buy `quantity` of `instrument`.
    ///
    /// No `limit_price` means a market order; a `stop` makes it a stop order, or a
    /// stop-limit order together with `limit_price`. Returns `Ok(false)` when the
    /// brokerage rejects the order and [`TraderError::InvalidArgument`] for malformed
    /// input such as a non-positive quantity.
    fn buy(
        &self,
        instrument: &str,
        quantity: f64,
        limit_price: Option<f64>,
        stop: Option<&StopSpec>,
    ) -> Result<bool>;

    /// Sell `quantity` of `instrument`. Same contract as [`Broker::buy`].
    fn sell(
        &self,
        instrument: &str,
        quantity: f64,
        limit_price: Option<f64>,
        stop: Option<&StopSpec>,
    ) -> Result<bool>;

    /// Fetch a fresh quote from the brokerage, never a cached one.
    ///
    /// Fails with [`TraderError::UnknownInstrument`] when the brokerage does not know
    /// `instrument`.
    fn get_quote(&self, instrument: &str) -> Result<Quote>;

    /// Stream registry owned by this broker instance.
    fn quote_streams(&self) -> &QuoteStreamManager;

    /// Poll quotes for `instrument` every [`DEFAULT_POLL_INTERVAL`].
    fn start_streaming_quotes<F>(self: &Arc<Self>, instrument: &str, on_event: F) -> Result<bool>
    where
        Self: Sized,
        F: FnMut(QuoteEvent) + Send + 'static,
    {
        self.start_streaming_quotes_every(instrument, DEFAULT_POLL_INTERVAL, on_event)
    }

    /// Poll quotes for `instrument` every `interval`.
    ///
    /// The poller holds the broker weakly: if the broker is dropped while streaming,
    /// its manager stops the pollers.
    fn start_streaming_quotes_every<F>(
        self: &Arc<Self>,
        instrument: &str,
        interval: Duration,
        on_event: F,
    ) -> Result<bool>
    where
        Self: Sized,
        F: FnMut(QuoteEvent) + Send + 'static,
    {
        let broker = Arc::downgrade(self);
        self.quote_streams().start(
            instrument,
            interval,
            move |symbol| match broker.upgrade() {
                Some(broker) => broker.get_quote(symbol),
                None => Err(TraderError::BrokerGone),
            },
            on_event,
        )
    }

    /// Stop the quote stream for `instrument`; no event is delivered after this returns.
    fn stop_streaming_quotes(&self, instrument: &str) -> Result<bool> {
        self.quote_streams().stop(instrument)
    }
}
