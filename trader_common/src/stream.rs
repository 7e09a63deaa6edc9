//! Polling quote streams, one background poller per instrument.
//!
//! `QuoteStreamManager` approximates a live feed for brokers without a push API by
//! fetching a quote on a fixed interval and handing every result to a callback as a
//! [`QuoteEvent`]. Each instrument is an independent `Idle -> Running -> Idle`
//! state machine:
//!
//! - `start` on a running instrument fails with `AlreadyStreaming` and leaves the
//!   existing poller alone.
//! - `stop` on an idle instrument fails with `NotStreaming`.
//! - `stop` returns only after the poller thread has exited, so the callback is never
//!   invoked after it returns. Until then the instrument stays registered and a new
//!   `start` for it fails with `AlreadyStreaming`.
//! - A fetch that errors or panics is reported as `QuoteEvent::Error`; the stream keeps
//!   polling.
//!
//! Most brokers throttle or ban clients that request quotes too often, hence the
//! 30 second default interval. This is meant for a handful of instruments; use the
//! broker's own streaming API when there is one.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::TraderError;
use crate::poller::{Poller, panic_message};
use crate::quote::Quote;
use crate::result::Result;

/// Interval used by `Broker::start_streaming_quotes`.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Prefix of poller thread names; the symbol is appended.
pub const POLLER_THREAD_PREFIX: &str = "quotes-";

/// Message delivered to a stream callback on every tick.
#[derive(Debug)]
pub enum QuoteEvent {
    /// Fresh quote for the streamed instrument.
    Quote(Quote),
    /// The fetch failed on this tick; polling continues on the next one.
    Error {
        /// Instrument being streamed.
        instrument: String,
        /// What the fetch returned.
        error: TraderError,
    },
}

/// Registry entry for one instrument.
enum Stream {
    Running(Poller),
    /// `stop` is waiting for the poller thread; the instrument is not free yet.
    Stopping,
}

impl Stream {
    /// Mark the entry as stopping and hand out its poller, if it was running.
    fn begin_stop(&mut self) -> Option<Poller> {
        match std::mem::replace(self, Stream::Stopping) {
            Stream::Running(poller) => Some(poller),
            Stream::Stopping => None,
        }
    }
}

/// Registry of running quote pollers keyed by instrument symbol.
#[derive(Default)]
pub struct QuoteStreamManager {
    streams: Mutex<HashMap<String, Stream>>,
}

impl QuoteStreamManager {
    /// Create a manager with no running streams.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start polling `instrument` every `interval`.
    ///
    /// `fetch` is called on the poller thread with the instrument symbol; its result is
    /// wrapped in a [`QuoteEvent`] and passed to `on_event`. A panicking `fetch` is
    /// reported as [`TraderError::Upstream`]. The first fetch happens right away on the
    /// background thread; this call does not wait for it.
    ///
    /// Fails with [`TraderError::AlreadyStreaming`] while a previous stream for
    /// `instrument` is running or still being stopped.
    pub fn start<Fetch, Sink>(
        &self,
        instrument: &str,
        interval: Duration,
        fetch: Fetch,
        mut on_event: Sink,
    ) -> Result<bool>
    where
        Fetch: Fn(&str) -> Result<Quote> + Send + 'static,
        Sink: FnMut(QuoteEvent) + Send + 'static,
    {
        if instrument.is_empty() {
            return Err(TraderError::InvalidArgument(
                "instrument must not be empty".to_string(),
            ));
        }
        if interval.is_zero() {
            return Err(TraderError::InvalidArgument(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        let mut streams = self.streams.lock()?;
        if streams.contains_key(instrument) {
            return Err(TraderError::AlreadyStreaming(instrument.to_string()));
        }

        let symbol = instrument.to_string();
        let poller = Poller::spawn(
            format!("{}{}", POLLER_THREAD_PREFIX, instrument),
            interval,
            move || {
                let fetched = panic::catch_unwind(AssertUnwindSafe(|| fetch(&symbol)))
                    .unwrap_or_else(|payload| {
                        Err(TraderError::Upstream(format!(
                            "get_quote panicked: {}",
                            panic_message(payload.as_ref())
                        )))
                    });
                match fetched {
                    Ok(quote) => {
                        debug!("Polled quote for {}: last={}", symbol, quote.last_price);
                        on_event(QuoteEvent::Quote(quote));
                    }
                    Err(error) => {
                        warn!("Quote poll for {} failed: {}", symbol, error);
                        on_event(QuoteEvent::Error {
                            instrument: symbol.clone(),
                            error,
                        });
                    }
                }
            },
        )?;
        streams.insert(instrument.to_string(), Stream::Running(poller));
        info!("Started streaming quotes for {} every {:?}", instrument, interval);
        Ok(true)
    }

    /// Stop polling `instrument` and wait for its poller to exit.
    ///
    /// The instrument stays registered until the poller has exited, so a concurrent
    /// `start` cannot overlap the old poller.
    pub fn stop(&self, instrument: &str) -> Result<bool> {
        let poller = self
            .streams
            .lock()?
            .get_mut(instrument)
            .and_then(Stream::begin_stop)
            .ok_or_else(|| TraderError::NotStreaming(instrument.to_string()))?;
        // Joined outside the lock so other instruments are not blocked meanwhile.
        poller.stop();
        self.streams.lock()?.remove(instrument);
        info!("Stopped streaming quotes for {}", instrument);
        Ok(true)
    }

    /// Whether `instrument` is registered, running or still being stopped.
    pub fn is_streaming(&self, instrument: &str) -> Result<bool> {
        Ok(self.streams.lock()?.contains_key(instrument))
    }

    /// Registered symbols, sorted.
    pub fn active_instruments(&self) -> Result<Vec<String>> {
        let mut symbols: Vec<String> = self.streams.lock()?.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    /// Stop every running stream. Returns how many were stopped.
    pub fn stop_all(&self) -> Result<usize> {
        let pollers: Vec<(String, Poller)> = {
            let mut streams = self.streams.lock()?;
            streams
                .iter_mut()
                .filter_map(|(instrument, entry)| {
                    entry.begin_stop().map(|poller| (instrument.clone(), poller))
                })
                .collect()
        };
        let count = pollers.len();
        for (instrument, poller) in pollers {
            poller.stop();
            self.streams.lock()?.remove(&instrument);
            info!("Stopped streaming quotes for {}", instrument);
        }
        Ok(count)
    }
}

impl Drop for QuoteStreamManager {
    fn drop(&mut self) {
        if let Err(e) = self.stop_all() {
            warn!("Failed to stop quote streams on drop: {}", e);
        }
    }
}
