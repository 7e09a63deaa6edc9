//! Error types shared by the broker abstraction and its adapters.
//!
//! `TraderError` unifies stop parsing failures, order validation, instrument lookup,
//! streaming lifecycle misuse and the plumbing errors (I/O, JSON, poisoned locks)
//! that surface while running pollers, so every crate in the workspace can
//! propagate a single error type with `?`.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by the library and the binary.
#[derive(Error, Debug)]
pub enum TraderError {
    /// I/O error, e.g. failing to spawn a poller thread or to read a symbols file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Input could not be treated as a stop string at all (empty or not a string).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Stop string was a string but did not follow the stop grammar.
    #[error("Syntax error in stop string {input:?}: {issue}")]
    Syntax {
        /// The raw input as given by the caller.
        input: String,
        /// What was wrong with it.
        issue: SyntaxIssue,
    },

    /// Malformed caller input: non-positive quantity, zero interval, empty symbol...
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The broker does not know the requested instrument.
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    /// Transient failure reported by the upstream brokerage.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A quote stream is already running for the instrument.
    #[error("Already streaming quotes for {0}")]
    AlreadyStreaming(String),

    /// No quote stream is running for the instrument.
    #[error("Not streaming quotes for {0}")]
    NotStreaming(String),

    /// The broker behind a running stream has been dropped.
    #[error("Broker is no longer available")]
    BrokerGone,

    /// Error while parsing a symbols file.
    #[error("Parse symbols file error: {0}")]
    ParseSymbolsFile(String),

    /// The process signal (Ctrl+C) handler could not be installed.
    #[error("Signal handler error: {0}")]
    Signal(String),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

/// The specific way a stop string broke the grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxIssue {
    /// Numeric part present but neither `$` nor `%` was given.
    #[error("no stop type marker ('$' or '%')")]
    MissingMarker,

    /// Marker present but no digits to take the magnitude from.
    #[error("no numeric magnitude")]
    MissingDigits,

    /// `e`/`E` not followed by an optional sign and at least one digit.
    #[error("malformed exponent")]
    MalformedExponent,

    /// Magnitude overflowed to infinity.
    #[error("magnitude is not finite")]
    NotFinite,

    /// Character that has no place at this position.
    #[error("unexpected character {ch:?} at byte {pos}")]
    UnexpectedChar {
        /// Offending character.
        ch: char,
        /// Byte offset into the input.
        pos: usize,
    },
}

impl<T> From<PoisonError<T>> for TraderError {
    fn from(err: PoisonError<T>) -> Self {
        TraderError::MutexLock(err.to_string())
    }
}
