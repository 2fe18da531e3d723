//! Error types for Blast
//!
//! `BlastError` covers setup and fatal failures (bad config, a dial that
//! can't even be attempted). Per-request and per-response failures are
//! not `BlastError` — see [`OutcomeError`], which is cheap to clone and
//! carries no non-`Clone` source so it can ride along on every
//! [`crate::worker::LoadOutcome`] and [`crate::reader::ResponseOutcome`].

use std::fmt;

/// Crate-wide result alias for fallible setup operations.
pub type Result<T> = std::result::Result<T, BlastError>;

/// Fatal errors raised while building or running a load.
#[derive(thiserror::Error, Debug)]
pub enum BlastError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to dial {address}: {source}")]
    Dial {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// The error kind attached to a single [`crate::worker::LoadOutcome`] or
/// [`crate::reader::ResponseOutcome`].
///
/// Spec'd as a string-keyed bucket in the report (`errorCountByKind`), so
/// this only needs a stable [`fmt::Display`], not a full error hierarchy.
#[derive(Debug, Clone)]
pub enum OutcomeError {
    /// No connection was ever established for this worker's dial slot.
    NilConnection,
    /// Any other I/O failure, stored pre-formatted since `std::io::Error`
    /// is not `Clone` and outcomes may be read by the reporter well after
    /// the originating error value has been dropped.
    Io(String),
}

impl fmt::Display for OutcomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeError::NilConnection => write!(f, "nil connection"),
            OutcomeError::Io(message) => write!(f, "{message}"),
        }
    }
}

impl From<std::io::Error> for OutcomeError {
    fn from(err: std::io::Error) -> Self {
        OutcomeError::Io(err.to_string())
    }
}
