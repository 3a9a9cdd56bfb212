//! Error taxonomy for the analytics core.
//!
//! Load-time failures (`DataUnavailable`) are fatal for whatever page needed
//! the data. Per-analysis statistical failures (`InsufficientData`,
//! `EmptyCorpus`) are caught at each analysis boundary so one bad chart does
//! not blank the rest of a page. Row-level parse garbage is never an error at
//! all; the field parsers absorb it (see `parse`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Backing dataset file missing or unreadable at load time.
    #[error("dataset unavailable: {0}")]
    DataUnavailable(String),

    /// Empty or malformed input handed to a transformation that requires
    /// non-empty data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A statistical precondition was violated (e.g. a degenerate
    /// contingency table with a zero expected cell).
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// A text-ranking corpus restriction matched no records.
    #[error("empty corpus: {0}")]
    EmptyCorpus(String),

    /// Configuration file problems.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
