//! Error types for the factor pipeline.

use crate::source::SourceKind;
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PanelError>;

/// Errors that can occur while resampling, aligning or deriving factors.
#[derive(Debug, Error)]
pub enum PanelError {
    /// Missing required column in input data
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A source table the computation depends on was not supplied
    #[error("Missing source table: {0}")]
    MissingSource(SourceKind),

    /// Zero rows where at least one is required
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// An inner join across sources or factor groups kept no dates
    #[error("Inner join kept no overlapping dates for {0}")]
    JoinEmptyResult(String),

    /// A boundary date value could not be parsed
    #[error("Invalid date value: {0}")]
    InvalidDate(String),

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: String,
        /// End date of the range
        end: String,
    },

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Factor group not found in registry
    #[error("Factor group not found: {0}")]
    NotFound(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// A failure while processing one symbol
    #[error("Symbol {symbol}: {source}")]
    Symbol {
        /// Symbol identifier
        symbol: String,
        /// Underlying failure
        #[source]
        source: Box<PanelError>,
    },

    /// Polars DataFrame error
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl PanelError {
    /// Attach a symbol identifier to this error.
    pub fn for_symbol(self, symbol: &str) -> Self {
        match self {
            Self::Symbol { .. } => self,
            other => Self::Symbol {
                symbol: symbol.to_string(),
                source: Box::new(other),
            },
        }
    }
}
