//! Error types for hlsign-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A size or price does not survive normalization to the instrument grid.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Instrument name is absent from the metadata snapshot.
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Invalid client order id: {0}")]
    InvalidClientOrderId(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(String),
}

impl From<rust_decimal::Error> for CoreError {
    fn from(e: rust_decimal::Error) -> Self {
        Self::DecimalParse(e.to_string())
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
