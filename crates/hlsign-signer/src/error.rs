//! Signing error types.

use hlsign_core::CoreError;

use crate::nonce::NonceError;
use thiserror::Error;

/// Errors surfaced by the signing pipeline.
///
/// Every variant is raised before a signature exists; no partially signed
/// request ever leaves the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Invalid grouping: {0}")]
    InvalidGrouping(String),

    #[error("Signing failure: {0}")]
    SigningFailure(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// Malformed caller input that is not a quantity (empty cancel list,
    /// bad client order id, bad address).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Nonce error: {0}")]
    Nonce(#[from] NonceError),
}

impl SignError {
    /// Stable label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidQuantity(_) => "invalid_quantity",
            Self::UnknownInstrument(_) => "unknown_instrument",
            Self::InvalidGrouping(_) => "invalid_grouping",
            Self::SigningFailure(_) => "signing_failure",
            Self::Encoding(_) => "encoding",
            Self::InvalidInput(_) => "invalid_input",
            Self::Nonce(_) => "clock_skew",
        }
    }
}

impl From<CoreError> for SignError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidQuantity(msg) => Self::InvalidQuantity(msg),
            CoreError::UnknownInstrument(name) => Self::UnknownInstrument(name),
            CoreError::DecimalParse(msg) => Self::InvalidQuantity(msg),
            CoreError::InvalidClientOrderId(msg) | CoreError::Parse(msg) => Self::InvalidInput(msg),
        }
    }
}

impl From<alloy::signers::Error> for SignError {
    fn from(e: alloy::signers::Error) -> Self {
        Self::SigningFailure(e.to_string())
    }
}

pub type SignResult<T> = Result<T, SignError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_taxonomy() {
        let err: SignError = CoreError::InvalidQuantity("0".into()).into();
        assert_eq!(err.reason(), "invalid_quantity");

        let err: SignError = CoreError::UnknownInstrument("DOGE".into()).into();
        assert_eq!(err, SignError::UnknownInstrument("DOGE".into()));

        let err: SignError = CoreError::InvalidClientOrderId("0x12".into()).into();
        assert!(matches!(err, SignError::InvalidInput(_)));
    }
}
