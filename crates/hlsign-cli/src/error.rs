//! CLI error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Signing error: {0}")]
    Sign(#[from] hlsign_signer::SignError),

    #[error("Key error: {0}")]
    Key(#[from] hlsign_signer::KeyError),
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use hlsign_signer::{KeyError, SignError};

    #[test]
    fn test_library_errors_convert() {
        let err: CliError = SignError::UnknownInstrument("DOGE".to_string()).into();
        assert!(matches!(err, CliError::Sign(SignError::UnknownInstrument(_))));
        assert_eq!(err.to_string(), "Signing error: Unknown instrument: DOGE");

        let err: CliError = KeyError::EnvVarNotFound("HLSIGN_PRIVATE_KEY".to_string()).into();
        assert!(matches!(err, CliError::Key(KeyError::EnvVarNotFound(_))));
    }
}
