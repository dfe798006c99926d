//! Signing identity and secp256k1 signatures.
//!
//! Security notes:
//! - The private key lives inside `PrivateKeySigner` and is never logged,
//!   serialized or returned.
//! - Key bytes are held in `Zeroizing` buffers while being parsed.

use std::fmt;
use std::path::PathBuf;

use alloy::primitives::{Address, PrimitiveSignature, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::error::{SignError, SignResult};

/// Source of the private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeySource {
    /// Load from environment variable (development).
    EnvVar { var_name: String },
    /// Load from file (production, recommend 0600 permissions).
    File { path: PathBuf },
}

/// Key loading errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Failed to decode hex: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Address mismatch: expected {expected}, got {actual}")]
    AddressMismatch { expected: Address, actual: Address },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<KeyError> for SignError {
    fn from(e: KeyError) -> Self {
        Self::SigningFailure(e.to_string())
    }
}

/// Private key plus derived address.
pub struct SigningIdentity {
    signer: PrivateKeySigner,
}

impl SigningIdentity {
    /// Load a key and optionally verify the derived address.
    ///
    /// # Errors
    /// Returns `KeyError` if:
    /// - Environment variable not found
    /// - File read fails
    /// - Hex decoding fails
    /// - Private key is invalid
    /// - Address mismatch
    pub fn load(source: &KeySource, expected_address: Option<Address>) -> Result<Self, KeyError> {
        let secret_bytes = match source {
            KeySource::EnvVar { var_name } => {
                let raw = Zeroizing::new(
                    std::env::var(var_name)
                        .map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?,
                );
                parse_hex_key(&raw)?
            }
            KeySource::File { path } => {
                let raw = Zeroizing::new(std::fs::read_to_string(path)?);
                parse_hex_key(&raw)?
            }
        };

        let identity = Self::from_bytes(&secret_bytes)?;
        identity.verify_address(expected_address)?;
        Ok(identity)
    }

    /// Parse a hex key (0x prefix and surrounding whitespace allowed).
    pub fn from_hex(hex_key: &str) -> Result<Self, KeyError> {
        Self::from_bytes(&parse_hex_key(hex_key)?)
    }

    pub fn from_bytes(secret_bytes: &[u8]) -> Result<Self, KeyError> {
        let signer = PrivateKeySigner::from_slice(secret_bytes)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        Ok(Self { signer })
    }

    fn verify_address(&self, expected: Option<Address>) -> Result<(), KeyError> {
        match expected {
            Some(expected) if expected != self.address() => Err(KeyError::AddressMismatch {
                expected,
                actual: self.address(),
            }),
            _ => Ok(()),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign a 32-byte digest (RFC 6979, deterministic).
    ///
    /// # Errors
    /// Returns `SignError::SigningFailure` if the signer rejects the digest.
    pub fn sign_hash(&self, digest: &B256) -> SignResult<SignatureTriplet> {
        let signature = self.signer.sign_hash_sync(digest)?;
        Ok(SignatureTriplet::from(&signature))
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("address", &self.address())
            .field("key", &"<redacted>")
            .finish()
    }
}

fn parse_hex_key(hex_str: &str) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    let trimmed = hex_str.trim().trim_start_matches("0x");
    Ok(Zeroizing::new(hex::decode(trimmed)?))
}

/// Signature as the exchange expects it: `r`, `s` as 0x-prefixed 32-byte hex,
/// `v` as 27 or 28.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureTriplet {
    pub r: String,
    pub s: String,
    pub v: u8,
}

impl From<&PrimitiveSignature> for SignatureTriplet {
    fn from(sig: &PrimitiveSignature) -> Self {
        Self {
            r: format!("0x{}", hex::encode(sig.r().to_be_bytes::<32>())),
            s: format!("0x{}", hex::encode(sig.s().to_be_bytes::<32>())),
            v: 27 + u8::from(sig.v()),
        }
    }
}

impl SignatureTriplet {
    pub fn y_parity(&self) -> SignResult<bool> {
        match self.v {
            27 | 0 => Ok(false),
            28 | 1 => Ok(true),
            other => Err(SignError::SigningFailure(format!("invalid v: {other}"))),
        }
    }

    pub fn to_signature(&self) -> SignResult<PrimitiveSignature> {
        Ok(PrimitiveSignature::new(
            parse_word(&self.r)?,
            parse_word(&self.s)?,
            self.y_parity()?,
        ))
    }

    /// Address that produced this signature over `digest`.
    pub fn recover_address(&self, digest: &B256) -> SignResult<Address> {
        self.to_signature()?
            .recover_address_from_prehash(digest)
            .map_err(|e| SignError::SigningFailure(e.to_string()))
    }
}

fn parse_word(hex_str: &str) -> SignResult<U256> {
    let bytes = hex::decode(hex_str.trim_start_matches("0x"))
        .map_err(|e| SignError::SigningFailure(e.to_string()))?;
    if bytes.len() > 32 {
        return Err(SignError::SigningFailure(format!(
            "signature component too long: {} bytes",
            bytes.len()
        )));
    }
    Ok(U256::from_be_slice(&bytes))
}
