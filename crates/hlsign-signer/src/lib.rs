//! Action canonicalization, hashing and signing for Hyperliquid.
//!
//! # Key Components
//!
//! - [`SigningEngine`]: runs the pipeline for every supported action
//! - [`Canonicalizer`]: intents to wire actions against an instrument snapshot
//! - [`encoder`]: deterministic msgpack encoding
//! - [`hash`]: action hash and phantom-agent domain separation
//! - [`typed_data`]: EIP-712 hashing for user-signed actions
//! - [`SigningIdentity`]: private key holder, never exposes the key
//! - [`NonceRegistry`]: monotonic nonces per signer address, shared process-wide
//!
//! # Pipeline
//!
//! 1. Normalize price and size per instrument
//! 2. Validate grouping and assemble order wires
//! 3. Encode the action as msgpack
//! 4. `keccak256(msgpack ‖ nonce ‖ vault ‖ expires)`
//! 5. Sign the phantom agent `{source, connectionId}` under EIP-712
//!
//! Nothing is signed unless every step before it succeeded.

pub mod batch;
pub mod canonical;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod hash;
pub mod nonce;
pub mod request;
pub mod signer;
pub mod typed_data;
pub mod wire;

// Error types
pub use error::{SignError, SignResult};

// Canonicalization
pub use batch::{assemble, validate_grouping};
pub use canonical::{
    format_fee_rate, format_token_amount, scale_to_units, scale_usd_exact, CancelRequest,
    Canonicalizer, ModifyRequest, TwapRequest, HYPE_DECIMALS, USD_DECIMALS,
    USD_TRANSFER_DECIMALS,
};

// Engine
pub use engine::{
    NoopObserver, RequestOptions, SendAssetRequest, SigningEngine, SigningObserver,
    DEFAULT_SLIPPAGE,
};

// Hashing
pub use hash::{action_hash, Network, PhantomAgent, SigningInput};

// Nonce management
pub use nonce::{
    Clock, NonceCounter, NonceError, NonceRegistry, SystemClock, MAX_CLOCK_SKEW_MS,
    WARN_CLOCK_SKEW_MS,
};

// Signing
pub use request::SignedRequest;
pub use signer::{KeyError, KeySource, SignatureTriplet, SigningIdentity};

// Wire types
pub use wire::{Action, BuilderInfo, L1Action, OrderRef, OrderTypeWire, OrderWire, UserAction};
