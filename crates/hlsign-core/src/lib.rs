//! Core domain types for the hlsign signing engine.
//!
//! This crate provides the trader-facing types the signer consumes:
//! - `Price`, `Size`: Precision-safe numeric types
//! - `Instrument`, `InstrumentBook`: Per-symbol precision rules and lookup
//! - `OrderIntent`, `OrderBatch`, `Grouping`: What the trader wants to place
//! - `ClientOrderId`: 16-byte client order identifier

pub mod decimal;
pub mod error;
pub mod instrument;
pub mod order;

pub use decimal::{format_wire_decimal, Price, Size};
pub use error::{CoreError, Result};
pub use instrument::{
    Instrument, InstrumentBook, PerpMeta, SpotMeta, MAX_SIG_FIGS, PERP_MAX_DECIMALS,
    SPOT_ASSET_OFFSET, SPOT_MAX_DECIMALS,
};
pub use order::{
    ClientOrderId, Grouping, OrderBatch, OrderIntent, OrderKind, OrderSide, TimeInForce, Tpsl,
};
