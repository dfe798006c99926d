//! Order intents and identifiers.
//!
//! Provides order side, kind, time-in-force, TP/SL grouping and client order
//! ID types. These describe what the trader wants; the signer crate turns them
//! into the exchange wire form.

use crate::error::{CoreError, Result};
use crate::{Price, Size};
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }

    /// Price rounding direction for this side.
    ///
    /// Buys round up and sells round down, so a marketable order stays
    /// marketable after snapping to the grid.
    pub fn price_rounding(&self) -> RoundingStrategy {
        match self {
            Self::Buy => RoundingStrategy::ToPositiveInfinity,
            Self::Sell => RoundingStrategy::ToNegativeInfinity,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Time-in-force for limit orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-til-cancelled.
    #[default]
    #[serde(rename = "Gtc")]
    GoodTilCancelled,
    /// Immediate-or-cancel.
    #[serde(rename = "Ioc")]
    ImmediateOrCancel,
    /// Add-liquidity-only.
    #[serde(rename = "Alo")]
    AddLiquidityOnly,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoodTilCancelled => "Gtc",
            Self::ImmediateOrCancel => "Ioc",
            Self::AddLiquidityOnly => "Alo",
        }
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeInForce {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gtc" => Ok(Self::GoodTilCancelled),
            "ioc" => Ok(Self::ImmediateOrCancel),
            "alo" => Ok(Self::AddLiquidityOnly),
            other => Err(CoreError::Parse(format!("unknown time in force: {other}"))),
        }
    }
}

/// Trigger leg flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tpsl {
    /// Take profit.
    Tp,
    /// Stop loss.
    Sl,
}

impl Tpsl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tp => "tp",
            Self::Sl => "sl",
        }
    }
}

impl fmt::Display for Tpsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order kind requested by the trader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum OrderKind {
    /// Resting or immediate limit order.
    Limit { tif: TimeInForce },
    /// Aggressive IOC limit priced from a reference price plus slippage.
    Market,
    /// Take-profit or stop-loss trigger.
    Trigger {
        tpsl: Tpsl,
        trigger_px: Price,
        is_market: bool,
    },
}

impl OrderKind {
    pub fn is_trigger(&self) -> bool {
        matches!(self, Self::Trigger { .. })
    }

    pub fn tpsl(&self) -> Option<Tpsl> {
        match self {
            Self::Trigger { tpsl, .. } => Some(*tpsl),
            _ => None,
        }
    }
}

/// Client order ID: 16 bytes, rendered as `0x` + 32 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientOrderId(u128);

impl ClientOrderId {
    /// Create a new random client order ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().as_u128())
    }

    pub fn from_u128(raw: u128) -> Self {
        Self(raw)
    }

    /// Parse the `0x`-prefixed 16-byte hex form.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| CoreError::InvalidClientOrderId(format!("{s}: missing 0x prefix")))?;
        if digits.len() != 32 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidClientOrderId(format!(
                "{s}: expected 32 hex digits"
            )));
        }
        u128::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|e| CoreError::InvalidClientOrderId(format!("{s}: {e}")))
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{:032x}", self.0)
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ClientOrderId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for ClientOrderId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ClientOrderId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A single order as the trader expresses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Instrument name as listed in the metadata snapshot.
    pub instrument: String,
    pub side: OrderSide,
    pub size: Size,
    /// Limit price; reference price for market orders (zero passes through).
    pub price: Price,
    pub kind: OrderKind,
    #[serde(default)]
    pub reduce_only: bool,
    #[serde(default)]
    pub cloid: Option<ClientOrderId>,
}

impl OrderIntent {
    pub fn limit(instrument: impl Into<String>, side: OrderSide, size: Size, price: Price) -> Self {
        Self {
            instrument: instrument.into(),
            side,
            size,
            price,
            kind: OrderKind::Limit {
                tif: TimeInForce::GoodTilCancelled,
            },
            reduce_only: false,
            cloid: None,
        }
    }

    pub fn market(instrument: impl Into<String>, side: OrderSide, size: Size, reference: Price) -> Self {
        Self {
            instrument: instrument.into(),
            side,
            size,
            price: reference,
            kind: OrderKind::Market,
            reduce_only: false,
            cloid: None,
        }
    }

    /// Trigger leg; `price` is the limit used once triggered.
    pub fn trigger(
        instrument: impl Into<String>,
        side: OrderSide,
        size: Size,
        price: Price,
        tpsl: Tpsl,
        trigger_px: Price,
        is_market: bool,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            side,
            size,
            price,
            kind: OrderKind::Trigger {
                tpsl,
                trigger_px,
                is_market,
            },
            reduce_only: true,
            cloid: None,
        }
    }

    pub fn with_tif(mut self, tif: TimeInForce) -> Self {
        if let OrderKind::Limit { .. } = self.kind {
            self.kind = OrderKind::Limit { tif };
        }
        self
    }

    pub fn with_reduce_only(mut self, reduce_only: bool) -> Self {
        self.reduce_only = reduce_only;
        self
    }

    pub fn with_cloid(mut self, cloid: ClientOrderId) -> Self {
        self.cloid = Some(cloid);
        self
    }
}

/// Relationship between the orders of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum Grouping {
    /// Independent orders.
    #[default]
    #[serde(rename = "na")]
    Na,
    /// One primary order followed by its own TP and/or SL.
    #[serde(rename = "normalTpsl")]
    NormalTpsl,
    /// TP and/or SL attached to an already open position.
    #[serde(rename = "positionTpsl")]
    PositionTpsl,
}

impl Grouping {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Na => "na",
            Self::NormalTpsl => "normalTpsl",
            Self::PositionTpsl => "positionTpsl",
        }
    }
}

// Always a plain string, in msgpack as well as JSON.
impl Serialize for Grouping {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered orders submitted in one request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderBatch {
    pub orders: Vec<OrderIntent>,
    pub grouping: Grouping,
}

impl OrderBatch {
    pub fn new(orders: Vec<OrderIntent>, grouping: Grouping) -> Self {
        Self { orders, grouping }
    }

    pub fn independent(orders: Vec<OrderIntent>) -> Self {
        Self::new(orders, Grouping::Na)
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }
}
