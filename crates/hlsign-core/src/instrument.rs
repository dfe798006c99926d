//! Instrument metadata and price/size normalization.
//!
//! An [`Instrument`] carries the precision rules the exchange enforces for one
//! tradable symbol; an [`InstrumentBook`] is the caller's read-only snapshot of
//! all of them. Normalization applies:
//! - Size: truncate to `sz_decimals`
//! - Price: 5 significant figures (integers always allowed), at most
//!   `MAX_DECIMALS - sz_decimals` decimals, then snapped to the tick size

use crate::decimal::magnitude;
use crate::error::{CoreError, Result};
use crate::{OrderSide, Price, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum significant figures for a non-integer price.
pub const MAX_SIG_FIGS: i32 = 5;

/// Decimal budget for perpetual prices (shared with `sz_decimals`).
pub const PERP_MAX_DECIMALS: u32 = 6;

/// Decimal budget for spot prices (shared with `sz_decimals`).
pub const SPOT_MAX_DECIMALS: u32 = 8;

/// Largest scale a `Decimal` can carry.
const MAX_DECIMAL_SCALE: u32 = 28;

/// Spot asset indices start here.
pub const SPOT_ASSET_OFFSET: u32 = 10_000;

/// Tradable symbol as described by exchange metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Name used by callers (e.g. "BTC", "@142", "PURR/USDC").
    pub name: String,
    /// Exchange asset index used on the wire.
    pub asset: u32,
    /// Size decimals (`szDecimals`); lot size is `10^-sz_decimals`.
    pub sz_decimals: u32,
    /// Explicit tick size. When absent the finest grid allowed by the
    /// decimal budget is used.
    #[serde(default)]
    pub tick_size: Option<Price>,
    #[serde(default)]
    pub is_spot: bool,
}

impl Instrument {
    /// Perpetual at universe position `asset`.
    pub fn perp(name: impl Into<String>, asset: u32, sz_decimals: u32) -> Self {
        Self {
            name: name.into(),
            asset,
            sz_decimals,
            tick_size: None,
            is_spot: false,
        }
    }

    /// Spot pair at spot universe index `pair_index`.
    pub fn spot(name: impl Into<String>, pair_index: u32, sz_decimals: u32) -> Self {
        Self {
            name: name.into(),
            asset: SPOT_ASSET_OFFSET + pair_index,
            sz_decimals,
            tick_size: None,
            is_spot: true,
        }
    }

    pub fn with_tick_size(mut self, tick_size: Price) -> Self {
        self.tick_size = Some(tick_size);
        self
    }

    /// Minimum size increment.
    pub fn lot_size(&self) -> Size {
        Size::new(Decimal::new(1, self.sz_decimals.min(MAX_DECIMAL_SCALE)))
    }

    /// Maximum decimal places a price may carry.
    pub fn max_price_decimals(&self) -> u32 {
        let budget = if self.is_spot {
            SPOT_MAX_DECIMALS
        } else {
            PERP_MAX_DECIMALS
        };
        budget.saturating_sub(self.sz_decimals)
    }

    pub fn tick_size(&self) -> Price {
        self.tick_size
            .unwrap_or_else(|| Price::new(Decimal::new(1, self.max_price_decimals())))
    }

    /// Truncate a size to the lot grid.
    ///
    /// # Errors
    /// `InvalidQuantity` if the result is zero or negative.
    pub fn normalize_size(&self, size: Size) -> Result<Size> {
        let rounded = size.round_to_decimals(self.sz_decimals);
        if !rounded.is_positive() {
            return Err(CoreError::InvalidQuantity(format!(
                "{}: size {} is below one lot ({})",
                self.name,
                size,
                self.lot_size()
            )));
        }
        Ok(rounded)
    }

    /// Round a price to the exchange grid, toward the side's aggressive
    /// direction.
    ///
    /// # Errors
    /// `InvalidQuantity` if the price is not positive before or after rounding.
    pub fn normalize_price(&self, price: Price, side: OrderSide) -> Result<Price> {
        if !price.is_positive() {
            return Err(CoreError::InvalidQuantity(format!(
                "{}: price {} must be positive",
                self.name, price
            )));
        }

        let strategy = side.price_rounding();
        let decimals = sig_fig_decimals(price.inner()).min(self.max_price_decimals());
        let limited = Price::new(price.inner().round_dp_with_strategy(decimals, strategy));
        let snapped = limited
            .round_to_tick(self.tick_size(), strategy)
            .ok_or_else(|| self.out_of_range(price))?;
        let normalized = Price::new(snapped.inner().normalize());

        if !normalized.is_positive() {
            return Err(CoreError::InvalidQuantity(format!(
                "{}: price {} rounds to zero",
                self.name, price
            )));
        }
        Ok(normalized)
    }

    /// Price for a market order: reference moved by `slippage` against the
    /// trader, then normalized. A zero reference passes through as zero.
    pub fn market_price(&self, reference: Price, side: OrderSide, slippage: Decimal) -> Result<Price> {
        if reference.is_zero() {
            return Ok(Price::ZERO);
        }
        let factor = match side {
            OrderSide::Buy => Decimal::ONE + slippage,
            OrderSide::Sell => Decimal::ONE - slippage,
        };
        let moved = reference
            .inner()
            .checked_mul(factor)
            .ok_or_else(|| self.out_of_range(reference))?;
        self.normalize_price(Price::new(moved), side)
    }

    fn out_of_range(&self, price: Price) -> CoreError {
        CoreError::InvalidQuantity(format!("{}: price {} out of range", self.name, price))
    }

    /// Normalized size in wire form.
    pub fn format_size(&self, size: Size) -> Result<String> {
        Ok(self.normalize_size(size)?.to_wire())
    }

    /// Normalized price in wire form.
    pub fn format_price(&self, price: Price, side: OrderSide) -> Result<String> {
        Ok(self.normalize_price(price, side)?.to_wire())
    }
}

/// Decimal places allowed by the significant-figure rule.
fn sig_fig_decimals(value: Decimal) -> u32 {
    (MAX_SIG_FIGS - magnitude(value) - 1).max(0) as u32
}

/// Read-only snapshot of instrument metadata keyed by name.
#[derive(Debug, Clone, Default)]
pub struct InstrumentBook {
    by_name: HashMap<String, Instrument>,
}

impl InstrumentBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instrument: Instrument) {
        self.by_name.insert(instrument.name.clone(), instrument);
    }

    /// Register `alias` as another name for an existing entry.
    pub fn alias(&mut self, alias: impl Into<String>, name: &str) {
        if let Some(inst) = self.by_name.get(name).cloned() {
            self.by_name.entry(alias.into()).or_insert(inst);
        }
    }

    /// # Errors
    /// `UnknownInstrument` when `name` is not in the snapshot.
    pub fn get(&self, name: &str) -> Result<&Instrument> {
        self.by_name
            .get(name)
            .ok_or_else(|| CoreError::UnknownInstrument(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Build from the exchange `meta` and `spotMeta` info responses.
    ///
    /// Perp asset index is the universe position; spot asset index is
    /// `10000 + pair index`. Spot pairs are also reachable as `BASE/QUOTE`.
    pub fn from_meta(perp: &PerpMeta, spot: Option<&SpotMeta>) -> Self {
        let mut book = Self::new();

        for (idx, asset) in perp.universe.iter().enumerate() {
            book.insert(Instrument::perp(&asset.name, idx as u32, asset.sz_decimals));
        }

        if let Some(spot) = spot {
            for pair in &spot.universe {
                let [base, quote] = pair.tokens;
                let Some(base_token) = spot.tokens.iter().find(|t| t.index == base) else {
                    continue;
                };
                book.insert(Instrument::spot(&pair.name, pair.index, base_token.sz_decimals));

                if let Some(quote_token) = spot.tokens.iter().find(|t| t.index == quote) {
                    let symbol = format!("{}/{}", base_token.name, quote_token.name);
                    book.alias(symbol, &pair.name);
                }
            }
        }

        book
    }
}

impl FromIterator<Instrument> for InstrumentBook {
    fn from_iter<I: IntoIterator<Item = Instrument>>(iter: I) -> Self {
        let mut book = Self::new();
        for inst in iter {
            book.insert(inst);
        }
        book
    }
}

/// `meta` response (perp universe).
#[derive(Debug, Clone, Deserialize)]
pub struct PerpMeta {
    pub universe: Vec<PerpAssetMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerpAssetMeta {
    pub name: String,
    #[serde(rename = "szDecimals")]
    pub sz_decimals: u32,
}

/// `spotMeta` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotMeta {
    pub universe: Vec<SpotPairMeta>,
    pub tokens: Vec<SpotTokenMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotPairMeta {
    pub name: String,
    pub tokens: [u32; 2],
    pub index: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotTokenMeta {
    pub name: String,
    #[serde(rename = "szDecimals")]
    pub sz_decimals: u32,
    #[serde(rename = "weiDecimals", default)]
    pub wei_decimals: u32,
    pub index: u32,
    #[serde(rename = "tokenId", default)]
    pub token_id: Option<String>,
}
