//! Precision-safe decimal types for order fields.
//!
//! Uses `rust_decimal` for exact decimal arithmetic. The exchange reads prices
//! and sizes as decimal strings, so no value in this module ever passes through
//! a binary float.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to prevent mixing prices with sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Snap to a multiple of `tick_size` using the given rounding direction.
    ///
    /// `None` if the tick count does not fit in a `Decimal`.
    #[inline]
    pub fn round_to_tick(&self, tick_size: Price, strategy: RoundingStrategy) -> Option<Self> {
        if tick_size.is_zero() {
            return Some(*self);
        }
        self.0
            .checked_div(tick_size.0)?
            .round_dp_with_strategy(0, strategy)
            .checked_mul(tick_size.0)
            .map(Self)
    }

    /// Exchange wire form: plain decimal, no exponent, no trailing zeros.
    pub fn to_wire(&self) -> String {
        format_wire_decimal(self.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Size/quantity with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Truncate to `decimals` places (never oversizes).
    #[inline]
    pub fn round_to_decimals(&self, decimals: u32) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(decimals, RoundingStrategy::ToZero)
                .normalize(),
        )
    }

    pub fn to_wire(&self) -> String {
        format_wire_decimal(self.0)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Format a decimal the way the exchange expects on the wire.
///
/// Trailing fractional zeros are stripped and negative zero collapses to `"0"`.
pub fn format_wire_decimal(value: Decimal) -> String {
    if value.is_zero() {
        return "0".to_string();
    }
    value.normalize().to_string()
}

/// Order of magnitude of a decimal: 12345 -> 4, 1.5 -> 0, 0.00123 -> -3.
pub fn magnitude(value: Decimal) -> i32 {
    let mut v = value.abs();
    if v.is_zero() {
        return 0;
    }
    let mut m = 0;
    while v >= Decimal::TEN {
        v /= Decimal::TEN;
        m += 1;
    }
    while v < Decimal::ONE {
        v *= Decimal::TEN;
        m -= 1;
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_round_to_tick_directional() {
        let price = Price::new(dec!(100.019));
        let tick = Price::new(dec!(0.01));

        let up = price.round_to_tick(tick, RoundingStrategy::ToPositiveInfinity).unwrap();
        let down = price.round_to_tick(tick, RoundingStrategy::ToNegativeInfinity).unwrap();
        assert_eq!(up.0, dec!(100.02));
        assert_eq!(down.0, dec!(100.01));
    }

    #[test]
    fn test_round_to_tick_overflow_is_none() {
        let huge = Price::new(Decimal::MAX);
        assert!(huge
            .round_to_tick(Price::new(dec!(0.01)), RoundingStrategy::ToNegativeInfinity)
            .is_none());
        assert_eq!(
            huge.round_to_tick(Price::new(dec!(1)), RoundingStrategy::ToNegativeInfinity),
            Some(huge)
        );
    }

    #[test]
    fn test_size_round_to_decimals_truncates() {
        let size = Size::new(dec!(0.123456));
        assert_eq!(size.round_to_decimals(4).0, dec!(0.1234));
        assert_eq!(Size::new(dec!(0.00001)).round_to_decimals(4).0, dec!(0));
    }

    #[test]
    fn test_wire_format_strips_trailing_zeros() {
        assert_eq!(format_wire_decimal(dec!(1.100)), "1.1");
        assert_eq!(format_wire_decimal(dec!(105000)), "105000");
        assert_eq!(format_wire_decimal(dec!(105000.000)), "105000");
        assert_eq!(format_wire_decimal(dec!(0.00010)), "0.0001");
        assert_eq!(format_wire_decimal(dec!(-0.0)), "0");
    }

    #[test]
    fn test_magnitude() {
        assert_eq!(magnitude(dec!(12345)), 4);
        assert_eq!(magnitude(dec!(1234.5)), 3);
        assert_eq!(magnitude(dec!(1.5)), 0);
        assert_eq!(magnitude(dec!(0.123)), -1);
        assert_eq!(magnitude(dec!(0.00123)), -3);
        assert_eq!(magnitude(dec!(0)), 0);
    }
}
