//! Batch assembly and grouping validation.
//!
//! # Grouping invariants
//!
//! - `na`: any non-empty batch
//! - `positionTpsl`: only trigger legs, all reduce-only, one instrument, one
//!   side, at most one TP and one SL
//! - `normalTpsl`: a non-trigger primary first, then one TP and/or one SL on
//!   the same instrument, reduce-only, opposite side to the primary
//!
//! Validation runs before any leg is normalized; nothing is emitted for a
//! batch that fails either step.

use hlsign_core::{Grouping, OrderBatch, OrderIntent, Tpsl};

use crate::canonical::Canonicalizer;
use crate::error::{SignError, SignResult};
use crate::wire::OrderWire;

/// Validate the grouping invariant, then normalize every leg in caller order.
pub fn assemble(batch: &OrderBatch, canon: &Canonicalizer<'_>) -> SignResult<Vec<OrderWire>> {
    validate_grouping(batch)?;
    batch.orders.iter().map(|o| canon.order_wire(o)).collect()
}

/// Structural check of `batch` against its grouping mode.
pub fn validate_grouping(batch: &OrderBatch) -> SignResult<()> {
    let Some(first) = batch.orders.first() else {
        return Err(invalid("empty batch"));
    };

    match batch.grouping {
        Grouping::Na => Ok(()),
        Grouping::PositionTpsl => {
            for leg in &batch.orders {
                check_tpsl_leg(leg, first)?;
                if leg.side != first.side {
                    return Err(invalid("position tp/sl legs must share one side"));
                }
            }
            check_tpsl_counts(&batch.orders)
        }
        Grouping::NormalTpsl => {
            if first.kind.is_trigger() {
                return Err(invalid("first order must be the non-trigger primary"));
            }
            let legs = &batch.orders[1..];
            if legs.is_empty() {
                return Err(invalid("primary order has no tp/sl legs"));
            }
            for leg in legs {
                check_tpsl_leg(leg, first)?;
                if leg.side != first.side.opposite() {
                    return Err(invalid("tp/sl legs must be opposite side to the primary"));
                }
            }
            check_tpsl_counts(legs)
        }
    }
}

fn check_tpsl_leg(leg: &OrderIntent, anchor: &OrderIntent) -> SignResult<()> {
    if !leg.kind.is_trigger() {
        return Err(invalid(format!("{} leg is not a trigger order", leg.instrument)));
    }
    if !leg.reduce_only {
        return Err(invalid(format!("{} tp/sl leg is not reduce-only", leg.instrument)));
    }
    if leg.instrument != anchor.instrument {
        return Err(invalid(format!(
            "mixed instruments: {} and {}",
            anchor.instrument, leg.instrument
        )));
    }
    Ok(())
}

fn check_tpsl_counts(legs: &[OrderIntent]) -> SignResult<()> {
    let count = |kind: Tpsl| legs.iter().filter(|l| l.kind.tpsl() == Some(kind)).count();
    if count(Tpsl::Tp) > 1 || count(Tpsl::Sl) > 1 {
        return Err(invalid("at most one tp and one sl per group"));
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> SignError {
    SignError::InvalidGrouping(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlsign_core::{Instrument, InstrumentBook, OrderSide, Price, Size};
    use rust_decimal_macros::dec;

    fn tp(instrument: &str, side: OrderSide, px: rust_decimal::Decimal) -> OrderIntent {
        OrderIntent::trigger(
            instrument,
            side,
            Size::new(dec!(0.01)),
            Price::new(px),
            Tpsl::Tp,
            Price::new(px),
            true,
        )
    }

    fn sl(instrument: &str, side: OrderSide, px: rust_decimal::Decimal) -> OrderIntent {
        OrderIntent::trigger(
            instrument,
            side,
            Size::new(dec!(0.01)),
            Price::new(px),
            Tpsl::Sl,
            Price::new(px),
            true,
        )
    }

    fn primary() -> OrderIntent {
        OrderIntent::limit("BTC", OrderSide::Buy, Size::new(dec!(0.01)), Price::new(dec!(105000)))
    }

    #[test]
    fn test_empty_batch_rejected_for_every_mode() {
        for grouping in [Grouping::Na, Grouping::NormalTpsl, Grouping::PositionTpsl] {
            let batch = OrderBatch::new(vec![], grouping);
            assert!(matches!(
                validate_grouping(&batch),
                Err(SignError::InvalidGrouping(_))
            ));
        }
    }

    #[test]
    fn test_independent_accepts_mixed_orders() {
        let batch = OrderBatch::independent(vec![
            primary(),
            OrderIntent::limit("ETH", OrderSide::Sell, Size::new(dec!(1)), Price::new(dec!(2000))),
        ]);
        assert!(validate_grouping(&batch).is_ok());
    }

    #[test]
    fn test_normal_tpsl_accepts_primary_with_legs() {
        let batch = OrderBatch::new(
            vec![
                primary(),
                tp("BTC", OrderSide::Sell, dec!(110000)),
                sl("BTC", OrderSide::Sell, dec!(100000)),
            ],
            Grouping::NormalTpsl,
        );
        assert!(validate_grouping(&batch).is_ok());
    }

    #[test]
    fn test_normal_tpsl_rejects_mixed_instruments() {
        let batch = OrderBatch::new(
            vec![primary(), tp("ETH", OrderSide::Sell, dec!(3000))],
            Grouping::NormalTpsl,
        );
        assert!(matches!(
            validate_grouping(&batch),
            Err(SignError::InvalidGrouping(_))
        ));
    }

    #[test]
    fn test_normal_tpsl_rejects_same_side_leg() {
        let batch = OrderBatch::new(
            vec![primary(), tp("BTC", OrderSide::Buy, dec!(110000))],
            Grouping::NormalTpsl,
        );
        assert!(validate_grouping(&batch).is_err());
    }

    #[test]
    fn test_normal_tpsl_rejects_duplicate_tp() {
        let batch = OrderBatch::new(
            vec![
                primary(),
                tp("BTC", OrderSide::Sell, dec!(110000)),
                tp("BTC", OrderSide::Sell, dec!(120000)),
            ],
            Grouping::NormalTpsl,
        );
        assert!(validate_grouping(&batch).is_err());
    }

    #[test]
    fn test_normal_tpsl_rejects_trigger_primary() {
        let batch = OrderBatch::new(
            vec![tp("BTC", OrderSide::Sell, dec!(110000))],
            Grouping::NormalTpsl,
        );
        assert!(validate_grouping(&batch).is_err());
    }

    #[test]
    fn test_position_tpsl_accepts_reduce_only_legs() {
        let batch = OrderBatch::new(
            vec![
                tp("BTC", OrderSide::Sell, dec!(110000)),
                sl("BTC", OrderSide::Sell, dec!(100000)),
            ],
            Grouping::PositionTpsl,
        );
        assert!(validate_grouping(&batch).is_ok());
    }

    #[test]
    fn test_position_tpsl_rejects_non_reduce_only_leg() {
        let batch = OrderBatch::new(
            vec![
                tp("BTC", OrderSide::Sell, dec!(110000)),
                sl("BTC", OrderSide::Sell, dec!(100000)).with_reduce_only(false),
            ],
            Grouping::PositionTpsl,
        );
        assert!(matches!(
            validate_grouping(&batch),
            Err(SignError::InvalidGrouping(_))
        ));
    }

    #[test]
    fn test_position_tpsl_rejects_primary_order() {
        let batch = OrderBatch::new(
            vec![primary(), tp("BTC", OrderSide::Sell, dec!(110000))],
            Grouping::PositionTpsl,
        );
        assert!(validate_grouping(&batch).is_err());
    }

    #[test]
    fn test_assemble_preserves_order() {
        let book: InstrumentBook = [Instrument::perp("BTC", 0, 5).with_tick_size(Price::new(dec!(1)))]
            .into_iter()
            .collect();
        let canon = Canonicalizer::new(&book, dec!(0.05));
        let batch = OrderBatch::new(
            vec![
                primary(),
                tp("BTC", OrderSide::Sell, dec!(110000)),
                sl("BTC", OrderSide::Sell, dec!(100000)),
            ],
            Grouping::NormalTpsl,
        );

        let wires = assemble(&batch, &canon).unwrap();
        let prices: Vec<&str> = wires.iter().map(|w| w.limit_px.as_str()).collect();
        assert_eq!(prices, vec!["105000", "110000", "100000"]);
        assert!(!wires[0].reduce_only);
        assert!(wires[1].reduce_only && wires[2].reduce_only);
    }

    #[test]
    fn test_assemble_fails_whole_batch_on_bad_leg() {
        let book: InstrumentBook = [Instrument::perp("BTC", 0, 5)].into_iter().collect();
        let canon = Canonicalizer::new(&book, dec!(0.05));
        let batch = OrderBatch::independent(vec![
            primary(),
            OrderIntent::limit("BTC", OrderSide::Buy, Size::new(dec!(0.000001)), Price::new(dec!(1))),
        ]);
        assert!(matches!(
            assemble(&batch, &canon),
            Err(SignError::InvalidQuantity(_))
        ));
    }
}
