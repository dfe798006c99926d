//! Canonicalization of trader intents into exchange wire actions.
//!
//! Names become asset indices, prices and sizes become normalized decimal
//! strings, and order kinds become the tagged `t` structure.

use hlsign_core::{
    format_wire_decimal, ClientOrderId, InstrumentBook, OrderBatch, OrderIntent, OrderKind,
    OrderSide, Size,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::batch;
use crate::error::{SignError, SignResult};
use crate::wire::{
    BatchModifyAction, BuilderInfo, CancelAction, CancelByCloidAction, CancelByCloidWire,
    CancelWire, L1Action, ModifyWire, OrderAction, OrderRef, OrderTypeWire, OrderWire,
    TriggerOrderType, TwapCancelAction, TwapOrderAction, TwapWire, UpdateIsolatedMarginAction,
    UpdateLeverageAction,
};

/// USD amounts on L1 actions are integers scaled by 10^6.
pub const USD_DECIMALS: u32 = 6;
/// HYPE staking amounts are integers scaled by 10^8.
pub const HYPE_DECIMALS: u32 = 8;
/// USD amounts on user-signed transfers are decimal strings with cents precision.
pub const USD_TRANSFER_DECIMALS: u32 = 2;

/// Cancel target, identified either by exchange order id or client order id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "lowercase")]
pub enum CancelRequest {
    Oid { instrument: String, oid: u64 },
    Cloid {
        instrument: String,
        cloid: ClientOrderId,
    },
}

impl CancelRequest {
    pub fn by_oid(instrument: impl Into<String>, oid: u64) -> Self {
        Self::Oid {
            instrument: instrument.into(),
            oid,
        }
    }

    pub fn by_cloid(instrument: impl Into<String>, cloid: ClientOrderId) -> Self {
        Self::Cloid {
            instrument: instrument.into(),
            cloid,
        }
    }
}

/// Replace an existing order with `order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyRequest {
    pub target: OrderRef,
    pub order: OrderIntent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwapRequest {
    pub instrument: String,
    pub side: OrderSide,
    pub size: Size,
    pub minutes: u32,
    pub reduce_only: bool,
    pub randomize: bool,
}

/// Turns intents into `L1Action`s against one metadata snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Canonicalizer<'a> {
    book: &'a InstrumentBook,
    slippage: Decimal,
}

impl<'a> Canonicalizer<'a> {
    /// `slippage` is the fraction applied to market order reference prices.
    pub fn new(book: &'a InstrumentBook, slippage: Decimal) -> Self {
        Self { book, slippage }
    }

    pub fn book(&self) -> &InstrumentBook {
        self.book
    }

    /// Normalize one order intent into its wire form.
    pub fn order_wire(&self, intent: &OrderIntent) -> SignResult<OrderWire> {
        let inst = self.book.get(&intent.instrument)?;
        let size = inst.normalize_size(intent.size)?;

        let (limit_px, order_type) = match intent.kind {
            OrderKind::Limit { tif } => (
                inst.normalize_price(intent.price, intent.side)?,
                OrderTypeWire::limit(tif.as_str()),
            ),
            OrderKind::Market => (
                inst.market_price(intent.price, intent.side, self.slippage)?,
                OrderTypeWire::ioc(),
            ),
            OrderKind::Trigger {
                tpsl,
                trigger_px,
                is_market,
            } => {
                let trigger_px = inst.normalize_price(trigger_px, intent.side)?;
                // A market trigger without a limit is bounded by slippage off the trigger.
                let limit_px = if is_market && intent.price.is_zero() {
                    inst.market_price(trigger_px, intent.side, self.slippage)?
                } else {
                    inst.normalize_price(intent.price, intent.side)?
                };
                (
                    limit_px,
                    OrderTypeWire::Trigger {
                        trigger: TriggerOrderType {
                            is_market,
                            trigger_px: trigger_px.to_wire(),
                            tpsl: tpsl.as_str().to_string(),
                        },
                    },
                )
            }
        };

        Ok(OrderWire {
            asset: inst.asset,
            is_buy: intent.side.is_buy(),
            limit_px: limit_px.to_wire(),
            sz: size.to_wire(),
            reduce_only: intent.reduce_only,
            order_type,
            cloid: intent.cloid,
        })
    }

    /// `order` action for a validated batch. Grouping appears exactly once.
    pub fn order_action(
        &self,
        batch: &OrderBatch,
        builder: Option<BuilderInfo>,
    ) -> SignResult<L1Action> {
        let orders = batch::assemble(batch, self)?;
        Ok(L1Action::Order(OrderAction {
            orders,
            grouping: batch.grouping,
            builder,
        }))
    }

    /// One `cancel` and/or one `cancelByCloid` action, in that order.
    ///
    /// Each entry keeps the identification mode the caller chose.
    pub fn cancel_actions(&self, requests: &[CancelRequest]) -> SignResult<Vec<L1Action>> {
        if requests.is_empty() {
            return Err(SignError::InvalidInput("empty cancel request".to_string()));
        }

        let mut by_oid = Vec::new();
        let mut by_cloid = Vec::new();
        for request in requests {
            match request {
                CancelRequest::Oid { instrument, oid } => by_oid.push(CancelWire {
                    asset: self.book.get(instrument)?.asset,
                    oid: *oid,
                }),
                CancelRequest::Cloid { instrument, cloid } => by_cloid.push(CancelByCloidWire {
                    asset: self.book.get(instrument)?.asset,
                    cloid: *cloid,
                }),
            }
        }

        let mut actions = Vec::with_capacity(2);
        if !by_oid.is_empty() {
            actions.push(L1Action::Cancel(CancelAction { cancels: by_oid }));
        }
        if !by_cloid.is_empty() {
            actions.push(L1Action::CancelByCloid(CancelByCloidAction { cancels: by_cloid }));
        }
        Ok(actions)
    }

    pub fn modify_action(&self, requests: &[ModifyRequest]) -> SignResult<L1Action> {
        if requests.is_empty() {
            return Err(SignError::InvalidInput("empty modify request".to_string()));
        }
        let modifies = requests
            .iter()
            .map(|m| {
                Ok(ModifyWire {
                    oid: m.target,
                    order: self.order_wire(&m.order)?,
                })
            })
            .collect::<SignResult<Vec<_>>>()?;
        Ok(L1Action::BatchModify(BatchModifyAction { modifies }))
    }

    pub fn update_leverage(
        &self,
        instrument: &str,
        leverage: u32,
        is_cross: bool,
    ) -> SignResult<L1Action> {
        if leverage == 0 {
            return Err(SignError::InvalidQuantity("leverage must be at least 1".to_string()));
        }
        Ok(L1Action::UpdateLeverage(UpdateLeverageAction {
            asset: self.book.get(instrument)?.asset,
            is_cross,
            leverage,
        }))
    }

    /// Add (positive) or remove (negative) isolated margin in USD.
    pub fn update_isolated_margin(
        &self,
        instrument: &str,
        usd: Decimal,
        is_buy: bool,
    ) -> SignResult<L1Action> {
        Ok(L1Action::UpdateIsolatedMargin(UpdateIsolatedMarginAction {
            asset: self.book.get(instrument)?.asset,
            is_buy,
            ntli: scale_usd_exact(usd)?,
        }))
    }

    pub fn twap_order(&self, request: &TwapRequest) -> SignResult<L1Action> {
        let inst = self.book.get(&request.instrument)?;
        if request.minutes == 0 {
            return Err(SignError::InvalidQuantity("twap duration must be positive".to_string()));
        }
        let size = inst.normalize_size(request.size)?;
        Ok(L1Action::TwapOrder(TwapOrderAction {
            twap: TwapWire {
                a: inst.asset,
                b: request.side.is_buy(),
                s: size.to_wire(),
                r: request.reduce_only,
                m: request.minutes,
                t: request.randomize,
            },
        }))
    }

    pub fn twap_cancel(&self, instrument: &str, twap_id: u64) -> SignResult<L1Action> {
        Ok(L1Action::TwapCancel(TwapCancelAction {
            a: self.book.get(instrument)?.asset,
            t: twap_id,
        }))
    }
}

/// USD to 10^6 units; the amount must be exactly representable.
pub fn scale_usd_exact(usd: Decimal) -> SignResult<i64> {
    let scaled = scale(usd, USD_DECIMALS)?;
    if !scaled.fract().is_zero() {
        return Err(SignError::InvalidQuantity(format!(
            "{usd} is not representable at {USD_DECIMALS} decimals"
        )));
    }
    if scaled.is_zero() {
        return Err(SignError::InvalidQuantity("margin amount is zero".to_string()));
    }
    scaled
        .to_i64()
        .ok_or_else(|| SignError::InvalidQuantity(format!("{usd} out of range")))
}

/// Positive decimal to integer units, truncating below `decimals`.
pub fn scale_to_units(amount: Decimal, decimals: u32) -> SignResult<u64> {
    let scaled = scale(amount, decimals)?.trunc();
    if scaled <= Decimal::ZERO {
        return Err(SignError::InvalidQuantity(format!(
            "{amount} is below one unit at {decimals} decimals"
        )));
    }
    scaled
        .to_u64()
        .ok_or_else(|| SignError::InvalidQuantity(format!("{amount} out of range")))
}

/// `amount * 10^decimals`, or `InvalidQuantity` when it does not fit.
fn scale(amount: Decimal, decimals: u32) -> SignResult<Decimal> {
    (0..decimals)
        .try_fold(amount, |acc, _| acc.checked_mul(Decimal::TEN))
        .ok_or_else(|| {
            SignError::InvalidQuantity(format!("{amount} out of range at {decimals} decimals"))
        })
}

/// Token amount as a wire string, truncated to `decimals`.
pub fn format_token_amount(amount: Decimal, decimals: u32) -> SignResult<String> {
    let truncated = amount.round_dp_with_strategy(decimals, RoundingStrategy::ToZero);
    if truncated <= Decimal::ZERO {
        return Err(SignError::InvalidQuantity(format!(
            "{amount} is below the smallest transferable unit"
        )));
    }
    Ok(format_wire_decimal(truncated))
}

/// Fee rate fraction as the percentage string the exchange signs, e.g.
/// `0.0001` -> `"0.010%"`.
pub fn format_fee_rate(rate: Decimal) -> SignResult<String> {
    if rate.is_sign_negative() || rate > Decimal::ONE {
        return Err(SignError::InvalidQuantity(format!("fee rate {rate} out of range")));
    }
    let percent = (rate * Decimal::ONE_HUNDRED).round_dp(3);
    Ok(format!("{percent:.3}%"))
}
