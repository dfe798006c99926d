//! Subcommands and their translation into engine calls.

use alloy::primitives::Address;
use clap::{Args, Subcommand, ValueEnum};
use hlsign_core::{
    ClientOrderId, Grouping, OrderBatch, OrderIntent, OrderSide, Price, Size, TimeInForce, Tpsl,
};
use hlsign_signer::{
    CancelRequest, Clock, RequestOptions, SignedRequest, SigningEngine, SigningIdentity,
};
use rust_decimal::Decimal;

use crate::error::CliResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SideArg {
    Buy,
    Sell,
}

impl From<SideArg> for OrderSide {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Buy => Self::Buy,
            SideArg::Sell => Self::Sell,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Sign an order, optionally with attached TP/SL legs
    Order(OrderArgs),
    /// Sign a cancel by order id or client order id
    Cancel(CancelArgs),
    /// Sign a leverage update
    Leverage(LeverageArgs),
    /// Sign a USDC transfer to another account
    UsdSend(UsdSendArgs),
    /// Print the signer address
    Address,
}

#[derive(Debug, Clone, Args)]
pub struct OrderArgs {
    #[arg(long)]
    pub instrument: String,
    #[arg(long, value_enum)]
    pub side: SideArg,
    #[arg(long)]
    pub size: Decimal,
    /// Limit price, or reference price with --market (0 sends a zero limit)
    #[arg(long, default_value = "0")]
    pub price: Decimal,
    /// IOC priced off --price plus the configured slippage
    #[arg(long)]
    pub market: bool,
    /// Gtc, Ioc or Alo
    #[arg(long, default_value = "Gtc")]
    pub tif: TimeInForce,
    #[arg(long)]
    pub reduce_only: bool,
    #[arg(long)]
    pub cloid: Option<ClientOrderId>,
    /// Take-profit trigger price (adds a reduce-only leg)
    #[arg(long)]
    pub tp: Option<Decimal>,
    /// Stop-loss trigger price (adds a reduce-only leg)
    #[arg(long)]
    pub sl: Option<Decimal>,
}

impl OrderArgs {
    /// Primary order first, then TP and SL legs on the opposite side.
    pub fn to_batch(&self) -> OrderBatch {
        let side = OrderSide::from(self.side);
        let size = Size::new(self.size);
        let price = Price::new(self.price);

        let mut primary = if self.market {
            OrderIntent::market(&self.instrument, side, size, price)
        } else {
            OrderIntent::limit(&self.instrument, side, size, price).with_tif(self.tif)
        }
        .with_reduce_only(self.reduce_only);
        if let Some(cloid) = self.cloid {
            primary = primary.with_cloid(cloid);
        }

        let legs: Vec<OrderIntent> = [(Tpsl::Tp, self.tp), (Tpsl::Sl, self.sl)]
            .into_iter()
            .filter_map(|(tpsl, px)| {
                px.map(|px| {
                    OrderIntent::trigger(
                        &self.instrument,
                        side.opposite(),
                        size,
                        Price::new(px),
                        tpsl,
                        Price::new(px),
                        true,
                    )
                })
            })
            .collect();

        if legs.is_empty() {
            OrderBatch::independent(vec![primary])
        } else {
            let mut orders = vec![primary];
            orders.extend(legs);
            OrderBatch::new(orders, Grouping::NormalTpsl)
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct CancelArgs {
    #[arg(long)]
    pub instrument: String,
    #[arg(long, required_unless_present = "cloid", conflicts_with = "cloid")]
    pub oid: Option<u64>,
    #[arg(long)]
    pub cloid: Option<ClientOrderId>,
}

impl CancelArgs {
    pub fn to_request(&self) -> CancelRequest {
        match (self.oid, self.cloid) {
            (Some(oid), _) => CancelRequest::by_oid(&self.instrument, oid),
            (None, Some(cloid)) => CancelRequest::by_cloid(&self.instrument, cloid),
            // clap guarantees one of the two
            (None, None) => CancelRequest::by_oid(&self.instrument, 0),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct LeverageArgs {
    #[arg(long)]
    pub instrument: String,
    #[arg(long)]
    pub leverage: u32,
    /// Isolated margin instead of cross
    #[arg(long)]
    pub isolated: bool,
}

#[derive(Debug, Clone, Args)]
pub struct UsdSendArgs {
    #[arg(long)]
    pub destination: Address,
    #[arg(long)]
    pub amount: Decimal,
}

/// Result of one subcommand.
#[derive(Debug)]
pub enum CommandOutput {
    Signed(Vec<SignedRequest>),
    Address(Address),
}

pub fn execute<C: Clock + Clone>(
    command: &Command,
    engine: &SigningEngine<C>,
    identity: &SigningIdentity,
    opts: &RequestOptions,
) -> CliResult<CommandOutput> {
    let signed = match command {
        Command::Order(args) => vec![engine.place_batch(identity, &args.to_batch(), opts)?],
        Command::Cancel(args) => engine.cancel(identity, &[args.to_request()], opts)?,
        Command::Leverage(args) => vec![engine.update_leverage(
            identity,
            &args.instrument,
            args.leverage,
            !args.isolated,
            opts,
        )?],
        Command::UsdSend(args) => vec![engine.usd_send(identity, args.destination, args.amount)?],
        Command::Address => return Ok(CommandOutput::Address(identity.address())),
    };
    Ok(CommandOutput::Signed(signed))
}
