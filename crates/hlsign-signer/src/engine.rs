//! Signing engine.
//!
//! Runs the full pipeline for every supported action:
//! intent -> canonical action -> msgpack -> action hash -> phantom agent ->
//! signature, or for user-signed actions intent -> typed data -> signature.
//!
//! Validation always completes before a signature is produced. Nonces are
//! drawn per signer address from a shared [`NonceRegistry`]; engines built
//! with [`SigningEngine::new`] all use the process-wide one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, B256};
use hlsign_core::{InstrumentBook, OrderBatch, OrderIntent};
use rust_decimal::Decimal;
use tracing::debug;

use crate::canonical::{
    format_fee_rate, format_token_amount, scale_to_units, CancelRequest, Canonicalizer,
    ModifyRequest, TwapRequest, HYPE_DECIMALS, USD_DECIMALS, USD_TRANSFER_DECIMALS,
};
use crate::error::{SignError, SignResult};
use crate::hash::{Network, PhantomAgent, SigningInput};
use crate::nonce::{Clock, NonceRegistry, SystemClock};
use crate::request::SignedRequest;
use crate::signer::SigningIdentity;
use crate::wire::{
    ApproveAgent, ApproveBuilderFee, BuilderInfo, EvmUserModifyAction, L1Action,
    ReserveRequestWeightAction, ScheduleCancelAction, SendAsset, SetReferrerAction, SpotSend,
    StakingTransfer, TokenDelegate, UsdClassTransfer, UsdSend, UserAction, VaultTransferAction,
    Withdraw3, SIGNATURE_CHAIN_ID,
};

/// Slippage applied to market orders unless configured otherwise (5%).
pub const DEFAULT_SLIPPAGE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Receives one event per signed or rejected request.
pub trait SigningObserver: Send + Sync {
    fn on_signed(&self, action_type: &'static str, elapsed: Duration);
    fn on_rejected(&self, reason: &'static str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SigningObserver for NoopObserver {
    fn on_signed(&self, _action_type: &'static str, _elapsed: Duration) {}
    fn on_rejected(&self, _reason: &'static str) {}
}

/// Per-request options for L1 actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Trade on behalf of a vault or sub-account.
    pub vault_address: Option<Address>,
    /// Exchange rejects the request after this time (ms).
    pub expires_after: Option<u64>,
    /// Only used by order placement.
    pub builder: Option<BuilderInfo>,
}

impl RequestOptions {
    pub fn with_vault(mut self, vault_address: Address) -> Self {
        self.vault_address = Some(vault_address);
        self
    }

    pub fn with_expires_after(mut self, expires_after: u64) -> Self {
        self.expires_after = Some(expires_after);
        self
    }

    pub fn with_builder(mut self, builder: BuilderInfo) -> Self {
        self.builder = Some(builder);
        self
    }
}

/// Parameters of a `sendAsset` transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAssetRequest {
    pub destination: Address,
    /// `""` for the perp dex, `"spot"` for spot.
    pub source_dex: String,
    pub destination_dex: String,
    /// `NAME:tokenId`
    pub token: String,
    pub amount: Decimal,
    /// Token wei decimals; the amount is truncated to this precision.
    pub token_decimals: u32,
    pub from_sub_account: Option<Address>,
}

/// Pipeline façade. Cheap to share behind an `Arc`; all methods take `&self`.
pub struct SigningEngine<C: Clock + Clone = SystemClock> {
    book: InstrumentBook,
    network: Network,
    nonces: Arc<NonceRegistry<C>>,
    observer: Arc<dyn SigningObserver>,
    slippage: Decimal,
}

impl SigningEngine<SystemClock> {
    pub fn new(book: InstrumentBook, network: Network) -> Self {
        Self::with_nonces(book, network, NonceRegistry::global())
    }
}

impl<C: Clock + Clone> SigningEngine<C> {
    /// Engine drawing nonces from an existing registry.
    pub fn with_nonces(
        book: InstrumentBook,
        network: Network,
        nonces: Arc<NonceRegistry<C>>,
    ) -> Self {
        Self {
            book,
            network,
            nonces,
            observer: Arc::new(NoopObserver),
            slippage: DEFAULT_SLIPPAGE,
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SigningObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn with_slippage(mut self, slippage: Decimal) -> Self {
        self.slippage = slippage;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn book(&self) -> &InstrumentBook {
        &self.book
    }

    pub fn slippage(&self) -> Decimal {
        self.slippage
    }

    pub fn nonces(&self) -> &Arc<NonceRegistry<C>> {
        &self.nonces
    }

    /// Align the nonce counter of `address` with the exchange clock.
    pub fn sync_nonces(&self, address: Address, server_time_ms: u64) -> SignResult<()> {
        Ok(self.nonces.sync_with_server(address, server_time_ms)?)
    }

    fn canonicalizer(&self) -> Canonicalizer<'_> {
        Canonicalizer::new(&self.book, self.slippage)
    }

    // =========================================================================
    // Generic signing
    // =========================================================================

    /// Sign an L1 action with a freshly issued nonce.
    pub fn sign_l1(
        &self,
        identity: &SigningIdentity,
        action: L1Action,
        opts: &RequestOptions,
    ) -> SignResult<SignedRequest> {
        let nonce = self.nonces.next(identity.address());
        self.sign_l1_at(identity, action, nonce, opts)
    }

    /// Sign an L1 action with a caller-chosen nonce.
    pub fn sign_l1_at(
        &self,
        identity: &SigningIdentity,
        action: L1Action,
        nonce: u64,
        opts: &RequestOptions,
    ) -> SignResult<SignedRequest> {
        let start = Instant::now();
        let input = SigningInput {
            action: &action,
            nonce,
            vault_address: opts.vault_address,
            expires_after: opts.expires_after,
        };
        let signed = input.action_hash().and_then(|hash| {
            let digest = PhantomAgent::new(hash, self.network).signing_hash();
            Ok((digest, identity.sign_hash(&digest)?))
        });
        let (digest, signature) = self.checked(signed)?;

        let request = SignedRequest::new(
            action.into(),
            nonce,
            signature,
            opts.vault_address,
            opts.expires_after,
            digest,
        );
        self.record_signed(identity, &request, start);
        Ok(request)
    }

    /// Sign a user action as EIP-712 typed data. The request nonce is the
    /// action's own time/nonce field.
    pub fn sign_user(
        &self,
        identity: &SigningIdentity,
        action: UserAction,
    ) -> SignResult<SignedRequest> {
        let start = Instant::now();
        let digest: B256 = action.signing_hash();
        let signature = self.checked(identity.sign_hash(&digest))?;

        let nonce = action.nonce();
        let request = SignedRequest::new(action.into(), nonce, signature, None, None, digest);
        self.record_signed(identity, &request, start);
        Ok(request)
    }

    fn checked<T>(&self, result: SignResult<T>) -> SignResult<T> {
        if let Err(e) = &result {
            debug!(reason = e.reason(), error = %e, "request rejected");
            self.observer.on_rejected(e.reason());
        }
        result
    }

    fn record_signed(&self, identity: &SigningIdentity, request: &SignedRequest, start: Instant) {
        let action_type = request.action.action_type();
        debug!(
            action = action_type,
            nonce = request.nonce,
            signer = %identity.address(),
            vault = ?request.vault_address,
            "signed request"
        );
        self.observer.on_signed(action_type, start.elapsed());
    }

    // =========================================================================
    // Orders
    // =========================================================================

    pub fn place_order(
        &self,
        identity: &SigningIdentity,
        intent: OrderIntent,
        opts: &RequestOptions,
    ) -> SignResult<SignedRequest> {
        self.place_batch(identity, &OrderBatch::independent(vec![intent]), opts)
    }

    /// Validate, normalize and sign a batch as one `order` action.
    pub fn place_batch(
        &self,
        identity: &SigningIdentity,
        batch: &OrderBatch,
        opts: &RequestOptions,
    ) -> SignResult<SignedRequest> {
        let action = self.checked(self.canonicalizer().order_action(batch, opts.builder))?;
        self.sign_l1(identity, action, opts)
    }

    /// One signed request per identification mode present in `requests`.
    pub fn cancel(
        &self,
        identity: &SigningIdentity,
        requests: &[CancelRequest],
        opts: &RequestOptions,
    ) -> SignResult<Vec<SignedRequest>> {
        let actions = self.checked(self.canonicalizer().cancel_actions(requests))?;
        actions
            .into_iter()
            .map(|action| self.sign_l1(identity, action, opts))
            .collect()
    }

    pub fn modify(
        &self,
        identity: &SigningIdentity,
        requests: &[ModifyRequest],
        opts: &RequestOptions,
    ) -> SignResult<SignedRequest> {
        let action = self.checked(self.canonicalizer().modify_action(requests))?;
        self.sign_l1(identity, action, opts)
    }

    /// Arm the dead-man switch at `time`, or clear it with `None`.
    pub fn schedule_cancel(
        &self,
        identity: &SigningIdentity,
        time: Option<u64>,
        opts: &RequestOptions,
    ) -> SignResult<SignedRequest> {
        self.sign_l1(
            identity,
            L1Action::ScheduleCancel(ScheduleCancelAction { time }),
            opts,
        )
    }

    // =========================================================================
    // Account actions
    // =========================================================================

    pub fn update_leverage(
        &self,
        identity: &SigningIdentity,
        instrument: &str,
        leverage: u32,
        is_cross: bool,
        opts: &RequestOptions,
    ) -> SignResult<SignedRequest> {
        let action =
            self.checked(self.canonicalizer().update_leverage(instrument, leverage, is_cross))?;
        self.sign_l1(identity, action, opts)
    }

    pub fn update_isolated_margin(
        &self,
        identity: &SigningIdentity,
        instrument: &str,
        usd: Decimal,
        is_buy: bool,
        opts: &RequestOptions,
    ) -> SignResult<SignedRequest> {
        let action =
            self.checked(self.canonicalizer().update_isolated_margin(instrument, usd, is_buy))?;
        self.sign_l1(identity, action, opts)
    }

    pub fn vault_transfer(
        &self,
        identity: &SigningIdentity,
        vault_address: Address,
        is_deposit: bool,
        usd: Decimal,
        opts: &RequestOptions,
    ) -> SignResult<SignedRequest> {
        let usd = self.checked(scale_to_units(usd, USD_DECIMALS))?;
        self.sign_l1(
            identity,
            L1Action::VaultTransfer(VaultTransferAction {
                vault_address,
                is_deposit,
                usd,
            }),
            opts,
        )
    }

    pub fn twap_order(
        &self,
        identity: &SigningIdentity,
        request: &TwapRequest,
        opts: &RequestOptions,
    ) -> SignResult<SignedRequest> {
        let action = self.checked(self.canonicalizer().twap_order(request))?;
        self.sign_l1(identity, action, opts)
    }

    pub fn twap_cancel(
        &self,
        identity: &SigningIdentity,
        instrument: &str,
        twap_id: u64,
        opts: &RequestOptions,
    ) -> SignResult<SignedRequest> {
        let action = self.checked(self.canonicalizer().twap_cancel(instrument, twap_id))?;
        self.sign_l1(identity, action, opts)
    }

    pub fn set_referrer(
        &self,
        identity: &SigningIdentity,
        code: &str,
        opts: &RequestOptions,
    ) -> SignResult<SignedRequest> {
        if code.trim().is_empty() {
            return self.checked(Err(SignError::InvalidInput(
                "referrer code is empty".to_string(),
            )));
        }
        self.sign_l1(
            identity,
            L1Action::SetReferrer(SetReferrerAction {
                code: code.to_string(),
            }),
            opts,
        )
    }

    pub fn reserve_request_weight(
        &self,
        identity: &SigningIdentity,
        weight: u64,
        opts: &RequestOptions,
    ) -> SignResult<SignedRequest> {
        self.sign_l1(
            identity,
            L1Action::ReserveRequestWeight(ReserveRequestWeightAction { weight }),
            opts,
        )
    }

    pub fn evm_user_modify(
        &self,
        identity: &SigningIdentity,
        using_big_blocks: bool,
        opts: &RequestOptions,
    ) -> SignResult<SignedRequest> {
        self.sign_l1(
            identity,
            L1Action::EvmUserModify(EvmUserModifyAction { using_big_blocks }),
            opts,
        )
    }

    // =========================================================================
    // User-signed actions
    // =========================================================================

    fn chain(&self) -> (String, String) {
        (
            SIGNATURE_CHAIN_ID.to_string(),
            self.network.chain_name().to_string(),
        )
    }

    pub fn usd_send(
        &self,
        identity: &SigningIdentity,
        destination: Address,
        amount: Decimal,
    ) -> SignResult<SignedRequest> {
        let amount = self.checked(format_token_amount(amount, USD_TRANSFER_DECIMALS))?;
        let (signature_chain_id, hyperliquid_chain) = self.chain();
        let action = UserAction::UsdSend(UsdSend {
            signature_chain_id,
            hyperliquid_chain,
            destination: format!("{destination:#x}"),
            amount,
            time: self.nonces.next(identity.address()),
        });
        self.sign_user(identity, action)
    }

    /// `token` is `NAME:tokenId`; `wei_decimals` is the token's precision.
    pub fn spot_send(
        &self,
        identity: &SigningIdentity,
        destination: Address,
        token: &str,
        amount: Decimal,
        wei_decimals: u32,
    ) -> SignResult<SignedRequest> {
        let amount = self.checked(format_token_amount(amount, wei_decimals))?;
        let (signature_chain_id, hyperliquid_chain) = self.chain();
        let action = UserAction::SpotSend(SpotSend {
            signature_chain_id,
            hyperliquid_chain,
            destination: format!("{destination:#x}"),
            token: token.to_string(),
            amount,
            time: self.nonces.next(identity.address()),
        });
        self.sign_user(identity, action)
    }

    /// Withdraw USDC through the bridge.
    pub fn withdraw(
        &self,
        identity: &SigningIdentity,
        destination: Address,
        amount: Decimal,
    ) -> SignResult<SignedRequest> {
        let amount = self.checked(format_token_amount(amount, USD_TRANSFER_DECIMALS))?;
        let (signature_chain_id, hyperliquid_chain) = self.chain();
        let action = UserAction::Withdraw3(Withdraw3 {
            signature_chain_id,
            hyperliquid_chain,
            destination: format!("{destination:#x}"),
            amount,
            time: self.nonces.next(identity.address()),
        });
        self.sign_user(identity, action)
    }

    /// Move USDC between the spot and perp balances.
    pub fn usd_class_transfer(
        &self,
        identity: &SigningIdentity,
        amount: Decimal,
        to_perp: bool,
    ) -> SignResult<SignedRequest> {
        let amount = self.checked(format_token_amount(amount, USD_TRANSFER_DECIMALS))?;
        let (signature_chain_id, hyperliquid_chain) = self.chain();
        let action = UserAction::UsdClassTransfer(UsdClassTransfer {
            signature_chain_id,
            hyperliquid_chain,
            amount,
            to_perp,
            nonce: self.nonces.next(identity.address()),
        });
        self.sign_user(identity, action)
    }

    pub fn send_asset(
        &self,
        identity: &SigningIdentity,
        request: &SendAssetRequest,
    ) -> SignResult<SignedRequest> {
        let amount = self.checked(format_token_amount(request.amount, request.token_decimals))?;
        let (signature_chain_id, hyperliquid_chain) = self.chain();
        let action = UserAction::SendAsset(SendAsset {
            signature_chain_id,
            hyperliquid_chain,
            destination: format!("{:#x}", request.destination),
            source_dex: request.source_dex.clone(),
            destination_dex: request.destination_dex.clone(),
            token: request.token.clone(),
            amount,
            from_sub_account: request
                .from_sub_account
                .map(|a| format!("{a:#x}"))
                .unwrap_or_default(),
            nonce: self.nonces.next(identity.address()),
        });
        self.sign_user(identity, action)
    }

    /// Stake HYPE from the spot balance.
    pub fn staking_deposit(
        &self,
        identity: &SigningIdentity,
        amount: Decimal,
    ) -> SignResult<SignedRequest> {
        let transfer = self.staking_transfer(identity, amount)?;
        self.sign_user(identity, UserAction::CDeposit(transfer))
    }

    pub fn staking_withdraw(
        &self,
        identity: &SigningIdentity,
        amount: Decimal,
    ) -> SignResult<SignedRequest> {
        let transfer = self.staking_transfer(identity, amount)?;
        self.sign_user(identity, UserAction::CWithdraw(transfer))
    }

    fn staking_transfer(
        &self,
        identity: &SigningIdentity,
        amount: Decimal,
    ) -> SignResult<StakingTransfer> {
        let wei = self.checked(scale_to_units(amount, HYPE_DECIMALS))?;
        let (signature_chain_id, hyperliquid_chain) = self.chain();
        Ok(StakingTransfer {
            signature_chain_id,
            hyperliquid_chain,
            wei,
            nonce: self.nonces.next(identity.address()),
        })
    }

    pub fn token_delegate(
        &self,
        identity: &SigningIdentity,
        validator: Address,
        amount: Decimal,
        is_undelegate: bool,
    ) -> SignResult<SignedRequest> {
        let wei = self.checked(scale_to_units(amount, HYPE_DECIMALS))?;
        let (signature_chain_id, hyperliquid_chain) = self.chain();
        let action = UserAction::TokenDelegate(TokenDelegate {
            signature_chain_id,
            hyperliquid_chain,
            validator,
            wei,
            is_undelegate,
            nonce: self.nonces.next(identity.address()),
        });
        self.sign_user(identity, action)
    }

    /// Authorize `agent` to sign L1 actions for this account.
    pub fn approve_agent(
        &self,
        identity: &SigningIdentity,
        agent: Address,
        name: Option<&str>,
    ) -> SignResult<SignedRequest> {
        let (signature_chain_id, hyperliquid_chain) = self.chain();
        let action = UserAction::ApproveAgent(ApproveAgent {
            signature_chain_id,
            hyperliquid_chain,
            agent_address: agent,
            agent_name: name.map(str::to_string),
            nonce: self.nonces.next(identity.address()),
        });
        self.sign_user(identity, action)
    }

    /// `max_fee_rate` is a fraction: `0.0001` allows 0.01%.
    pub fn approve_builder_fee(
        &self,
        identity: &SigningIdentity,
        builder: Address,
        max_fee_rate: Decimal,
    ) -> SignResult<SignedRequest> {
        let max_fee_rate = self.checked(format_fee_rate(max_fee_rate))?;
        let (signature_chain_id, hyperliquid_chain) = self.chain();
        let action = UserAction::ApproveBuilderFee(ApproveBuilderFee {
            signature_chain_id,
            hyperliquid_chain,
            max_fee_rate,
            builder,
            nonce: self.nonces.next(identity.address()),
        });
        self.sign_user(identity, action)
    }
}
