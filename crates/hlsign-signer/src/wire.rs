//! Exchange wire types.
//!
//! Field declaration order is the msgpack key order, and the action hash
//! depends on it. Optional fields must carry `skip_serializing_if`: a `None`
//! encoded as nil hashes differently from an absent key.

use alloy::primitives::Address;
use hlsign_core::{ClientOrderId, Grouping};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Hex chain id carried by every user-signed action.
pub const SIGNATURE_CHAIN_ID: &str = "0x66eee";

/// Serialize an address as lowercase `0x` hex.
pub fn serialize_address<S: Serializer>(addr: &Address, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{addr:#x}"))
}

pub fn deserialize_address<'de, D: Deserializer<'de>>(d: D) -> Result<Address, D::Error> {
    let raw = String::deserialize(d)?;
    raw.parse().map_err(serde::de::Error::custom)
}

pub fn serialize_address_opt<S: Serializer>(
    addr: &Option<Address>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match addr {
        Some(addr) => serialize_address(addr, s),
        None => s.serialize_none(),
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Order wire format `{a, b, p, s, r, t, c?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWire {
    /// Asset index
    #[serde(rename = "a")]
    pub asset: u32,

    #[serde(rename = "b")]
    pub is_buy: bool,

    /// Limit price as decimal string
    #[serde(rename = "p")]
    pub limit_px: String,

    /// Size as decimal string
    #[serde(rename = "s")]
    pub sz: String,

    #[serde(rename = "r")]
    pub reduce_only: bool,

    #[serde(rename = "t")]
    pub order_type: OrderTypeWire,

    #[serde(rename = "c", skip_serializing_if = "Option::is_none", default)]
    pub cloid: Option<ClientOrderId>,
}

/// Order type wire format.
///
/// - Limit: `{"limit": {"tif": "Gtc"|"Ioc"|"Alo"}}`
/// - Trigger: `{"trigger": {"isMarket", "triggerPx", "tpsl"}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderTypeWire {
    Limit { limit: LimitOrderType },
    Trigger { trigger: TriggerOrderType },
}

impl OrderTypeWire {
    pub fn limit(tif: &str) -> Self {
        Self::Limit {
            limit: LimitOrderType {
                tif: tif.to_string(),
            },
        }
    }

    pub fn ioc() -> Self {
        Self::limit("Ioc")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrderType {
    pub tif: String,
}

/// Trigger order type. Key order is isMarket, triggerPx, tpsl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerOrderType {
    #[serde(rename = "isMarket")]
    pub is_market: bool,

    #[serde(rename = "triggerPx")]
    pub trigger_px: String,

    pub tpsl: String,
}

/// Builder fee share `{b, f}`; `f` is in tenths of a basis point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderInfo {
    #[serde(
        rename = "b",
        serialize_with = "serialize_address",
        deserialize_with = "deserialize_address"
    )]
    pub address: Address,
    #[serde(rename = "f")]
    pub fee: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAction {
    pub orders: Vec<OrderWire>,
    pub grouping: Grouping,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub builder: Option<BuilderInfo>,
}

// =============================================================================
// Cancels and modifies
// =============================================================================

/// `{a, o}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelWire {
    #[serde(rename = "a")]
    pub asset: u32,
    #[serde(rename = "o")]
    pub oid: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelAction {
    pub cancels: Vec<CancelWire>,
}

/// `{asset, cloid}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelByCloidWire {
    pub asset: u32,
    pub cloid: ClientOrderId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelByCloidAction {
    pub cancels: Vec<CancelByCloidWire>,
}

/// Existing order reference: numeric order id or client order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderRef {
    Oid(u64),
    Cloid(ClientOrderId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyWire {
    pub oid: OrderRef,
    pub order: OrderWire,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchModifyAction {
    pub modifies: Vec<ModifyWire>,
}

/// Dead-man switch; no `time` clears the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleCancelAction {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub time: Option<u64>,
}

// =============================================================================
// Account actions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeverageAction {
    pub asset: u32,
    pub is_cross: bool,
    pub leverage: u32,
}

/// `ntli` is USD scaled by 10^6; negative removes margin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIsolatedMarginAction {
    pub asset: u32,
    pub is_buy: bool,
    pub ntli: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultTransferAction {
    #[serde(
        serialize_with = "serialize_address",
        deserialize_with = "deserialize_address"
    )]
    pub vault_address: Address,
    pub is_deposit: bool,
    /// USD scaled by 10^6
    pub usd: u64,
}

/// `{a, b, s, r, m, t}`: asset, is buy, size, reduce only, minutes, randomize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwapWire {
    pub a: u32,
    pub b: bool,
    pub s: String,
    pub r: bool,
    pub m: u32,
    pub t: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwapOrderAction {
    pub twap: TwapWire,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwapCancelAction {
    pub a: u32,
    pub t: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetReferrerAction {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveRequestWeightAction {
    pub weight: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmUserModifyAction {
    pub using_big_blocks: bool,
}

/// Actions signed through the phantom agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum L1Action {
    Order(OrderAction),
    Cancel(CancelAction),
    CancelByCloid(CancelByCloidAction),
    BatchModify(BatchModifyAction),
    ScheduleCancel(ScheduleCancelAction),
    UpdateLeverage(UpdateLeverageAction),
    UpdateIsolatedMargin(UpdateIsolatedMarginAction),
    VaultTransfer(VaultTransferAction),
    TwapOrder(TwapOrderAction),
    TwapCancel(TwapCancelAction),
    SetReferrer(SetReferrerAction),
    ReserveRequestWeight(ReserveRequestWeightAction),
    EvmUserModify(EvmUserModifyAction),
}

impl L1Action {
    /// Exchange `type` tag.
    pub fn action_type(&self) -> &'static str {
        match self {
            Self::Order(_) => "order",
            Self::Cancel(_) => "cancel",
            Self::CancelByCloid(_) => "cancelByCloid",
            Self::BatchModify(_) => "batchModify",
            Self::ScheduleCancel(_) => "scheduleCancel",
            Self::UpdateLeverage(_) => "updateLeverage",
            Self::UpdateIsolatedMargin(_) => "updateIsolatedMargin",
            Self::VaultTransfer(_) => "vaultTransfer",
            Self::TwapOrder(_) => "twapOrder",
            Self::TwapCancel(_) => "twapCancel",
            Self::SetReferrer(_) => "setReferrer",
            Self::ReserveRequestWeight(_) => "reserveRequestWeight",
            Self::EvmUserModify(_) => "evmUserModify",
        }
    }
}

// =============================================================================
// User-signed actions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdSend {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
    pub destination: String,
    pub amount: String,
    pub time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotSend {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
    pub destination: String,
    /// `NAME:tokenId`
    pub token: String,
    pub amount: String,
    pub time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdraw3 {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
    pub destination: String,
    pub amount: String,
    pub time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdClassTransfer {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
    pub amount: String,
    pub to_perp: bool,
    pub nonce: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendAsset {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
    pub destination: String,
    pub source_dex: String,
    pub destination_dex: String,
    pub token: String,
    pub amount: String,
    /// Empty when sending from the master account.
    pub from_sub_account: String,
    pub nonce: u64,
}

/// Staking deposit/withdraw; `wei` is HYPE scaled by 10^8.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingTransfer {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
    pub wei: u64,
    pub nonce: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDelegate {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
    #[serde(
        serialize_with = "serialize_address",
        deserialize_with = "deserialize_address"
    )]
    pub validator: Address,
    pub wei: u64,
    pub is_undelegate: bool,
    pub nonce: u64,
}

/// The name is signed as `""` when absent but left out of the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveAgent {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
    #[serde(
        serialize_with = "serialize_address",
        deserialize_with = "deserialize_address"
    )]
    pub agent_address: Address,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub agent_name: Option<String>,
    pub nonce: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveBuilderFee {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
    /// Percentage string, e.g. `"0.010%"`.
    pub max_fee_rate: String,
    #[serde(
        serialize_with = "serialize_address",
        deserialize_with = "deserialize_address"
    )]
    pub builder: Address,
    pub nonce: u64,
}

/// Actions signed directly as EIP-712 typed data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UserAction {
    UsdSend(UsdSend),
    SpotSend(SpotSend),
    Withdraw3(Withdraw3),
    UsdClassTransfer(UsdClassTransfer),
    SendAsset(SendAsset),
    CDeposit(StakingTransfer),
    CWithdraw(StakingTransfer),
    TokenDelegate(TokenDelegate),
    ApproveAgent(ApproveAgent),
    ApproveBuilderFee(ApproveBuilderFee),
}

impl UserAction {
    pub fn action_type(&self) -> &'static str {
        match self {
            Self::UsdSend(_) => "usdSend",
            Self::SpotSend(_) => "spotSend",
            Self::Withdraw3(_) => "withdraw3",
            Self::UsdClassTransfer(_) => "usdClassTransfer",
            Self::SendAsset(_) => "sendAsset",
            Self::CDeposit(_) => "cDeposit",
            Self::CWithdraw(_) => "cWithdraw",
            Self::TokenDelegate(_) => "tokenDelegate",
            Self::ApproveAgent(_) => "approveAgent",
            Self::ApproveBuilderFee(_) => "approveBuilderFee",
        }
    }

    /// The time/nonce field, which doubles as the request nonce.
    pub fn nonce(&self) -> u64 {
        match self {
            Self::UsdSend(a) => a.time,
            Self::SpotSend(a) => a.time,
            Self::Withdraw3(a) => a.time,
            Self::UsdClassTransfer(a) => a.nonce,
            Self::SendAsset(a) => a.nonce,
            Self::CDeposit(a) | Self::CWithdraw(a) => a.nonce,
            Self::TokenDelegate(a) => a.nonce,
            Self::ApproveAgent(a) => a.nonce,
            Self::ApproveBuilderFee(a) => a.nonce,
        }
    }
}

/// Any action the engine can sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    L1(L1Action),
    User(UserAction),
}

impl Action {
    pub fn action_type(&self) -> &'static str {
        match self {
            Self::L1(a) => a.action_type(),
            Self::User(a) => a.action_type(),
        }
    }
}

impl From<L1Action> for Action {
    fn from(a: L1Action) -> Self {
        Self::L1(a)
    }
}

impl From<UserAction> for Action {
    fn from(a: UserAction) -> Self {
        Self::User(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_type_wire_serialization() {
        let json = serde_json::to_string(&OrderTypeWire::ioc()).unwrap();
        assert_eq!(json, r#"{"limit":{"tif":"Ioc"}}"#);

        let trigger = OrderTypeWire::Trigger {
            trigger: TriggerOrderType {
                is_market: true,
                trigger_px: "110000".to_string(),
                tpsl: "tp".to_string(),
            },
        };
        let json = serde_json::to_string(&trigger).unwrap();
        assert_eq!(
            json,
            r#"{"trigger":{"isMarket":true,"triggerPx":"110000","tpsl":"tp"}}"#
        );
    }

    #[test]
    fn test_order_action_skips_absent_builder() {
        let action = L1Action::Order(OrderAction {
            orders: vec![],
            grouping: Grouping::Na,
            builder: None,
        });
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"type":"order","orders":[],"grouping":"na"}"#);
    }

    #[test]
    fn test_builder_address_lowercase() {
        let builder = BuilderInfo {
            address: "0xABCDEF0000000000000000000000000000000001".parse().unwrap(),
            fee: 10,
        };
        let json = serde_json::to_string(&builder).unwrap();
        assert_eq!(
            json,
            r#"{"b":"0xabcdef0000000000000000000000000000000001","f":10}"#
        );
    }

    #[test]
    fn test_schedule_cancel_omits_time() {
        let clear = L1Action::ScheduleCancel(ScheduleCancelAction { time: None });
        assert_eq!(
            serde_json::to_string(&clear).unwrap(),
            r#"{"type":"scheduleCancel"}"#
        );
    }

    #[test]
    fn test_modify_oid_preserves_identification_mode() {
        let by_oid = serde_json::to_string(&OrderRef::Oid(42)).unwrap();
        assert_eq!(by_oid, "42");
        let by_cloid = serde_json::to_string(&OrderRef::Cloid(ClientOrderId::from_u128(1))).unwrap();
        assert_eq!(by_cloid, r#""0x00000000000000000000000000000001""#);
    }

    #[test]
    fn test_user_action_type_tags() {
        let action = UserAction::CDeposit(StakingTransfer {
            signature_chain_id: SIGNATURE_CHAIN_ID.to_string(),
            hyperliquid_chain: "Testnet".to_string(),
            wei: 100_000_000,
            nonce: 7,
        });
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.starts_with(r#"{"type":"cDeposit","signatureChainId":"0x66eee""#));
        assert_eq!(action.nonce(), 7);
    }

    #[test]
    fn test_approve_agent_omits_absent_name() {
        let action = UserAction::ApproveAgent(ApproveAgent {
            signature_chain_id: SIGNATURE_CHAIN_ID.to_string(),
            hyperliquid_chain: "Mainnet".to_string(),
            agent_address: Address::repeat_byte(0x11),
            agent_name: None,
            nonce: 1,
        });
        let json = serde_json::to_string(&action).unwrap();
        assert!(!json.contains("agentName"));
        assert!(json.contains(r#""agentAddress":"0x1111111111111111111111111111111111111111""#));
    }
}
