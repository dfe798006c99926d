//! EIP-712 hashing for user-signed actions.
//!
//! Primary types are named `HyperliquidTransaction:<Name>`. The colon is not a
//! valid Solidity identifier, so the type string and struct hash are encoded
//! here directly instead of through `sol!`.

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::sol_types::{eip712_domain, Eip712Domain};

use crate::wire::UserAction;

pub const USER_DOMAIN_NAME: &str = "HyperliquidSignTransaction";
pub const USER_DOMAIN_VERSION: &str = "1";
/// Chain id behind `signatureChainId = "0x66eee"`.
pub const USER_CHAIN_ID: u64 = 0x66eee;

const PRIMARY_TYPE_PREFIX: &str = "HyperliquidTransaction:";

/// One EIP-712 field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Str(String),
    U64(u64),
    Bool(bool),
    Address(Address),
}

impl TypedValue {
    fn solidity_type(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::U64(_) => "uint64",
            Self::Bool(_) => "bool",
            Self::Address(_) => "address",
        }
    }

    /// 32-byte `encodeData` word.
    fn encode(&self) -> B256 {
        match self {
            Self::Str(s) => keccak256(s.as_bytes()),
            Self::U64(n) => B256::from(U256::from(*n).to_be_bytes::<32>()),
            Self::Bool(b) => B256::from(U256::from(u8::from(*b)).to_be_bytes::<32>()),
            Self::Address(a) => a.into_word(),
        }
    }
}

/// Ordered `(name, value)` pairs of a typed struct.
pub type TypedFields = Vec<(&'static str, TypedValue)>;

/// Domain for user-signed actions.
pub fn user_domain() -> Eip712Domain {
    eip712_domain! {
        name: USER_DOMAIN_NAME,
        version: USER_DOMAIN_VERSION,
        chain_id: USER_CHAIN_ID,
        verifying_contract: Address::ZERO,
    }
}

/// `Name(type1 field1,type2 field2,...)`
pub fn encode_type(primary_type: &str, fields: &TypedFields) -> String {
    let members: Vec<String> = fields
        .iter()
        .map(|(name, value)| format!("{} {}", value.solidity_type(), name))
        .collect();
    format!("{primary_type}({})", members.join(","))
}

pub fn hash_struct(primary_type: &str, fields: &TypedFields) -> B256 {
    let mut data = Vec::with_capacity(32 * (fields.len() + 1));
    data.extend_from_slice(keccak256(encode_type(primary_type, fields).as_bytes()).as_slice());
    for (_, value) in fields {
        data.extend_from_slice(value.encode().as_slice());
    }
    keccak256(&data)
}

/// `keccak256(0x1901 ‖ domain_separator ‖ struct_hash)`
pub fn signing_hash(domain: &Eip712Domain, primary_type: &str, fields: &TypedFields) -> B256 {
    let mut data = Vec::with_capacity(66);
    data.extend_from_slice(&[0x19, 0x01]);
    data.extend_from_slice(domain.hash_struct().as_slice());
    data.extend_from_slice(hash_struct(primary_type, fields).as_slice());
    keccak256(&data)
}

impl UserAction {
    /// `HyperliquidTransaction:<Name>`
    pub fn primary_type(&self) -> String {
        let name = match self {
            Self::UsdSend(_) => "UsdSend",
            Self::SpotSend(_) => "SpotSend",
            Self::Withdraw3(_) => "Withdraw",
            Self::UsdClassTransfer(_) => "UsdClassTransfer",
            Self::SendAsset(_) => "SendAsset",
            Self::CDeposit(_) => "CDeposit",
            Self::CWithdraw(_) => "CWithdraw",
            Self::TokenDelegate(_) => "TokenDelegate",
            Self::ApproveAgent(_) => "ApproveAgent",
            Self::ApproveBuilderFee(_) => "ApproveBuilderFee",
        };
        format!("{PRIMARY_TYPE_PREFIX}{name}")
    }

    /// Signed fields in type order. `signatureChainId` and `type` are not signed.
    pub fn typed_fields(&self) -> TypedFields {
        use TypedValue::{Address as Addr, Bool, Str, U64};

        match self {
            Self::UsdSend(a) => vec![
                ("hyperliquidChain", Str(a.hyperliquid_chain.clone())),
                ("destination", Str(a.destination.clone())),
                ("amount", Str(a.amount.clone())),
                ("time", U64(a.time)),
            ],
            Self::SpotSend(a) => vec![
                ("hyperliquidChain", Str(a.hyperliquid_chain.clone())),
                ("destination", Str(a.destination.clone())),
                ("token", Str(a.token.clone())),
                ("amount", Str(a.amount.clone())),
                ("time", U64(a.time)),
            ],
            Self::Withdraw3(a) => vec![
                ("hyperliquidChain", Str(a.hyperliquid_chain.clone())),
                ("destination", Str(a.destination.clone())),
                ("amount", Str(a.amount.clone())),
                ("time", U64(a.time)),
            ],
            Self::UsdClassTransfer(a) => vec![
                ("hyperliquidChain", Str(a.hyperliquid_chain.clone())),
                ("amount", Str(a.amount.clone())),
                ("toPerp", Bool(a.to_perp)),
                ("nonce", U64(a.nonce)),
            ],
            Self::SendAsset(a) => vec![
                ("hyperliquidChain", Str(a.hyperliquid_chain.clone())),
                ("destination", Str(a.destination.clone())),
                ("sourceDex", Str(a.source_dex.clone())),
                ("destinationDex", Str(a.destination_dex.clone())),
                ("token", Str(a.token.clone())),
                ("amount", Str(a.amount.clone())),
                ("fromSubAccount", Str(a.from_sub_account.clone())),
                ("nonce", U64(a.nonce)),
            ],
            Self::CDeposit(a) | Self::CWithdraw(a) => vec![
                ("hyperliquidChain", Str(a.hyperliquid_chain.clone())),
                ("wei", U64(a.wei)),
                ("nonce", U64(a.nonce)),
            ],
            Self::TokenDelegate(a) => vec![
                ("hyperliquidChain", Str(a.hyperliquid_chain.clone())),
                ("validator", Addr(a.validator)),
                ("wei", U64(a.wei)),
                ("isUndelegate", Bool(a.is_undelegate)),
                ("nonce", U64(a.nonce)),
            ],
            Self::ApproveAgent(a) => vec![
                ("hyperliquidChain", Str(a.hyperliquid_chain.clone())),
                ("agentAddress", Addr(a.agent_address)),
                ("agentName", Str(a.agent_name.clone().unwrap_or_default())),
                ("nonce", U64(a.nonce)),
            ],
            Self::ApproveBuilderFee(a) => vec![
                ("hyperliquidChain", Str(a.hyperliquid_chain.clone())),
                ("maxFeeRate", Str(a.max_fee_rate.clone())),
                ("builder", Addr(a.builder)),
                ("nonce", U64(a.nonce)),
            ],
        }
    }

    /// Digest the signature is produced over.
    pub fn signing_hash(&self) -> B256 {
        signing_hash(&user_domain(), &self.primary_type(), &self.typed_fields())
    }
}
