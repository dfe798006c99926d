//! Action hash and phantom-agent domain separation for L1 actions.
//!
//! Two-stage signing input:
//! 1. `action_hash = keccak256(msgpack(action) ‖ nonce ‖ vault tag ‖ expires tag)`
//! 2. EIP-712 `Agent { source, connectionId: action_hash }` in the "Exchange" domain

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{keccak256, Address, B256};
use alloy::sol;
use alloy::sol_types::{eip712_domain, Eip712Domain, SolStruct};
use serde::{Deserialize, Serialize};

use crate::encoder;
use crate::error::{SignError, SignResult};
use crate::wire::L1Action;

/// EIP-712 domain constants for L1 actions.
pub const EIP712_DOMAIN_NAME: &str = "Exchange";
pub const EIP712_DOMAIN_VERSION: &str = "1";
pub const EIP712_CHAIN_ID: u64 = 1337;
pub const EIP712_VERIFYING_CONTRACT: Address = Address::ZERO;

/// Target network. Selects the phantom-agent source and the chain name
/// carried by user-signed actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
}

impl Network {
    pub fn is_mainnet(&self) -> bool {
        matches!(self, Self::Mainnet)
    }

    /// Phantom agent source: "a" on mainnet, "b" on testnet.
    pub fn source(&self) -> &'static str {
        match self {
            Self::Mainnet => "a",
            Self::Testnet => "b",
        }
    }

    /// `hyperliquidChain` value for user-signed actions.
    pub fn chain_name(&self) -> &'static str {
        match self {
            Self::Mainnet => "Mainnet",
            Self::Testnet => "Testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = SignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            other => Err(SignError::InvalidInput(format!("unknown network: {other}"))),
        }
    }
}

/// Hash over already-encoded action bytes.
///
/// - vault: `0x00` when absent, `0x01 ‖ address` when present
/// - expiration: nothing when absent, `0x00 ‖ expires_be` when present
pub fn action_hash(
    encoded_action: &[u8],
    nonce: u64,
    vault_address: Option<Address>,
    expires_after: Option<u64>,
) -> B256 {
    let mut data = Vec::with_capacity(encoded_action.len() + 8 + 21 + 9);
    data.extend_from_slice(encoded_action);
    data.extend_from_slice(&nonce.to_be_bytes());

    match vault_address {
        None => data.push(0x00),
        Some(addr) => {
            data.push(0x01);
            data.extend_from_slice(addr.as_slice());
        }
    }

    if let Some(expires) = expires_after {
        data.push(0x00);
        data.extend_from_slice(&expires.to_be_bytes());
    }

    keccak256(&data)
}

/// Signing input for an L1 action.
#[derive(Debug, Clone, Copy)]
pub struct SigningInput<'a> {
    pub action: &'a L1Action,
    pub nonce: u64,
    /// None = trading for the signer itself, Some = vault or sub-account
    pub vault_address: Option<Address>,
    pub expires_after: Option<u64>,
}

impl SigningInput<'_> {
    /// # Errors
    /// Returns `SignError::Encoding` if msgpack serialization fails.
    pub fn action_hash(&self) -> SignResult<B256> {
        let bytes = encoder::encode(self.action)?;
        Ok(action_hash(
            &bytes,
            self.nonce,
            self.vault_address,
            self.expires_after,
        ))
    }
}

sol! {
    #[derive(Debug)]
    struct Agent {
        string source;
        bytes32 connectionId;
    }
}

/// Domain for phantom-agent signatures.
pub fn l1_domain() -> Eip712Domain {
    eip712_domain! {
        name: EIP712_DOMAIN_NAME,
        version: EIP712_DOMAIN_VERSION,
        chain_id: EIP712_CHAIN_ID,
        verifying_contract: EIP712_VERIFYING_CONTRACT,
    }
}

/// EIP-712 signing target wrapping an action hash.
#[derive(Debug, Clone)]
pub struct PhantomAgent {
    pub source: &'static str,
    pub connection_id: B256,
}

impl PhantomAgent {
    pub fn new(action_hash: B256, network: Network) -> Self {
        Self {
            source: network.source(),
            connection_id: action_hash,
        }
    }

    /// `keccak256(0x1901 ‖ domain_separator ‖ struct_hash)`
    pub fn signing_hash(&self) -> B256 {
        let agent = Agent {
            source: self.source.to_string(),
            connectionId: self.connection_id,
        };
        agent.eip712_signing_hash(&l1_domain())
    }
}
