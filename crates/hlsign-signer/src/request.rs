//! Signed request handed to the transport layer.

use alloy::primitives::{Address, B256};
use serde::Serialize;

use crate::error::{SignError, SignResult};
use crate::signer::SignatureTriplet;
use crate::wire::{serialize_address_opt, Action};

/// Exchange request body:
/// `{"action", "nonce", "signature": {"r","s","v"}, "vaultAddress"?, "expiresAfter"?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedRequest {
    pub action: Action,
    pub nonce: u64,
    pub signature: SignatureTriplet,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_address_opt"
    )]
    pub vault_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_after: Option<u64>,
    /// Digest the signature covers. Not part of the body.
    #[serde(skip)]
    digest: B256,
}

impl SignedRequest {
    pub(crate) fn new(
        action: Action,
        nonce: u64,
        signature: SignatureTriplet,
        vault_address: Option<Address>,
        expires_after: Option<u64>,
        digest: B256,
    ) -> Self {
        Self {
            action,
            nonce,
            signature,
            vault_address,
            expires_after,
            digest,
        }
    }

    pub fn digest(&self) -> B256 {
        self.digest
    }

    /// Address recovered from the signature over [`Self::digest`].
    pub fn recover_signer(&self) -> SignResult<Address> {
        self.signature.recover_address(&self.digest)
    }

    /// JSON body with the action's field order preserved.
    pub fn to_json(&self) -> SignResult<String> {
        serde_json::to_string(self).map_err(|e| SignError::Encoding(e.to_string()))
    }

    pub fn to_value(&self) -> SignResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| SignError::Encoding(e.to_string()))
    }
}
