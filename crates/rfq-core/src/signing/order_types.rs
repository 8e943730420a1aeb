//! Order types for Opyn RFQ signing.
//!
//! [`MessageToSign`] is the unsigned bid a trader commits to; [`OrderData`] is
//! the signed record handed to the relayer and the settlement contract.

use std::sync::LazyLock;

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use super::domain::Eip712Domain;
use super::typed_data::{Eip712Message, Types, Value};
use super::wallet::SignatureParts;
use crate::address::normalize_address;
use crate::Result;

/// Root struct name of the RFQ order.
pub const OPYN_RFQ_TYPE: &str = "OpynRfq";

/// EIP-712 definition of the RFQ order. The field order is fixed by the
/// settlement contract.
pub static MESSAGE_TYPES: LazyLock<Types> = LazyLock::new(|| {
    Types::new().with_struct(
        OPYN_RFQ_TYPE,
        &[
            ("bidId", "uint256"),
            ("trader", "address"),
            ("token", "address"),
            ("amount", "uint256"),
            ("nonce", "uint256"),
        ],
    )
});

/// Unsigned bid for an RFQ auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageToSign {
    #[serde(with = "u256_string")]
    pub bid_id: U256,
    /// Trader placing the bid; must be the signing wallet.
    #[serde(with = "address_checksum")]
    pub trader: Address,
    /// Token being bid with.
    #[serde(with = "address_checksum")]
    pub token: Address,
    /// Amount in token base units.
    #[serde(with = "u256_string")]
    pub amount: U256,
    /// Per-trader nonce tracked by the settlement contract.
    #[serde(with = "u256_string")]
    pub nonce: U256,
}

impl MessageToSign {
    pub fn new(bid_id: U256, trader: Address, token: Address, amount: U256, nonce: U256) -> Self {
        Self {
            bid_id,
            trader,
            token,
            amount,
            nonce,
        }
    }

    /// Build from address strings, normalizing both addresses.
    pub fn parse(bid_id: U256, trader: &str, token: &str, amount: U256, nonce: U256) -> Result<Self> {
        Ok(Self::new(
            bid_id,
            normalize_address(trader)?,
            normalize_address(token)?,
            amount,
            nonce,
        ))
    }
}

impl Eip712Message for MessageToSign {
    const PRIMARY_TYPE: &'static str = OPYN_RFQ_TYPE;

    fn types() -> &'static Types {
        &MESSAGE_TYPES
    }

    fn to_value(&self) -> Value {
        Value::record([
            ("bidId", Value::Uint(self.bid_id)),
            ("trader", Value::Address(self.trader)),
            ("token", Value::Address(self.token)),
            ("amount", Value::Uint(self.amount)),
            ("nonce", Value::Uint(self.nonce)),
        ])
    }
}

/// A signed RFQ order, ready for the relayer or settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    #[serde(with = "u256_string")]
    pub bid_id: U256,
    #[serde(with = "address_checksum")]
    pub trader: Address,
    #[serde(with = "address_checksum")]
    pub token: Address,
    #[serde(with = "u256_string")]
    pub amount: U256,
    /// 27 or 28.
    pub v: u8,
    /// `0x` + 64 hex digits.
    pub r: String,
    /// `0x` + 64 hex digits.
    pub s: String,
}

impl OrderData {
    /// Combine an order with its signature.
    pub fn from_message(message: &MessageToSign, signature: &SignatureParts) -> Self {
        Self {
            bid_id: message.bid_id,
            trader: message.trader,
            token: message.token,
            amount: message.amount,
            v: signature.v,
            r: signature.r_hex(),
            s: signature.s_hex(),
        }
    }

    /// Parse the signature fields, validating `v` and the hex width of `r`/`s`.
    pub fn signature(&self) -> Result<SignatureParts> {
        SignatureParts::from_parts(self.v, &self.r, &self.s)
    }

    /// Parse a signed order from JSON and normalize its signature.
    pub fn from_json(raw: &str) -> Result<Self> {
        let order: Self = serde_json::from_str(raw)?;
        order.normalized()
    }

    /// Re-render `r` and `s` at full 32-byte width after validating them.
    pub fn normalized(mut self) -> Result<Self> {
        let signature = self.signature()?;
        self.r = signature.r_hex();
        self.s = signature.s_hex();
        Ok(self)
    }

    /// `r` and `s` as 32-byte words.
    pub fn signature_words(&self) -> Result<(B256, B256)> {
        let signature = self.signature()?;
        Ok((
            B256::from(signature.r.to_be_bytes::<32>()),
            B256::from(signature.s.to_be_bytes::<32>()),
        ))
    }

    /// Recover the signer of this order.
    ///
    /// The nonce is not carried in the signed record, so the caller supplies it.
    pub fn recover_signer(&self, domain: &Eip712Domain, nonce: U256) -> Result<Address> {
        let message = MessageToSign::new(self.bid_id, self.trader, self.token, self.amount, nonce);
        let digest = message.signing_hash(domain)?;
        self.signature()?.recover_address(&digest)
    }
}

/// `U256` as a decimal string; accepts numbers, decimal or `0x` hex strings.
pub(crate) mod u256_string {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::signing::typed_data::json_u256;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        json_u256(&raw).map_err(serde::de::Error::custom)
    }
}

/// `Address` as an EIP-55 string; any valid input form is normalized.
pub(crate) mod address_checksum {
    use alloy_primitives::Address;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::address::{checksum, normalize_address};

    pub fn serialize<S: Serializer>(value: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&checksum(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let raw = String::deserialize(deserializer)?;
        normalize_address(&raw).map_err(serde::de::Error::custom)
    }
}
