//! EIP-712 domain for RFQ order signing.
//!
//! The domain binds a signature to one settlement contract on one chain. The
//! verifying contract recomputes the separator on-chain, so the fields set here
//! must match what the contract was deployed with, bit for bit.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Deserializer, Serialize};

use super::typed_data::{self, Value, EIP712_DOMAIN_TYPE};
use crate::address::normalize_address;
use crate::{Error, Result};

/// Chain ID for Ethereum mainnet.
pub const MAINNET_CHAIN_ID: u64 = 1;

/// Default domain name used when none is configured.
pub const DEFAULT_DOMAIN_NAME: &str = "OPYN RFQ";

/// Default domain version used when none is configured.
pub const DEFAULT_DOMAIN_VERSION: &str = "1";

/// EIP-712 domain. Absent fields are left out of the separator entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_chain_id"
    )]
    pub chain_id: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_address"
    )]
    pub verifying_contract: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<B256>,
}

impl Eip712Domain {
    /// Empty domain; add fields with the `with_*` builders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Domain for the RFQ settlement contract with the default name/version.
    pub fn rfq_settlement(chain_id: u64, settlement: Address) -> Self {
        Self::new()
            .with_name(DEFAULT_DOMAIN_NAME)
            .with_version(DEFAULT_DOMAIN_VERSION)
            .with_chain_id(chain_id)
            .with_verifying_contract(settlement)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn with_verifying_contract(mut self, verifying_contract: Address) -> Self {
        self.verifying_contract = Some(verifying_contract);
        self
    }

    pub fn with_salt(mut self, salt: B256) -> Self {
        self.salt = Some(salt);
        self
    }

    /// Present fields as `(name, type, value)`, in canonical EIP-712 order.
    pub fn fields(&self) -> Vec<(&'static str, &'static str, Value)> {
        let candidates = [
            ("name", "string", self.name.clone().map(Value::String)),
            ("version", "string", self.version.clone().map(Value::String)),
            (
                "chainId",
                "uint256",
                self.chain_id.map(|id| Value::Uint(U256::from(id))),
            ),
            (
                "verifyingContract",
                "address",
                self.verifying_contract.map(Value::Address),
            ),
            ("salt", "bytes32", self.salt.map(Value::from)),
        ];

        candidates
            .into_iter()
            .filter_map(|(name, ty, value)| value.map(|v| (name, ty, v)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.version.is_none()
            && self.chain_id.is_none()
            && self.verifying_contract.is_none()
            && self.salt.is_none()
    }

    /// Fails with [`Error::InvalidDomain`] when no field is set.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidDomain {
                message: "at least one of name, version, chainId, verifyingContract or salt must be set"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// `EIP712Domain(...)` type string for the present fields.
    pub fn encode_type(&self) -> String {
        let members: Vec<String> = self
            .fields()
            .iter()
            .map(|(name, ty, _)| format!("{ty} {name}"))
            .collect();
        format!("{}({})", EIP712_DOMAIN_TYPE, members.join(","))
    }

    /// Compute the EIP-712 domain separator hash.
    pub fn separator(&self) -> Result<B256> {
        self.validate()?;
        typed_data::hash_domain(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChainIdRepr {
    Number(u64),
    Text(String),
}

fn deserialize_chain_id<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(repr) = Option::<ChainIdRepr>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match repr {
        ChainIdRepr::Number(id) => Ok(Some(id)),
        ChainIdRepr::Text(text) => {
            let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                Some(hex_digits) => u64::from_str_radix(hex_digits, 16),
                None => text.parse(),
            };
            parsed
                .map(Some)
                .map_err(|e| serde::de::Error::custom(format!("invalid chainId {text:?}: {e}")))
        }
    }
}

fn deserialize_address<'de, D>(deserializer: D) -> std::result::Result<Option<Address>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| normalize_address(&raw).map_err(serde::de::Error::custom))
        .transpose()
}
