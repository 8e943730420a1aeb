//! Signing identity for RFQ orders.
//!
//! A [`Wallet`] wraps either a secp256k1 private key (and its derived address)
//! or a bare public address. Public-only wallets can check addresses and
//! signatures but every signing call fails with [`Error::MissingPrivateKey`].

use std::str::FromStr;

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::TxSignerSync;
use alloy_primitives::{Address, Signature, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use tracing::debug;

use crate::address::{checksum, normalize_address};
use crate::{Error, Result};

/// Ethereum's offset between the raw recovery id (0/1) and `v`.
const V_OFFSET: u8 = 27;

/// Render a 256-bit value as `0x` followed by exactly 64 hex digits.
pub fn hex_zero_pad(value: U256) -> String {
    format!("0x{}", hex::encode(value.to_be_bytes::<32>()))
}

/// An ECDSA signature split into `v` (27 or 28), `r` and `s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureParts {
    pub v: u8,
    pub r: U256,
    pub s: U256,
}

impl SignatureParts {
    pub fn from_signature(signature: &Signature) -> Self {
        Self {
            v: V_OFFSET + signature.v() as u8,
            r: signature.r(),
            s: signature.s(),
        }
    }

    /// Parse `v`, `r` and `s` as received over the wire.
    ///
    /// `r` and `s` may be any hex width up to 32 bytes; they are re-padded on
    /// output.
    pub fn from_parts(v: u8, r: &str, s: &str) -> Result<Self> {
        if v != V_OFFSET && v != V_OFFSET + 1 {
            return Err(Error::Signing {
                message: format!("v must be 27 or 28, got {v}"),
            });
        }
        Ok(Self {
            v,
            r: parse_word(r)?,
            s: parse_word(s)?,
        })
    }

    pub fn r_hex(&self) -> String {
        hex_zero_pad(self.r)
    }

    pub fn s_hex(&self) -> String {
        hex_zero_pad(self.s)
    }

    pub fn to_signature(&self) -> Result<Signature> {
        let y_parity = match self.v {
            27 => false,
            28 => true,
            other => {
                return Err(Error::Signing {
                    message: format!("v must be 27 or 28, got {other}"),
                })
            }
        };
        Ok(Signature::new(self.r, self.s, y_parity))
    }

    /// Recover the address that produced this signature over `digest`.
    pub fn recover_address(&self, digest: &B256) -> Result<Address> {
        self.to_signature()?
            .recover_address_from_prehash(digest)
            .map_err(|e| Error::Signing {
                message: format!("signature recovery failed: {e}"),
            })
    }
}

fn parse_word(raw: &str) -> Result<U256> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() || digits.len() > 64 {
        return Err(Error::Signing {
            message: format!("invalid signature component {raw:?}"),
        });
    }
    U256::from_str_radix(digits, 16).map_err(|e| Error::Signing {
        message: format!("invalid signature component {raw:?}: {e}"),
    })
}

/// A signing identity: private key plus derived address, or address only.
#[derive(Clone)]
pub struct Wallet {
    signer: Option<PrivateKeySigner>,
    address: Address,
}

impl Wallet {
    /// Create a wallet from an optional public address and optional private key.
    ///
    /// At least one must be given. When both are given the address must be
    /// the one derived from the key.
    pub fn new(public_address: Option<&str>, private_key: Option<&str>) -> Result<Self> {
        match (public_address, private_key) {
            (None, None) => Err(Error::Construction {
                message: "can't create a wallet without a public or private key".to_string(),
            }),
            (Some(public), None) => Self::from_address(public),
            (public, Some(key)) => {
                let wallet = Self::from_private_key(key)?;
                if let Some(public) = public {
                    let declared = normalize_address(public)?;
                    if declared != wallet.address {
                        return Err(Error::Construction {
                            message: format!(
                                "public address {} does not match private key address {}",
                                checksum(&declared),
                                wallet.address_string()
                            ),
                        });
                    }
                }
                Ok(wallet)
            }
        }
    }

    /// Load from `WALLET_PRIVATE_KEY` and/or `WALLET_ADDRESS`.
    pub fn from_env() -> Result<Self> {
        let private_key = std::env::var("WALLET_PRIVATE_KEY").ok();
        let address = std::env::var("WALLET_ADDRESS").ok();
        Self::new(address.as_deref(), private_key.as_deref()).map_err(|e| match e {
            Error::Construction { .. } if private_key.is_none() && address.is_none() => {
                Error::Construction {
                    message: "WALLET_PRIVATE_KEY or WALLET_ADDRESS environment variable not set"
                        .to_string(),
                }
            }
            other => other,
        })
    }

    /// Create a wallet from a hex-encoded private key.
    ///
    /// # Arguments
    ///
    /// * `key` - A 64-character hex string, optionally prefixed with "0x"
    pub fn from_private_key(key: &str) -> Result<Self> {
        let key_clean = key.trim().trim_start_matches("0x");

        let signer = PrivateKeySigner::from_str(key_clean).map_err(|e| Error::Construction {
            message: format!("invalid private key format, expected 64 hex characters: {e}"),
        })?;

        Ok(Self::from_signer(signer))
    }

    pub fn from_signer(signer: PrivateKeySigner) -> Self {
        let address = signer.address();
        Self {
            signer: Some(signer),
            address,
        }
    }

    /// Verification-only wallet.
    pub fn from_address(address: &str) -> Result<Self> {
        Ok(Self {
            signer: None,
            address: normalize_address(address)?,
        })
    }

    /// Fresh random keypair.
    pub fn random() -> Self {
        Self::from_signer(PrivateKeySigner::random())
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the wallet address as a checksummed hex string.
    pub fn address_string(&self) -> String {
        checksum(&self.address)
    }

    pub fn can_sign(&self) -> bool {
        self.signer.is_some()
    }

    fn signer(&self) -> Result<&PrivateKeySigner> {
        self.signer.as_ref().ok_or(Error::MissingPrivateKey)
    }

    /// Sign a 32-byte digest, returning `v` in Ethereum's 27/28 convention.
    pub fn sign(&self, digest: &B256) -> Result<SignatureParts> {
        let signature = self
            .signer()?
            .sign_hash_sync(digest)
            .map_err(|e| Error::Signing {
                message: format!("failed to sign digest: {e}"),
            })?;

        debug!(address = %self.address, digest = %digest, "Signed digest");
        Ok(SignatureParts::from_signature(&signature))
    }

    /// Compare `candidate` with this wallet's address after normalization.
    pub fn verify_address_matches(&self, candidate: &str) -> Result<bool> {
        Ok(normalize_address(candidate)? == self.address)
    }

    /// Whether `signature` over `digest` was produced by this wallet.
    pub fn verify_signature(&self, digest: &B256, signature: &SignatureParts) -> bool {
        signature
            .recover_address(digest)
            .map(|recovered| recovered == self.address)
            .unwrap_or(false)
    }

    /// Sign a legacy transaction and return its raw EIP-2718 encoding.
    pub fn sign_transaction(&self, mut tx: TxLegacy) -> Result<Vec<u8>> {
        let signature = self
            .signer()?
            .sign_transaction_sync(&mut tx)
            .map_err(|e| Error::Signing {
                message: format!("failed to sign transaction: {e}"),
            })?;

        let envelope = TxEnvelope::from(tx.into_signed(signature));
        Ok(envelope.encoded_2718())
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the private key in debug output
        f.debug_struct("Wallet")
            .field("address", &self.address_string())
            .field("can_sign", &self.can_sign())
            .finish()
    }
}
