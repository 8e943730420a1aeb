//! ERC-20 token reads and approvals over JSON-RPC.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256};
use tracing::info;

use super::rpc::{rpc_error, RpcClient};
use super::TokenLedger;
use crate::address::checksum;
use crate::signing::Wallet;
use crate::Result;

/// ERC-20 `allowance(address,address)` selector.
const ALLOWANCE_SELECTOR: [u8; 4] = [0xdd, 0x62, 0xed, 0x3e];

/// ERC-20 `decimals()` selector.
const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];

/// ERC-20 `approve(address,uint256)` selector.
const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// Build calldata for `allowance(owner, spender)`.
fn encode_allowance(owner: Address, spender: Address) -> Bytes {
    let mut data = Vec::with_capacity(68);
    data.extend_from_slice(&ALLOWANCE_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(owner.as_slice());
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(spender.as_slice());
    Bytes::from(data)
}

/// Build calldata for `approve(spender, amount)`.
fn encode_approve(spender: Address, amount: U256) -> Bytes {
    let mut data = Vec::with_capacity(68);
    data.extend_from_slice(&APPROVE_SELECTOR);
    // address left-padded to 32 bytes
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(spender.as_slice());
    data.extend_from_slice(&amount.to_be_bytes::<32>());
    Bytes::from(data)
}

/// Decode a single static return word.
fn decode_word(output: &[u8]) -> Result<U256> {
    if output.len() != 32 {
        return Err(rpc_error(format!(
            "expected a 32-byte return value, got {} bytes",
            output.len()
        )));
    }
    Ok(U256::from_be_slice(output))
}

/// An ERC-20 token reached through an [`RpcClient`].
#[derive(Debug, Clone)]
pub struct Erc20Token {
    rpc: Arc<RpcClient>,
    address: Address,
}

impl Erc20Token {
    pub fn new(rpc: Arc<RpcClient>, address: Address) -> Self {
        Self { rpc, address }
    }
}

#[async_trait::async_trait]
impl TokenLedger for Erc20Token {
    fn address(&self) -> Address {
        self.address
    }

    async fn get_allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        let output = self
            .rpc
            .eth_call(self.address, encode_allowance(owner, spender))
            .await?;
        decode_word(&output)
    }

    async fn decimals(&self) -> Result<u8> {
        let output = self
            .rpc
            .eth_call(self.address, Bytes::from(DECIMALS_SELECTOR.to_vec()))
            .await?;
        let word = decode_word(&output)?;
        u8::try_from(word).map_err(|_| rpc_error(format!("decimals out of range: {word}")))
    }

    async fn approve(&self, owner: &Wallet, spender: Address, amount: U256) -> Result<B256> {
        let tx_hash = self
            .rpc
            .send_transaction(
                owner,
                self.address,
                encode_approve(spender, amount),
                RpcClient::APPROVE_GAS_LIMIT,
            )
            .await?;

        info!(
            token = %checksum(&self.address),
            spender = %checksum(&spender),
            amount = %amount,
            tx_hash = %tx_hash,
            "ERC-20 approve tx sent"
        );

        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::keccak256;

    #[test]
    fn test_selectors_match_signatures() {
        assert_eq!(keccak256("allowance(address,address)")[..4], ALLOWANCE_SELECTOR);
        assert_eq!(keccak256("decimals()")[..4], DECIMALS_SELECTOR);
        assert_eq!(keccak256("approve(address,uint256)")[..4], APPROVE_SELECTOR);
    }

    #[test]
    fn test_encode_allowance_layout() {
        let owner = Address::repeat_byte(0x11);
        let spender = Address::repeat_byte(0x22);
        let data = encode_allowance(owner, spender);

        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &ALLOWANCE_SELECTOR);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], owner.as_slice());
        assert_eq!(&data[48..68], spender.as_slice());
    }

    #[test]
    fn test_encode_approve_layout() {
        let spender = Address::repeat_byte(0x22);
        let data = encode_approve(spender, U256::from(1_000_000u64));

        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &APPROVE_SELECTOR);
        assert_eq!(&data[16..36], spender.as_slice());
        assert_eq!(U256::from_be_slice(&data[36..68]), U256::from(1_000_000u64));
    }

    #[test]
    fn test_decode_word() {
        let mut word = [0u8; 32];
        word[31] = 6;
        assert_eq!(decode_word(&word).unwrap(), U256::from(6u64));
        assert!(decode_word(&word[..31]).is_err());
        assert!(decode_word(&[]).is_err());
    }
}
