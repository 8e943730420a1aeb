//! Collaborators for the RFQ flow: ERC-20 token, settlement contract and relayer.
//!
//! The traits are what the allowance and settlement helpers consume. Concrete
//! implementations talk JSON-RPC ([`RpcClient`]) and HTTP ([`RelayerClient`]).
//! Failures from any of them are returned unchanged; nothing here retries.

pub mod approvals;
pub mod erc20;
pub mod relayer;
pub mod rpc;
pub mod settlement;

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::signing::{OrderData, Wallet};
use crate::Result;

pub use approvals::{allow_more, verify_allowance, MIN_ALLOWANCE};
pub use erc20::Erc20Token;
pub use relayer::{RelayerClient, API_KEY_HEADER};
pub use rpc::RpcClient;
pub use settlement::{settle_trade, SettlementContract};

/// Read/write access to one ERC-20 token.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TokenLedger: Send + Sync {
    /// Token contract address.
    fn address(&self) -> Address;

    /// Raw allowance granted by `owner` to `spender`, in base units.
    async fn get_allowance(&self, owner: Address, spender: Address) -> Result<U256>;

    /// Number of decimals of the token.
    async fn decimals(&self) -> Result<u8>;

    /// Approve `spender` for `amount` base units, signed by `owner`.
    async fn approve(&self, owner: &Wallet, spender: Address, amount: U256) -> Result<B256>;
}

/// The RFQ settlement contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SettlementLedger: Send + Sync {
    /// Settlement contract address; the allowance spender and EIP-712 verifying contract.
    fn address(&self) -> Address;

    /// Submit `settleRfq(bid_order, seller_order)` from `submitter`.
    async fn settle(
        &self,
        submitter: &Wallet,
        bid_order: &OrderData,
        seller_order: &OrderData,
    ) -> Result<B256>;
}

/// The off-chain RFQ relayer.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RelayerService: Send + Sync {
    async fn get_auction_status(&self, auction_id: &str) -> Result<AuctionStatus>;

    /// Signed order of the counterparty matched with `bid_id` in the auction.
    async fn get_counterparty_signature(&self, auction_id: &str, bid_id: U256) -> Result<OrderData>;
}

/// Auction status as reported by the relayer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionStatus {
    pub auction_id: String,
    pub status: String,
}
