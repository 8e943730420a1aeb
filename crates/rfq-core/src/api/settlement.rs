//! RFQ settlement contract calls.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::{sol, SolCall};
use tracing::{info, warn};

use super::rpc::RpcClient;
use super::{RelayerService, SettlementLedger};
use crate::address::checksum;
use crate::signing::{OrderData, Wallet};
use crate::{Error, Result};

sol! {
    /// Signed order as the settlement contract takes it.
    #[derive(Debug, PartialEq, Eq)]
    struct RfqOrder {
        uint256 bidId;
        address trader;
        address token;
        uint256 amount;
        uint8 v;
        bytes32 r;
        bytes32 s;
    }

    function settleRfq(RfqOrder bidOrder, RfqOrder sellerOrder);
}

impl TryFrom<&OrderData> for RfqOrder {
    type Error = Error;

    fn try_from(order: &OrderData) -> Result<Self> {
        let (r, s) = order.signature_words()?;
        Ok(Self {
            bidId: order.bid_id,
            trader: order.trader,
            token: order.token,
            amount: order.amount,
            v: order.v,
            r,
            s,
        })
    }
}

/// Calldata for `settleRfq(bidOrder, sellerOrder)`.
pub fn encode_settle_rfq(bid_order: &OrderData, seller_order: &OrderData) -> Result<Bytes> {
    let call = settleRfqCall {
        bidOrder: RfqOrder::try_from(bid_order)?,
        sellerOrder: RfqOrder::try_from(seller_order)?,
    };
    Ok(Bytes::from(call.abi_encode()))
}

/// The settlement contract reached through an [`RpcClient`].
#[derive(Debug, Clone)]
pub struct SettlementContract {
    rpc: Arc<RpcClient>,
    address: Address,
}

impl SettlementContract {
    pub fn new(rpc: Arc<RpcClient>, address: Address) -> Self {
        Self { rpc, address }
    }
}

#[async_trait::async_trait]
impl SettlementLedger for SettlementContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn settle(
        &self,
        submitter: &Wallet,
        bid_order: &OrderData,
        seller_order: &OrderData,
    ) -> Result<B256> {
        let input = encode_settle_rfq(bid_order, seller_order)?;
        self.rpc
            .send_transaction(submitter, self.address, input, RpcClient::SETTLE_GAS_LIMIT)
            .await
    }
}

/// Fetch the counterparty order for `bid_order` and settle both on-chain.
///
/// The counterparty order must be for the same bid; anything else is rejected
/// before a transaction is sent.
pub async fn settle_trade(
    relayer: &dyn RelayerService,
    settlement: &dyn SettlementLedger,
    wallet: &Wallet,
    auction_id: &str,
    bid_order: &OrderData,
) -> Result<B256> {
    let seller_order = relayer
        .get_counterparty_signature(auction_id, bid_order.bid_id)
        .await?;

    if seller_order.bid_id != bid_order.bid_id {
        warn!(
            auction_id = auction_id,
            expected = %bid_order.bid_id,
            received = %seller_order.bid_id,
            "Relayer returned counterparty order for a different bid"
        );
        return Err(Error::Relayer {
            message: format!(
                "counterparty order is for bid {}, expected {}",
                seller_order.bid_id, bid_order.bid_id
            ),
        });
    }

    let tx_hash = settlement.settle(wallet, bid_order, &seller_order).await?;

    info!(
        auction_id = auction_id,
        bid_id = %bid_order.bid_id,
        counterparty = %checksum(&seller_order.trader),
        settlement = %checksum(&settlement.address()),
        tx_hash = %tx_hash,
        "RFQ trade settled"
    );

    Ok(tx_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockRelayerService, MockSettlementLedger};
    use alloy_primitives::{keccak256, U256};

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn order(bid_id: u64, trader: Address) -> OrderData {
        OrderData {
            bid_id: U256::from(bid_id),
            trader,
            token: Address::repeat_byte(0x0a),
            amount: U256::from(1_000_000u64),
            v: 28,
            r: format!("0x{}", "11".repeat(32)),
            s: format!("0x{}", "22".repeat(32)),
        }
    }

    #[test]
    fn test_settle_rfq_calldata() {
        let bid = order(1, Address::repeat_byte(0x01));
        let seller = order(1, Address::repeat_byte(0x02));
        let data = encode_settle_rfq(&bid, &seller).unwrap();

        let selector = keccak256(
            "settleRfq((uint256,address,address,uint256,uint8,bytes32,bytes32),(uint256,address,address,uint256,uint8,bytes32,bytes32))",
        );
        assert_eq!(&data[..4], &selector[..4]);
        // Two static 7-word tuples, encoded in place.
        assert_eq!(data.len(), 4 + 14 * 32);
        assert_eq!(U256::from_be_slice(&data[4..36]), U256::from(1u64));
        assert_eq!(&data[48..68], Address::repeat_byte(0x01).as_slice());
        assert_eq!(data[4 + 5 * 32 - 1], 28);
        assert_eq!(&data[4 + 7 * 32 + 44..4 + 7 * 32 + 64], Address::repeat_byte(0x02).as_slice());
    }

    #[test]
    fn test_settle_rfq_rejects_bad_signature() {
        let mut bid = order(1, Address::repeat_byte(0x01));
        bid.r = "0xnothex".to_string();
        let seller = order(1, Address::repeat_byte(0x02));
        assert!(encode_settle_rfq(&bid, &seller).is_err());
    }

    #[tokio::test]
    async fn test_settle_trade_submits_both_orders() {
        let wallet = Wallet::from_private_key(TEST_KEY).unwrap();
        let bid = order(9, wallet.address());
        let seller = order(9, Address::repeat_byte(0x02));

        let mut relayer = MockRelayerService::new();
        let returned = seller.clone();
        relayer
            .expect_get_counterparty_signature()
            .withf(|auction_id, bid_id| auction_id == "42" && *bid_id == U256::from(9u64))
            .times(1)
            .returning(move |_, _| Ok(returned.clone()));

        let mut settlement = MockSettlementLedger::new();
        let expected_seller = seller.clone();
        settlement
            .expect_settle()
            .withf(move |_, bid_order, seller_order| {
                bid_order.bid_id == U256::from(9u64) && *seller_order == expected_seller
            })
            .times(1)
            .returning(|_, _, _| Ok(B256::repeat_byte(0xee)));
        settlement.expect_address().returning(|| Address::repeat_byte(0x5f));

        let tx_hash = settle_trade(&relayer, &settlement, &wallet, "42", &bid)
            .await
            .unwrap();
        assert_eq!(tx_hash, B256::repeat_byte(0xee));
    }

    #[tokio::test]
    async fn test_settle_trade_rejects_other_bid() {
        let wallet = Wallet::from_private_key(TEST_KEY).unwrap();
        let bid = order(9, wallet.address());

        let mut relayer = MockRelayerService::new();
        relayer
            .expect_get_counterparty_signature()
            .returning(|_, _| Ok(order(10, Address::repeat_byte(0x02))));

        let mut settlement = MockSettlementLedger::new();
        settlement.expect_settle().never();

        let result = settle_trade(&relayer, &settlement, &wallet, "42", &bid).await;
        assert!(matches!(result, Err(Error::Relayer { .. })));
    }

    #[tokio::test]
    async fn test_settle_trade_propagates_relayer_failure() {
        let wallet = Wallet::from_private_key(TEST_KEY).unwrap();
        let bid = order(9, wallet.address());

        let mut relayer = MockRelayerService::new();
        relayer.expect_get_counterparty_signature().returning(|_, _| {
            Err(Error::Api {
                message: "Relayer request failed: 503".to_string(),
                status: Some(503),
            })
        });

        let mut settlement = MockSettlementLedger::new();
        settlement.expect_settle().never();

        let result = settle_trade(&relayer, &settlement, &wallet, "42", &bid).await;
        match result {
            Err(err) => {
                assert!(err.is_collaborator_failure());
                assert!(matches!(err, Error::Api { status: Some(503), .. }));
            }
            Ok(_) => panic!("expected relayer failure"),
        }
    }
}
