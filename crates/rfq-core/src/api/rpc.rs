//! Ethereum JSON-RPC client for contract reads and transaction submission.

use std::time::Duration;

use alloy_consensus::TxLegacy;
use alloy_primitives::{Address, Bytes, TxKind, B256, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::signing::Wallet;
use crate::{Error, Result};

/// JSON-RPC client bound to one chain.
#[derive(Debug, Clone)]
pub struct RpcClient {
    rpc_url: String,
    chain_id: u64,
    http_client: reqwest::Client,
}

impl RpcClient {
    /// Gas limit for token approvals.
    pub const APPROVE_GAS_LIMIT: u64 = 100_000;
    /// Gas limit for `settleRfq`.
    pub const SETTLE_GAS_LIMIT: u64 = 400_000;

    pub fn new(rpc_url: impl Into<String>, chain_id: u64) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            rpc_url: rpc_url.into(),
            chain_id,
            http_client,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// `eth_call` against the latest block.
    pub async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let params = serde_json::json!([
            { "to": to, "data": data },
            "latest"
        ]);
        self.rpc_call("eth_call", params).await
    }

    /// Pending-inclusive nonce of `address`.
    pub async fn transaction_count(&self, address: Address) -> Result<u64> {
        let hex_count: String = self
            .rpc_call("eth_getTransactionCount", serde_json::json!([address, "pending"]))
            .await?;
        parse_quantity(&hex_count).and_then(|n| {
            u64::try_from(n).map_err(|_| rpc_error(format!("nonce out of range: {hex_count}")))
        })
    }

    pub async fn gas_price(&self) -> Result<u128> {
        let hex_price: String = self.rpc_call("eth_gasPrice", serde_json::json!([])).await?;
        parse_quantity(&hex_price)
    }

    /// Broadcast an already signed, EIP-2718 encoded transaction.
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256> {
        let raw_hex = format!("0x{}", hex::encode(raw));
        self.rpc_call("eth_sendRawTransaction", serde_json::json!([raw_hex]))
            .await
    }

    /// Sign a legacy contract call with `wallet` and broadcast it.
    ///
    /// Uses the pending nonce and the current gas price plus 20%.
    pub async fn send_transaction(
        &self,
        wallet: &Wallet,
        to: Address,
        input: Bytes,
        gas_limit: u64,
    ) -> Result<B256> {
        let from = wallet.address();
        let nonce = self.transaction_count(from).await?;
        let gas_price = self.gas_price().await?;
        let gas_price = gas_price + gas_price / 5;

        let tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(to),
            value: U256::ZERO,
            input,
        };

        let raw = wallet.sign_transaction(tx)?;
        let tx_hash = self.send_raw_transaction(&raw).await?;

        info!(
            from = %from,
            to = %to,
            nonce = nonce,
            tx_hash = %tx_hash,
            "Transaction sent"
        );

        Ok(tx_hash)
    }

    async fn rpc_call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        debug!(method = method, "JSON-RPC request");

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Api {
                message: format!("RPC request failed: {}", response.status()),
                status: Some(response.status().as_u16()),
            });
        }

        let body: JsonRpcResponse<T> = response.json().await?;
        body.into_result(method)
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

impl<T> JsonRpcResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        if let Some(err) = self.error {
            return Err(Error::Rpc {
                message: format!("{method}: {}", err.message),
                code: Some(err.code),
            });
        }
        self.result
            .ok_or_else(|| rpc_error(format!("{method}: no result in response")))
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Parse a `0x` hex quantity.
pub(crate) fn parse_quantity(hex_value: &str) -> Result<u128> {
    let digits = hex_value
        .strip_prefix("0x")
        .ok_or_else(|| rpc_error(format!("quantity without 0x prefix: {hex_value}")))?;
    if digits.is_empty() {
        return Err(rpc_error("empty quantity".to_string()));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| rpc_error(format!("invalid quantity {hex_value}: {e}")))
}

pub(crate) fn rpc_error(message: String) -> Error {
    Error::Rpc {
        message,
        code: None,
    }
}
