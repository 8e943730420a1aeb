//! Opyn RFQ relayer HTTP client.
//!
//! Responses are decoded into explicit schemas and then validated. A missing
//! field, a malformed address, `v` outside {27, 28} or a non-hex `r`/`s` is a
//! [`Error::Relayer`]; nothing partially decoded is returned.

use std::time::Duration;

use alloy_primitives::U256;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{AuctionStatus, RelayerService};
use crate::address::normalize_address;
use crate::signing::typed_data::json_u256;
use crate::signing::OrderData;
use crate::{Error, Result};

/// Header carrying the relayer API key.
pub const API_KEY_HEADER: &str = "Opyn-Cedefi-Bridge-X-API-Key";

/// Relayer REST client.
#[derive(Clone)]
pub struct RelayerClient {
    base_url: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl RelayerClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            base_url,
            api_key,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auction_url(&self, auction_id: &str) -> Result<String> {
        Ok(format!("{}/auction/{}", self.base_url, path_segment(auction_id)?))
    }

    fn signature_url(&self, auction_id: &str, bid_id: U256) -> Result<String> {
        Ok(format!(
            "{}/sdk/signature/auction/{}/bid/{}",
            self.base_url,
            path_segment(auction_id)?,
            bid_id
        ))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut request = self.http_client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        debug!(url = url, "Relayer request");
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                message: format!("Relayer request failed: {} - {}", status, body),
                status: Some(status.as_u16()),
            });
        }

        let raw: serde_json::Value = response.json().await?;
        serde_json::from_value(raw).map_err(|e| relayer_error(format!("unexpected response shape: {e}")))
    }
}

impl std::fmt::Debug for RelayerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayerClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait::async_trait]
impl RelayerService for RelayerClient {
    async fn get_auction_status(&self, auction_id: &str) -> Result<AuctionStatus> {
        let url = self.auction_url(auction_id)?;
        let response: AuctionResponse = self.get_json(&url).await?;
        response.validate().inspect_err(|e| {
            warn!(auction_id = auction_id, error = %e, "Rejected auction status from relayer");
        })
    }

    async fn get_counterparty_signature(&self, auction_id: &str, bid_id: U256) -> Result<OrderData> {
        let url = self.signature_url(auction_id, bid_id)?;
        let response: SignatureResponse = self.get_json(&url).await?;
        response.validate().inspect_err(|e| {
            warn!(
                auction_id = auction_id,
                bid_id = %bid_id,
                error = %e,
                "Rejected counterparty signature from relayer"
            );
        })
    }
}

/// `GET /auction/{id}` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuctionResponse {
    auction_id: serde_json::Value,
    status: String,
}

impl AuctionResponse {
    fn validate(self) -> Result<AuctionStatus> {
        let auction_id = match self.auction_id {
            serde_json::Value::String(id) if !id.is_empty() => id,
            serde_json::Value::Number(id) => id.to_string(),
            other => return Err(relayer_error(format!("invalid auctionId: {other}"))),
        };
        if self.status.is_empty() {
            return Err(relayer_error("empty auction status".to_string()));
        }
        Ok(AuctionStatus {
            auction_id,
            status: self.status,
        })
    }
}

/// `GET /sdk/signature/auction/{id}/bid/{bidId}` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureResponse {
    bid_id: serde_json::Value,
    trader: String,
    token: String,
    amount: serde_json::Value,
    v: u8,
    r: String,
    s: String,
}

impl SignatureResponse {
    fn validate(self) -> Result<OrderData> {
        let order = OrderData {
            bid_id: json_u256(&self.bid_id).map_err(|e| relayer_error(format!("bidId: {e}")))?,
            trader: normalize_address(&self.trader)
                .map_err(|e| relayer_error(format!("trader: {e}")))?,
            token: normalize_address(&self.token)
                .map_err(|e| relayer_error(format!("token: {e}")))?,
            amount: json_u256(&self.amount).map_err(|e| relayer_error(format!("amount: {e}")))?,
            v: self.v,
            r: self.r,
            s: self.s,
        };
        order
            .normalized()
            .map_err(|e| relayer_error(format!("signature: {e}")))
    }
}

fn path_segment(id: &str) -> Result<&str> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(id)
    } else {
        Err(relayer_error(format!("invalid auction id {id:?}")))
    }
}

fn relayer_error(message: String) -> Error {
    Error::Relayer { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use serde_json::json;

    const TRADER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

    fn signature_body() -> serde_json::Value {
        json!({
            "bidId": 3,
            "trader": TRADER,
            "token": USDC,
            "amount": "1000000",
            "v": 27,
            "r": "0x5",
            "s": format!("0x{}", "ab".repeat(32)),
        })
    }

    fn parse_signature(body: serde_json::Value) -> Result<OrderData> {
        let response: SignatureResponse = serde_json::from_value(body)
            .map_err(|e| relayer_error(format!("unexpected response shape: {e}")))?;
        response.validate()
    }

    #[test]
    fn test_urls() {
        let client = RelayerClient::new("https://relayer.example/", None).unwrap();
        assert_eq!(client.base_url(), "https://relayer.example");
        assert_eq!(
            client.auction_url("17").unwrap(),
            "https://relayer.example/auction/17"
        );
        assert_eq!(
            client.signature_url("17", U256::from(4u64)).unwrap(),
            "https://relayer.example/sdk/signature/auction/17/bid/4"
        );
    }

    #[test]
    fn test_auction_id_path_injection_rejected() {
        let client = RelayerClient::new("https://relayer.example", None).unwrap();
        assert!(client.auction_url("../admin").is_err());
        assert!(client.auction_url("").is_err());
        assert!(client.auction_url("1?x=2").is_err());
    }

    #[test]
    fn test_valid_signature_response() {
        let order = parse_signature(signature_body()).unwrap();
        assert_eq!(order.bid_id, U256::from(3u64));
        assert_eq!(order.trader, TRADER.parse::<Address>().unwrap());
        assert_eq!(order.amount, U256::from(1_000_000u64));
        assert_eq!(order.v, 27);
        assert_eq!(order.r, format!("0x{}5", "0".repeat(63)));
    }

    #[test]
    fn test_missing_field_rejected() {
        let mut body = signature_body();
        body.as_object_mut().unwrap().remove("r");
        assert!(matches!(parse_signature(body), Err(Error::Relayer { .. })));
    }

    #[test]
    fn test_bad_v_rejected() {
        let mut body = signature_body();
        body["v"] = json!(1);
        assert!(matches!(parse_signature(body), Err(Error::Relayer { .. })));
    }

    #[test]
    fn test_non_hex_signature_rejected() {
        let mut body = signature_body();
        body["s"] = json!("0xnothex");
        assert!(matches!(parse_signature(body), Err(Error::Relayer { .. })));
    }

    #[test]
    fn test_malformed_trader_rejected() {
        let mut body = signature_body();
        body["trader"] = json!("0xf39fd6e51aad88F6F4ce6aB8827279cffFb92266");
        let err = parse_signature(body).unwrap_err();
        assert!(err.is_collaborator_failure());
        assert!(err.to_string().contains("trader"));
    }

    #[test]
    fn test_auction_response() {
        let response: AuctionResponse =
            serde_json::from_value(json!({"auctionId": 12, "status": "open"})).unwrap();
        assert_eq!(
            response.validate().unwrap(),
            AuctionStatus {
                auction_id: "12".to_string(),
                status: "open".to_string()
            }
        );

        let response: AuctionResponse =
            serde_json::from_value(json!({"auctionId": "a-1", "status": ""})).unwrap();
        assert!(matches!(response.validate(), Err(Error::Relayer { .. })));

        let response: AuctionResponse =
            serde_json::from_value(json!({"auctionId": null, "status": "open"})).unwrap();
        assert!(response.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client =
            RelayerClient::new("https://relayer.example", Some("super-secret".to_string())).unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
