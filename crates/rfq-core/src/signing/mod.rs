//! EIP-712 signing for Opyn RFQ orders.
//!
//! # Architecture
//!
//! ```text
//! MessageToSign ──► typed_data::digest ◄── Eip712Domain
//!                          │
//!                          ▼
//!                   Wallet::sign ──► SignatureParts
//!                          │
//!                          ▼
//!               OrderSigner ──► OrderData ──► relayer / settlement
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rfq_core::signing::{Eip712Domain, MessageToSign, OrderSigner, Wallet};
//!
//! let wallet = Wallet::from_private_key("0x...")?;
//! let domain = Eip712Domain::rfq_settlement(1, settlement_address);
//! let signer = OrderSigner::new(wallet, domain)?;
//!
//! let order = MessageToSign::new(bid_id, signer.address(), token, amount, nonce);
//! let signed = signer.sign_order(&order)?;
//! ```

pub mod domain;
pub mod order_types;
pub mod signer;
pub mod typed_data;
pub mod wallet;

pub use domain::{Eip712Domain, DEFAULT_DOMAIN_NAME, DEFAULT_DOMAIN_VERSION, MAINNET_CHAIN_ID};

pub use order_types::{MessageToSign, OrderData, MESSAGE_TYPES, OPYN_RFQ_TYPE};

pub use signer::{sign_order, OrderSigner};

pub use typed_data::{compute_digest, Eip712Message, TypedData, TypedField, Types, Value};

pub use wallet::{SignatureParts, Wallet};
