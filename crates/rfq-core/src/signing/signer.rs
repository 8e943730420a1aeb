//! RFQ order signing.

use alloy_primitives::Address;
use tracing::{debug, info};

use super::domain::Eip712Domain;
use super::order_types::{MessageToSign, OrderData};
use super::typed_data::Eip712Message;
use super::wallet::Wallet;
use crate::address::checksum;
use crate::{Error, Result};

/// Signs RFQ orders for one wallet against one settlement domain.
#[derive(Clone)]
pub struct OrderSigner {
    wallet: Wallet,
    domain: Eip712Domain,
}

impl OrderSigner {
    /// Create a signer. Fails if the domain has no fields.
    pub fn new(wallet: Wallet, domain: Eip712Domain) -> Result<Self> {
        domain.validate()?;
        Ok(Self { wallet, domain })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn sign_order(&self, order: &MessageToSign) -> Result<OrderData> {
        sign_order(&self.domain, order, &self.wallet)
    }
}

impl std::fmt::Debug for OrderSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderSigner")
            .field("address", &checksum(&self.wallet.address()))
            .field("domain", &self.domain)
            .finish()
    }
}

/// Sign an order as `wallet`.
///
/// The wallet must hold a private key and be the order's trader. The produced
/// signature is recovered and checked against the wallet before it is returned.
pub fn sign_order(domain: &Eip712Domain, order: &MessageToSign, wallet: &Wallet) -> Result<OrderData> {
    domain.validate()?;

    if !wallet.can_sign() {
        return Err(Error::MissingPrivateKey);
    }

    if order.trader != wallet.address() {
        return Err(Error::SignerMismatch {
            expected: checksum(&order.trader),
            actual: checksum(&wallet.address()),
        });
    }

    let digest = order.signing_hash(domain)?;
    debug!(bid_id = %order.bid_id, digest = %digest, "Computed RFQ order digest");

    let signature = wallet.sign(&digest)?;

    let recovered = signature.recover_address(&digest)?;
    if recovered != wallet.address() {
        return Err(Error::SignerMismatch {
            expected: checksum(&wallet.address()),
            actual: checksum(&recovered),
        });
    }

    info!(
        bid_id = %order.bid_id,
        trader = %checksum(&order.trader),
        token = %checksum(&order.token),
        amount = %order.amount,
        "Signed RFQ order"
    );

    Ok(OrderData::from_message(order, &signature))
}
