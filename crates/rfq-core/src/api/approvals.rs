//! Allowance checks and approvals toward the settlement contract.

use alloy_primitives::{Address, B256, U256};
use tracing::info;

use super::TokenLedger;
use crate::address::checksum;
use crate::signing::Wallet;
use crate::{Error, Result};

/// Minimum allowance, in whole tokens, for a wallet to count as approved.
pub const MIN_ALLOWANCE: u64 = 100_000_000;

/// Whether `owner` has granted `spender` more than [`MIN_ALLOWANCE`] whole tokens.
///
/// The raw allowance is floor-divided by `10^decimals` before the strict
/// comparison, so an allowance of exactly the minimum is not enough.
pub async fn verify_allowance(
    token: &dyn TokenLedger,
    owner: Address,
    spender: Address,
) -> Result<bool> {
    let raw_allowance = token.get_allowance(owner, spender).await?;
    let decimals = token.decimals().await?;

    let whole_tokens = match U256::from(10u64).checked_pow(U256::from(decimals)) {
        Some(unit) => raw_allowance / unit,
        None => U256::ZERO,
    };
    let sufficient = whole_tokens > U256::from(MIN_ALLOWANCE);

    info!(
        token = %checksum(&token.address()),
        owner = %checksum(&owner),
        spender = %checksum(&spender),
        raw_allowance = %raw_allowance,
        decimals = decimals,
        sufficient = sufficient,
        "Checked token allowance"
    );

    Ok(sufficient)
}

/// Approve `spender` for `amount` base units on behalf of `wallet`.
pub async fn allow_more(
    token: &dyn TokenLedger,
    wallet: &Wallet,
    spender: Address,
    amount: U256,
) -> Result<B256> {
    if !wallet.can_sign() {
        return Err(Error::MissingPrivateKey);
    }

    let tx_hash = token.approve(wallet, spender, amount).await?;

    info!(
        token = %checksum(&token.address()),
        owner = %wallet.address_string(),
        spender = %checksum(&spender),
        amount = %amount,
        tx_hash = %tx_hash,
        "Allowance increased"
    );

    Ok(tx_hash)
}
