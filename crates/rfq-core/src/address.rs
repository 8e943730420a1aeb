//! Ethereum address normalization.
//!
//! Addresses arrive from key derivation, configuration, CLI arguments and the
//! relayer in different shapes: with or without `0x`, lowercase, uppercase or
//! EIP-55 mixed case. Everything that compares or encodes an address goes
//! through [`normalize_address`] first.

use alloy_primitives::Address;

use crate::{Error, Result};

/// Parse and validate an address string.
///
/// Accepts an optional `0x`/`0X` prefix followed by exactly 40 hex digits.
/// All-lowercase and all-uppercase input is accepted as-is. Mixed-case input
/// must carry a valid EIP-55 checksum, otherwise it is rejected as malformed.
///
/// The returned [`Address`] displays in checksummed form.
pub fn normalize_address(input: &str) -> Result<Address> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() != 40 {
        return Err(malformed(input, format!("expected 40 hex digits, got {}", digits.len())));
    }

    let bytes = hex::decode(digits).map_err(|e| malformed(input, e.to_string()))?;
    let address = Address::from_slice(&bytes);

    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());

    if has_upper && has_lower && &address.to_checksum(None)[2..] != digits {
        return Err(malformed(input, "invalid EIP-55 checksum".to_string()));
    }

    Ok(address)
}

/// Render an address in EIP-55 checksummed form.
pub fn checksum(address: &Address) -> String {
    address.to_checksum(None)
}

/// Compare two address strings after normalization.
pub fn addresses_match(a: &str, b: &str) -> Result<bool> {
    Ok(normalize_address(a)? == normalize_address(b)?)
}

fn malformed(input: &str, reason: String) -> Error {
    Error::MalformedAddress {
        input: input.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKSUMMED: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_lowercase_normalizes_to_checksum() {
        let address = normalize_address("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap();
        assert_eq!(checksum(&address), CHECKSUMMED);
    }

    #[test]
    fn test_uppercase_and_unprefixed() {
        let upper = normalize_address("0XF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266").unwrap();
        let bare = normalize_address("f39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap();
        assert_eq!(upper, bare);
        assert_eq!(checksum(&upper), CHECKSUMMED);
    }

    #[test]
    fn test_valid_checksum_accepted() {
        let address = normalize_address(CHECKSUMMED).unwrap();
        assert_eq!(address.to_string(), CHECKSUMMED);
    }

    #[test]
    fn test_bad_checksum_rejected() {
        // Same address with one letter's case flipped.
        let result = normalize_address("0xf39fd6e51aad88F6F4ce6aB8827279cffFb92266");
        assert!(matches!(result, Err(Error::MalformedAddress { .. })));
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(normalize_address("0x1234").is_err());
        assert!(normalize_address("").is_err());
    }

    #[test]
    fn test_non_hex_rejected() {
        let result = normalize_address("0xzz9fd6e51aad88f6f4ce6ab8827279cfffb92266");
        assert!(matches!(result, Err(Error::MalformedAddress { .. })));
    }

    #[test]
    fn test_addresses_match_ignores_format() {
        assert!(addresses_match(CHECKSUMMED, "f39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap());
        assert!(!addresses_match(
            CHECKSUMMED,
            "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb2"
        )
        .unwrap());
    }
}
