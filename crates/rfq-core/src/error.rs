//! Error types for RFQ order signing and settlement.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Wallet construction error: {message}")]
    Construction { message: String },

    #[error("Invalid EIP-712 domain: {message}")]
    InvalidDomain { message: String },

    #[error("Unable to sign: wallet was created without a private key")]
    MissingPrivateKey,

    #[error("Signer wallet address mismatch: expected {expected}, got {actual}")]
    SignerMismatch { expected: String, actual: String },

    #[error("Malformed address {input:?}: {reason}")]
    MalformedAddress { input: String, reason: String },

    #[error("Typed data error: {message}")]
    TypedData { message: String },

    #[error("Signing error: {message}")]
    Signing { message: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {message}")]
    Api { message: String, status: Option<u16> },

    #[error("RPC error: {message}")]
    Rpc { message: String, code: Option<i64> },

    #[error("Relayer error: {message}")]
    Relayer { message: String },

    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl Error {
    pub(crate) fn typed_data(message: impl Into<String>) -> Self {
        Error::TypedData {
            message: message.into(),
        }
    }

    /// Whether the error was raised by a token, settlement or relayer collaborator.
    ///
    /// These are propagated unchanged; nothing in this crate retries them.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Api { .. } | Error::Rpc { .. } | Error::Relayer { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_classification() {
        let rpc = Error::Rpc {
            message: "execution reverted".to_string(),
            code: Some(3),
        };
        assert!(rpc.is_collaborator_failure());

        let relayer = Error::Relayer {
            message: "missing field `r`".to_string(),
        };
        assert!(relayer.is_collaborator_failure());

        assert!(!Error::MissingPrivateKey.is_collaborator_failure());
        assert!(!Error::InvalidDomain {
            message: "empty".to_string()
        }
        .is_collaborator_failure());
    }

    #[test]
    fn test_signer_mismatch_message() {
        let err = Error::SignerMismatch {
            expected: "0xAAA".to_string(),
            actual: "0xBBB".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Signer wallet address mismatch: expected 0xAAA, got 0xBBB"
        );
    }
}
