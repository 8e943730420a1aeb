//! Configuration for the RFQ tooling.

use crate::address::normalize_address;
use crate::signing::{Eip712Domain, DEFAULT_DOMAIN_NAME, DEFAULT_DOMAIN_VERSION, MAINNET_CHAIN_ID};
use crate::{Error, Result};
use alloy_primitives::Address;
use serde::Deserialize;
use std::env;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chain: ChainConfig,
    pub relayer: RelayerConfig,
    pub domain: DomainConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub rpc_url: Option<String>,
    pub chain_id: u64,
    pub settlement_address: Option<String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            chain_id: MAINNET_CHAIN_ID,
            settlement_address: None,
        }
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelayerConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for RelayerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayerConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// EIP-712 domain name and version the settlement contract was deployed with.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    pub name: String,
    pub version: String,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DOMAIN_NAME.to_string(),
            version: DEFAULT_DOMAIN_VERSION.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let chain_id = match env::var("OPYN_CHAIN_ID") {
            Ok(raw) => raw.trim().parse().map_err(|_| Error::Config {
                message: format!("OPYN_CHAIN_ID is not a valid chain id: {raw:?}"),
            })?,
            Err(_) => MAINNET_CHAIN_ID,
        };

        let defaults = DomainConfig::default();

        Ok(Self {
            chain: ChainConfig {
                rpc_url: env::var("OPYN_RPC_URL").ok(),
                chain_id,
                settlement_address: env::var("OPYN_SETTLEMENT_ADDRESS").ok(),
            },
            relayer: RelayerConfig {
                url: env::var("OPYN_RELAYER_URL").ok(),
                api_key: env::var("OPYN_RELAYER_API_KEY").ok(),
            },
            domain: DomainConfig {
                name: env::var("OPYN_DOMAIN_NAME").unwrap_or(defaults.name),
                version: env::var("OPYN_DOMAIN_VERSION").unwrap_or(defaults.version),
            },
        })
    }

    /// Load configuration from a file (TOML, YAML or JSON by extension), with
    /// `OPYN__SECTION__KEY` environment variables layered on top.
    pub fn from_file(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("OPYN").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Settlement contract address; required for signing, allowances and settlement.
    pub fn settlement_address(&self) -> Result<Address> {
        let raw = self
            .chain
            .settlement_address
            .as_deref()
            .ok_or_else(|| Error::Config {
                message: "OPYN_SETTLEMENT_ADDRESS is not set".to_string(),
            })?;
        normalize_address(raw)
    }

    pub fn rpc_url(&self) -> Result<&str> {
        self.chain.rpc_url.as_deref().ok_or_else(|| Error::Config {
            message: "OPYN_RPC_URL is not set".to_string(),
        })
    }

    pub fn relayer_url(&self) -> Result<&str> {
        self.relayer.url.as_deref().ok_or_else(|| Error::Config {
            message: "OPYN_RELAYER_URL is not set".to_string(),
        })
    }

    /// EIP-712 domain for RFQ orders: configured name and version, chain id and
    /// the settlement contract as verifying contract.
    pub fn signing_domain(&self) -> Result<Eip712Domain> {
        Ok(Eip712Domain::new()
            .with_name(self.domain.name.clone())
            .with_version(self.domain.version.clone())
            .with_chain_id(self.chain.chain_id)
            .with_verifying_contract(self.settlement_address()?))
    }

    /// Load configuration for testing (with defaults).
    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            chain: ChainConfig {
                rpc_url: Some("http://127.0.0.1:8545".to_string()),
                chain_id: 31337,
                settlement_address: Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string()),
            },
            relayer: RelayerConfig {
                url: Some("http://127.0.0.1:3000".to_string()),
                api_key: Some("test-key".to_string()),
            },
            domain: DomainConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_signing_domain() {
        let config = Config::test_config();
        let domain = config.signing_domain().unwrap();

        assert_eq!(domain.name.as_deref(), Some(DEFAULT_DOMAIN_NAME));
        assert_eq!(domain.version.as_deref(), Some(DEFAULT_DOMAIN_VERSION));
        assert_eq!(domain.chain_id, Some(31337));
        assert_eq!(
            domain.verifying_contract,
            Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".parse().unwrap())
        );
    }

    #[test]
    fn test_missing_settlement_address() {
        let config = Config::default();
        assert!(matches!(config.signing_domain(), Err(Error::Config { .. })));
        assert!(matches!(config.rpc_url(), Err(Error::Config { .. })));
        assert!(matches!(config.relayer_url(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_bad_settlement_address() {
        let mut config = Config::test_config();
        config.chain.settlement_address = Some("0x1234".to_string());
        assert!(matches!(
            config.settlement_address(),
            Err(Error::MalformedAddress { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let rendered = format!("{:?}", Config::test_config());
        assert!(!rendered.contains("test-key"));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("opyn-rfq-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[chain]
rpc_url = "http://localhost:8545"
chain_id = 5
settlement_address = "0x5fbdb2315678afecb367f032d93f642f64180aa3"

[domain]
name = "OPYN BRIDGE"
"#
        )
        .unwrap();
        drop(file);

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.chain.chain_id, 5);
        assert_eq!(config.domain.name, "OPYN BRIDGE");
        assert_eq!(config.domain.version, DEFAULT_DOMAIN_VERSION);
        assert!(config.relayer.url.is_none());
        assert_eq!(
            config.settlement_address().unwrap().to_string(),
            "0x5FbDB2315678afecb367f032d93F642f64180aa3"
        );
    }
}
