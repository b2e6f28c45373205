use anyhow::{Context, Result, bail};
use std::env;
use std::time::Duration;

pub const DEFAULT_MIRROR_URL: &str = "https://testnet.mirrornode.hedera.com";
pub const DEFAULT_WEB3_STORAGE_URL: &str = "https://api.web3.storage";

/// Operator account used to pay for and sign ledger writes
#[derive(Debug, Clone)]
pub struct OperatorCredentials {
    pub account_id: String,
    pub private_key: String,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub nft_token_id: String,
    pub topic_id: String,
    pub mirror_url: String,
    pub network: String,
    pub operator: Option<OperatorCredentials>,
    pub web3_storage_token: Option<String>,
    pub web3_storage_url: String,
    pub bind_addr: String,
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Environment Variables
    /// - `HEDERA_NFT_TOKEN_ID`: Required - Token the shipment NFTs are minted under
    /// - `HEDERA_TOPIC_ID`: Required - Topic shipment events are submitted to
    /// - `HEDERA_MIRROR_URL`: Optional - Mirror Node base URL (default: testnet)
    /// - `HEDERA_NETWORK`: Optional - `testnet`, `mainnet` or `previewnet` (default: testnet)
    /// - `HEDERA_OPERATOR_ID`: Optional - Operator account id, needed for ledger writes
    /// - `HEDERA_OPERATOR_KEY`: Optional - Operator private key, needed for ledger writes
    /// - `WEB3_STORAGE_TOKEN`: Optional - Web3.Storage API token, needed for uploads
    /// - `WEB3_STORAGE_URL`: Optional - Web3.Storage API URL
    /// - `BIND_ADDR`: Optional - Listen address (default: "0.0.0.0:4000")
    /// - `HTTP_TIMEOUT_SECS`: Optional - Outbound HTTP timeout (default: 30)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String> {
            let value = lookup(name).with_context(|| format!("{} not set", name))?;
            if value.trim().is_empty() {
                bail!("{} cannot be empty", name);
            }
            Ok(value.trim().to_string())
        };
        let optional = |name: &str| -> Option<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let nft_token_id = required("HEDERA_NFT_TOKEN_ID")?;
        let topic_id = required("HEDERA_TOPIC_ID")?;

        let mirror_url = optional("HEDERA_MIRROR_URL")
            .unwrap_or_else(|| DEFAULT_MIRROR_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let network = optional("HEDERA_NETWORK")
            .unwrap_or_else(|| "testnet".to_string())
            .to_lowercase();
        if !matches!(network.as_str(), "testnet" | "mainnet" | "previewnet") {
            bail!("HEDERA_NETWORK must be one of testnet, mainnet, previewnet (got {})", network);
        }

        // Operator id and key only make sense together
        let operator = match (optional("HEDERA_OPERATOR_ID"), optional("HEDERA_OPERATOR_KEY")) {
            (Some(account_id), Some(private_key)) => Some(OperatorCredentials { account_id, private_key }),
            (None, None) => None,
            _ => bail!("HEDERA_OPERATOR_ID and HEDERA_OPERATOR_KEY must be set together"),
        };

        let web3_storage_token = optional("WEB3_STORAGE_TOKEN");
        let web3_storage_url = optional("WEB3_STORAGE_URL")
            .unwrap_or_else(|| DEFAULT_WEB3_STORAGE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let bind_addr = optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:4000".to_string());

        let http_timeout_secs = match optional("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("HTTP_TIMEOUT_SECS is not a number: {}", raw))?,
            None => 30,
        };

        Ok(Config {
            nft_token_id,
            topic_id,
            mirror_url,
            network,
            operator,
            web3_storage_token,
            web3_storage_url,
            bind_addr,
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }
}
