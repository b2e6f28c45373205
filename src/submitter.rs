use anyhow::{Result, bail};

/// What the ledger reports back for an accepted write
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerReceipt {
    pub transaction_id: String,
    pub status: String,
    /// Serials created by a mint; empty for topic messages
    pub serials: Vec<u64>,
}

#[async_trait::async_trait]
pub trait LedgerSubmitter: Send + Sync {
    async fn mint_nft(&self, token_id: &str, metadata: Vec<u8>) -> Result<LedgerReceipt>;

    async fn submit_message(&self, topic_id: &str, message: Vec<u8>) -> Result<LedgerReceipt>;
}

/// Stand-in used when the service cannot sign ledger writes
pub struct UnavailableSubmitter {
    reason: String,
}

impl UnavailableSubmitter {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait::async_trait]
impl LedgerSubmitter for UnavailableSubmitter {
    async fn mint_nft(&self, _token_id: &str, _metadata: Vec<u8>) -> Result<LedgerReceipt> {
        bail!("Ledger writes are unavailable: {}", self.reason)
    }

    async fn submit_message(&self, _topic_id: &str, _message: Vec<u8>) -> Result<LedgerReceipt> {
        bail!("Ledger writes are unavailable: {}", self.reason)
    }
}

#[cfg(feature = "hedera")]
pub use hedera_submitter::{HederaNetwork, HederaSubmitter};

#[cfg(feature = "hedera")]
mod hedera_submitter {
    use anyhow::{Context, Result, anyhow};
    use hedera::{AccountId, Client, PrivateKey, TokenId, TokenMintTransaction, TopicId, TopicMessageSubmitTransaction};

    use super::{LedgerReceipt, LedgerSubmitter};
    use crate::config::OperatorCredentials;

    /// Ledger the operator signs for, as named by `HEDERA_NETWORK`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum HederaNetwork {
        Mainnet,
        Testnet,
        Previewnet,
    }

    impl HederaNetwork {
        /// Unknown names fall back to testnet; `Config` has already rejected them
        pub fn from_name(name: &str) -> Self {
            match name {
                "mainnet" => HederaNetwork::Mainnet,
                "previewnet" => HederaNetwork::Previewnet,
                _ => HederaNetwork::Testnet,
            }
        }

        fn client(self) -> Client {
            match self {
                HederaNetwork::Mainnet => Client::for_mainnet(),
                HederaNetwork::Testnet => Client::for_testnet(),
                HederaNetwork::Previewnet => Client::for_previewnet(),
            }
        }
    }

    /// Signs and submits writes through the Hedera SDK with the operator account
    pub struct HederaSubmitter {
        client: Client,
        network: HederaNetwork,
    }

    impl HederaSubmitter {
        pub fn new(network: &str, operator: &OperatorCredentials) -> Result<Self> {
            let account_id: AccountId = operator.account_id.parse()
                .context("HEDERA_OPERATOR_ID is not a valid account id")?;
            let private_key: PrivateKey = operator.private_key.parse()
                .context("HEDERA_OPERATOR_KEY is not a valid private key")?;

            let network = HederaNetwork::from_name(network);
            tracing::info!(?network, operator = %account_id, "configuring hedera submitter");
            let client = network.client();
            client.set_operator(account_id, private_key);

            Ok(Self { client, network })
        }

        pub fn network(&self) -> HederaNetwork {
            self.network
        }
    }

    #[async_trait::async_trait]
    impl LedgerSubmitter for HederaSubmitter {
        async fn mint_nft(&self, token_id: &str, metadata: Vec<u8>) -> Result<LedgerReceipt> {
            let token_id: TokenId = token_id.parse()
                .context("HEDERA_NFT_TOKEN_ID is not a valid token id")?;

            let mut tx = TokenMintTransaction::new();
            tx.token_id(token_id).metadata([metadata]);

            let response = tx.execute(&self.client).await
                .context("Failed to submit token mint")?;
            let receipt = response.get_receipt(&self.client).await
                .context("Failed to fetch token mint receipt")?;

            let serials = receipt.serials
                .iter()
                .map(|s| u64::try_from(*s).map_err(|_| anyhow!("negative serial in receipt: {}", s)))
                .collect::<Result<Vec<_>>>()?;

            Ok(LedgerReceipt {
                transaction_id: response.transaction_id.to_string(),
                status: format!("{:?}", receipt.status).to_uppercase(),
                serials,
            })
        }

        async fn submit_message(&self, topic_id: &str, message: Vec<u8>) -> Result<LedgerReceipt> {
            let topic_id: TopicId = topic_id.parse()
                .context("HEDERA_TOPIC_ID is not a valid topic id")?;

            let mut tx = TopicMessageSubmitTransaction::new();
            tx.topic_id(topic_id).message(message);

            let response = tx.execute(&self.client).await
                .context("Failed to submit topic message")?;
            let receipt = response.get_receipt(&self.client).await
                .context("Failed to fetch topic message receipt")?;

            Ok(LedgerReceipt {
                transaction_id: response.transaction_id.to_string(),
                status: format!("{:?}", receipt.status).to_uppercase(),
                serials: Vec::new(),
            })
        }
    }

}
