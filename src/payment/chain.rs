//! On-chain payment lookup.
//!
//! The gate checks whether a wallet has paid by scanning the wallet's recent
//! balance-delta records for a spend to the expected payee. Fetching those
//! records is external: [`ChainClient`] is the narrow interface, and
//! [`HttpChainClient`] queries a JSON indexer over HTTP. Transaction parsing
//! beyond the delta records is out of scope here.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One balance movement on a wallet. Negative `amount_change` is a spend.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceDelta {
    /// Signed balance change in currency units.
    pub amount_change: f64,
    /// Receiving party, when the indexer can attribute one.
    #[serde(default)]
    pub payee: Option<String>,
}

/// Queries a wallet's balance-delta history.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetch recent balance deltas for `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails; the payment verifier treats any
    /// error as a failed verification (fail-closed).
    async fn balance_deltas(&self, address: &str) -> Result<Vec<BalanceDelta>>;
}

/// Configuration for the HTTP indexer client.
#[derive(Debug, Clone)]
pub struct ChainClientConfig {
    /// Base URL of the indexer; deltas are fetched from
    /// `<indexer_url>/address/<wallet>/deltas`.
    pub indexer_url: String,
    /// Timeout for indexer queries.
    pub query_timeout: Duration,
    /// Whether the client is enabled (false = wallet credentials never verify).
    pub enabled: bool,
}

impl Default for ChainClientConfig {
    fn default() -> Self {
        Self {
            indexer_url: String::new(),
            query_timeout: Duration::from_secs(30),
            enabled: true,
        }
    }
}

/// [`ChainClient`] backed by an HTTP JSON indexer.
pub struct HttpChainClient {
    config: ChainClientConfig,
    client: Option<reqwest::Client>,
}

impl HttpChainClient {
    /// Create a new indexer client with the given configuration.
    ///
    /// An empty indexer URL disables the client rather than erroring, so a
    /// gate can run token-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(config: ChainClientConfig) -> Result<Self> {
        if !config.enabled {
            info!("chain client disabled - wallet credentials will not verify");
            return Ok(Self {
                config,
                client: None,
            });
        }
        if config.indexer_url.is_empty() {
            warn!("no chain indexer URL configured - chain client disabled");
            return Ok(Self {
                config: ChainClientConfig {
                    enabled: false,
                    ..config
                },
                client: None,
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.query_timeout)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        info!(indexer_url = %config.indexer_url, "chain client initialized");
        Ok(Self {
            config,
            client: Some(client),
        })
    }

    /// Check if the client is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn balance_deltas(&self, address: &str) -> Result<Vec<BalanceDelta>> {
        let Some(client) = &self.client else {
            debug!("chain client disabled, returning no deltas");
            return Ok(Vec::new());
        };

        let url = format!(
            "{}/address/{address}/deltas",
            self.config.indexer_url.trim_end_matches('/')
        );
        debug!(%url, "querying chain indexer");

        let request = async {
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| Error::Network(format!("indexer request failed: {e}")))?;
            if !response.status().is_success() {
                return Err(Error::Chain(format!(
                    "indexer returned status {}",
                    response.status()
                )));
            }
            response
                .json::<Vec<BalanceDelta>>()
                .await
                .map_err(|e| Error::Chain(format!("malformed indexer response: {e}")))
        };

        match tokio::time::timeout(self.config.query_timeout, request).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%url, "chain indexer query timed out");
                Err(Error::Network("chain indexer query timed out".to_string()))
            }
        }
    }
}
