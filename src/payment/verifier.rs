//! Main payment verifier combining token decode and on-chain lookup.
//!
//! This is the expensive check the verification cache guards. Either
//! credential kind suffices; every collaborator failure is logged and
//! treated as a failed verification, never propagated.

use crate::payment::chain::ChainClient;
use crate::payment::token::TokenVerifier;
use crate::request::RequestHeaders;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for the payment verifier.
#[derive(Debug, Clone, Default)]
pub struct PaymentVerifierConfig {
    /// Payee a qualifying on-chain spend must be attributable to. `None`
    /// accepts any spend of sufficient size.
    pub expected_payee: Option<String>,
}

/// Credentials extracted from a request, as the verifier consumes them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Credentials<'a> {
    /// Bearer token, Bearer prefix already stripped.
    pub token: Option<&'a str>,
    /// Wallet address for on-chain verification.
    pub wallet: Option<&'a str>,
}

impl<'a> Credentials<'a> {
    /// Pull both credential kinds out of the request headers.
    #[must_use]
    pub fn from_headers(headers: &'a RequestHeaders) -> Self {
        Self {
            token: headers.auth_token(),
            wallet: headers.wallet_address(),
        }
    }

    /// Whether any credential is present at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.wallet.is_none()
    }
}

/// Payment verifier for the gate.
///
/// Holds the two external collaborators; either may be absent, in which case
/// the corresponding credential kind never verifies.
pub struct PaymentVerifier {
    token_verifier: Option<Arc<dyn TokenVerifier>>,
    chain_client: Option<Arc<dyn ChainClient>>,
    config: PaymentVerifierConfig,
}

impl PaymentVerifier {
    /// Create a verifier with no collaborators; all verifications fail until
    /// one is attached.
    #[must_use]
    pub fn new(config: PaymentVerifierConfig) -> Self {
        Self {
            token_verifier: None,
            chain_client: None,
            config,
        }
    }

    /// Attach the token-decode collaborator.
    #[must_use]
    pub fn with_token_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.token_verifier = Some(verifier);
        self
    }

    /// Attach the on-chain lookup collaborator.
    #[must_use]
    pub fn with_chain_client(mut self, client: Arc<dyn ChainClient>) -> Self {
        self.chain_client = Some(client);
        self
    }

    /// Verify that the caller has paid at least `min_amount`.
    ///
    /// The token path is tried first (cheaper), then the on-chain path.
    /// Both paths fail closed: decode errors, unreachable collaborators and
    /// malformed responses all count as "not paid".
    pub async fn verify(
        &self,
        credentials: Credentials<'_>,
        min_amount: f64,
        identity: Option<&str>,
    ) -> bool {
        if self.verify_token(credentials.token, min_amount, identity).await {
            return true;
        }
        self.verify_onchain(credentials.wallet, min_amount).await
    }

    async fn verify_token(
        &self,
        token: Option<&str>,
        min_amount: f64,
        identity: Option<&str>,
    ) -> bool {
        let (Some(verifier), Some(token)) = (&self.token_verifier, token) else {
            return false;
        };
        match verifier.decode(token).await {
            Ok(claims) => {
                if claims.amount < min_amount {
                    debug!(
                        amount = claims.amount,
                        min_amount, "token amount below price"
                    );
                    return false;
                }
                // A subject-bound token only verifies for its own identity.
                if let Some(subject) = &claims.subject {
                    if identity != Some(subject.as_str()) {
                        warn!(subject, ?identity, "token bound to a different identity");
                        return false;
                    }
                }
                info!(amount = claims.amount, "token verified");
                true
            }
            Err(e) => {
                warn!("token verification failed: {e}");
                false
            }
        }
    }

    async fn verify_onchain(&self, wallet: Option<&str>, min_amount: f64) -> bool {
        let (Some(client), Some(wallet)) = (&self.chain_client, wallet) else {
            return false;
        };
        match client.balance_deltas(wallet).await {
            Ok(deltas) => {
                let paid = deltas.iter().any(|delta| {
                    delta.amount_change < 0.0
                        && -delta.amount_change >= min_amount
                        && self.payee_matches(delta.payee.as_deref())
                });
                if paid {
                    info!(wallet, "on-chain payment verified");
                } else {
                    debug!(wallet, "no qualifying on-chain payment found");
                }
                paid
            }
            Err(e) => {
                warn!(wallet, "on-chain lookup failed: {e}");
                false
            }
        }
    }

    fn payee_matches(&self, payee: Option<&str>) -> bool {
        match &self.config.expected_payee {
            Some(expected) => payee == Some(expected.as_str()),
            None => true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::payment::chain::BalanceDelta;
    use crate::payment::token::TokenClaims;
    use async_trait::async_trait;

    struct StaticTokenVerifier(Result<TokenClaims>);

    #[async_trait]
    impl TokenVerifier for StaticTokenVerifier {
        async fn decode(&self, _token: &str) -> Result<TokenClaims> {
            match &self.0 {
                Ok(claims) => Ok(claims.clone()),
                Err(e) => Err(Error::Token(e.to_string())),
            }
        }
    }

    struct StaticChainClient(Result<Vec<BalanceDelta>>);

    #[async_trait]
    impl ChainClient for StaticChainClient {
        async fn balance_deltas(&self, _address: &str) -> Result<Vec<BalanceDelta>> {
            match &self.0 {
                Ok(deltas) => Ok(deltas.clone()),
                Err(e) => Err(Error::Network(e.to_string())),
            }
        }
    }

    fn claims(amount: f64, subject: Option<&str>) -> TokenClaims {
        TokenClaims {
            amount,
            subject: subject.map(ToString::to_string),
            phone: None,
            exp: 0,
        }
    }

    fn token_credentials() -> Credentials<'static> {
        Credentials {
            token: Some("tok"),
            wallet: None,
        }
    }

    #[tokio::test]
    async fn test_no_collaborators_fails_closed() {
        let verifier = PaymentVerifier::new(PaymentVerifierConfig::default());
        let creds = Credentials {
            token: Some("tok"),
            wallet: Some("0xabc"),
        };
        assert!(!verifier.verify(creds, 0.01, Some("u1")).await);
    }

    #[tokio::test]
    async fn test_token_amount_checked() {
        let verifier = PaymentVerifier::new(PaymentVerifierConfig::default())
            .with_token_verifier(Arc::new(StaticTokenVerifier(Ok(claims(0.02, None)))));
        assert!(verifier.verify(token_credentials(), 0.01, Some("u1")).await);
        assert!(!verifier.verify(token_credentials(), 0.05, Some("u1")).await);
    }

    #[tokio::test]
    async fn test_bound_token_requires_matching_identity() {
        let verifier = PaymentVerifier::new(PaymentVerifierConfig::default())
            .with_token_verifier(Arc::new(StaticTokenVerifier(Ok(claims(0.02, Some("u1"))))));
        assert!(verifier.verify(token_credentials(), 0.01, Some("u1")).await);
        assert!(!verifier.verify(token_credentials(), 0.01, Some("u2")).await);
        assert!(!verifier.verify(token_credentials(), 0.01, None).await);
    }

    #[tokio::test]
    async fn test_token_decode_error_is_not_fatal() {
        let verifier = PaymentVerifier::new(PaymentVerifierConfig::default())
            .with_token_verifier(Arc::new(StaticTokenVerifier(Err(Error::Token(
                "bad signature".to_string(),
            )))));
        assert!(!verifier.verify(token_credentials(), 0.01, Some("u1")).await);
    }

    #[tokio::test]
    async fn test_onchain_spend_verifies() {
        let deltas = vec![
            BalanceDelta {
                amount_change: 5.0,
                payee: None,
            },
            BalanceDelta {
                amount_change: -0.05,
                payee: Some("svc".to_string()),
            },
        ];
        let verifier = PaymentVerifier::new(PaymentVerifierConfig {
            expected_payee: Some("svc".to_string()),
        })
        .with_chain_client(Arc::new(StaticChainClient(Ok(deltas))));

        let creds = Credentials {
            token: None,
            wallet: Some("0xabc"),
        };
        assert!(verifier.verify(creds, 0.01, None).await);
        // Larger price than any spend.
        assert!(!verifier.verify(creds, 0.10, None).await);
    }

    #[tokio::test]
    async fn test_onchain_wrong_payee_rejected() {
        let deltas = vec![BalanceDelta {
            amount_change: -0.05,
            payee: Some("someone_else".to_string()),
        }];
        let verifier = PaymentVerifier::new(PaymentVerifierConfig {
            expected_payee: Some("svc".to_string()),
        })
        .with_chain_client(Arc::new(StaticChainClient(Ok(deltas))));

        let creds = Credentials {
            token: None,
            wallet: Some("0xabc"),
        };
        assert!(!verifier.verify(creds, 0.01, None).await);
    }

    #[tokio::test]
    async fn test_deposits_never_qualify() {
        let deltas = vec![BalanceDelta {
            amount_change: 0.05,
            payee: Some("svc".to_string()),
        }];
        let verifier = PaymentVerifier::new(PaymentVerifierConfig::default())
            .with_chain_client(Arc::new(StaticChainClient(Ok(deltas))));
        let creds = Credentials {
            token: None,
            wallet: Some("0xabc"),
        };
        assert!(!verifier.verify(creds, 0.0, None).await);
    }

    #[tokio::test]
    async fn test_chain_error_fails_closed() {
        let verifier = PaymentVerifier::new(PaymentVerifierConfig::default())
            .with_chain_client(Arc::new(StaticChainClient(Err(Error::Network(
                "indexer down".to_string(),
            )))));
        let creds = Credentials {
            token: None,
            wallet: Some("0xabc"),
        };
        assert!(!verifier.verify(creds, 0.01, None).await);
    }

    #[tokio::test]
    async fn test_either_path_suffices() {
        let deltas = vec![BalanceDelta {
            amount_change: -1.0,
            payee: None,
        }];
        let verifier = PaymentVerifier::new(PaymentVerifierConfig::default())
            .with_token_verifier(Arc::new(StaticTokenVerifier(Err(Error::Token(
                "expired".to_string(),
            )))))
            .with_chain_client(Arc::new(StaticChainClient(Ok(deltas))));

        // Token fails but the wallet pays.
        let creds = Credentials {
            token: Some("tok"),
            wallet: Some("0xabc"),
        };
        assert!(verifier.verify(creds, 0.01, Some("u1")).await);
    }
}
