//! Gate controller: the per-request decision.
//!
//! A [`Paywall`] composes the identity extractor, the verification cache,
//! the rate limiter and the usage tracker into a single decision per
//! request. The check order is a fixed policy: phone gating first (cheapest
//! and most restrictive), then rate limiting (cheap, and it protects the
//! verifier), then the expensive payment check. Callers therefore see a
//! phone rejection before a rate-limit rejection before a payment one.
//!
//! All state lives in the maps owned by the instance; the decision itself is
//! stateless, so gates for different endpoints are fully independent.

use crate::config::GateConfig;
use crate::identity;
use crate::payment::{Credentials, PaymentVerifier, VerificationCache};
use crate::phone::{HeaderPhoneVerifier, PhoneVerifier};
use crate::rate_limit::RateLimiter;
use crate::request::RequestHeaders;
use crate::usage::UsageTracker;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Cache/ledger key used when no identity can be derived.
const ANONYMOUS: &str = "anonymous";

/// Payment-required payload (HTTP 402 semantics).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentRequired {
    /// Fixed error string.
    pub error: String,
    /// Price of the rejected request.
    pub price: f64,
    /// Currency the price is denominated in.
    pub currency: String,
    /// Where the caller can pay.
    pub payment_endpoint: String,
    /// Whether the endpoint additionally requires a verified phone.
    pub phone_required: bool,
}

/// Phone-verification-required payload (HTTP 402 semantics).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PhoneRequired {
    /// Fixed error string.
    pub error: String,
    /// Where the caller can verify a phone number.
    pub verify_url: String,
}

/// Rate-limited payload (HTTP 429 semantics).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RateLimited {
    /// Fixed error string.
    pub error: String,
    /// Seconds until a retry can be admitted.
    pub retry_after: u64,
    /// Configured per-window request cap.
    pub requests_per_minute: u32,
}

/// A structured rejection, one per terminal gate outcome.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Rejection {
    /// Payment missing or insufficient.
    Payment(PaymentRequired),
    /// Phone verification required but absent.
    Phone(PhoneRequired),
    /// Caller exceeded the endpoint's rate limit.
    RateLimit(RateLimited),
}

impl Rejection {
    /// HTTP status the host should map this rejection to.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Payment(_) | Self::Phone(_) => 402,
            Self::RateLimit(_) => 429,
        }
    }
}

/// Outcome of a gate decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Request may proceed to the handler.
    Allowed {
        /// Derived caller identity, if any credential identified one.
        identity: Option<String>,
    },
    /// Request is rejected with a structured payload.
    Rejected(Rejection),
}

/// Request gate for one protected endpoint.
///
/// Construct one per endpoint configuration; the verification cache, rate
/// windows and usage ledger are owned by the instance (no process-wide
/// state), so independent gates coexist and tests build throwaway ones.
pub struct Paywall {
    config: GateConfig,
    verifier: PaymentVerifier,
    phone: Arc<dyn PhoneVerifier>,
    cache: VerificationCache,
    limiter: RateLimiter,
    usage: UsageTracker,
}

impl Paywall {
    /// Create a gate from its configuration and payment verifier.
    ///
    /// Phone checks default to [`HeaderPhoneVerifier`]; swap in a real
    /// lookup with [`with_phone_verifier`](Self::with_phone_verifier).
    #[must_use]
    pub fn new(config: GateConfig, verifier: PaymentVerifier) -> Self {
        info!(
            resource = %config.resource,
            price = config.price,
            rate_limit = ?config.rate_limit,
            phone_required = config.phone_required,
            "paywall gate created"
        );
        let cache = VerificationCache::with_capacity(config.cache_capacity);
        let limiter = RateLimiter::new(Duration::from_secs(config.window_secs));
        Self {
            config,
            verifier,
            phone: Arc::new(HeaderPhoneVerifier),
            cache,
            limiter,
            usage: UsageTracker::new(),
        }
    }

    /// Replace the phone-verification collaborator.
    #[must_use]
    pub fn with_phone_verifier(mut self, phone: Arc<dyn PhoneVerifier>) -> Self {
        self.phone = phone;
        self
    }

    /// Decide whether the request behind `headers` may proceed.
    ///
    /// Check order is fixed: phone, rate limit, payment. A request with no
    /// derivable identity skips rate limiting (there is nothing to key the
    /// window on - a documented trade-off) but still faces the payment
    /// check under a degenerate cache key.
    pub async fn decide(&self, headers: &RequestHeaders) -> Decision {
        let identity = identity::extract(headers);

        if self.config.phone_required
            && !self.phone.is_verified(identity.as_deref(), headers).await
        {
            debug!(?identity, "phone verification missing");
            return Decision::Rejected(Rejection::Phone(PhoneRequired {
                error: "Phone verification required".to_string(),
                verify_url: self.config.verify_url.clone(),
            }));
        }

        if let (Some(max), Some(id)) = (self.config.rate_limit, identity.as_deref()) {
            if !self.limiter.admit(id, max) {
                debug!(identity = id, "rate limit exceeded");
                return Decision::Rejected(Rejection::RateLimit(RateLimited {
                    error: "Rate limit exceeded".to_string(),
                    retry_after: self.retry_after_secs(id),
                    requests_per_minute: max,
                }));
            }
        }

        let cache_key = identity.as_deref().unwrap_or(ANONYMOUS);
        let credentials = Credentials::from_headers(headers);
        let paid = self
            .cache
            .get_or_verify(
                cache_key,
                self.config.price,
                Duration::from_secs(self.config.cache_ttl_secs),
                || {
                    self.verifier
                        .verify(credentials, self.config.price, identity.as_deref())
                },
            )
            .await;

        if !paid {
            debug!(?identity, price = self.config.price, "payment required");
            return Decision::Rejected(Rejection::Payment(PaymentRequired {
                error: "Payment required".to_string(),
                price: self.config.price,
                currency: self.config.currency.clone(),
                payment_endpoint: self.config.payment_endpoint.clone(),
                phone_required: self.config.phone_required,
            }));
        }

        Decision::Allowed { identity }
    }

    /// Run `handler` behind the gate.
    ///
    /// On an allowed request the handler runs to completion and the
    /// endpoint's price is then billed against (identity, resource) in the
    /// usage ledger; on rejection the handler never runs.
    ///
    /// # Errors
    ///
    /// Returns the structured [`Rejection`] when the gate denies the request.
    pub async fn guard<T, F, Fut>(
        &self,
        headers: &RequestHeaders,
        handler: F,
    ) -> Result<T, Rejection>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match self.decide(headers).await {
            Decision::Rejected(rejection) => Err(rejection),
            Decision::Allowed { identity } => {
                let result = handler().await;
                let who = identity.as_deref().unwrap_or(ANONYMOUS);
                self.usage
                    .record(who, &self.config.resource, self.config.price);
                Ok(result)
            }
        }
    }

    /// The gate's usage ledger.
    #[must_use]
    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Verification-cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> crate::payment::CacheStats {
        self.cache.stats()
    }

    /// The gate's configuration.
    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Whole seconds until `identity` can retry, at least 1.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn retry_after_secs(&self, identity: &str) -> u64 {
        let retry = self.limiter.retry_after(identity).as_secs_f64().ceil() as u64;
        retry.max(1)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::payment::PaymentVerifierConfig;

    fn unpaid_gate(config: GateConfig) -> Paywall {
        // No collaborators attached: every verification fails.
        Paywall::new(config, PaymentVerifier::new(PaymentVerifierConfig::default()))
    }

    #[tokio::test]
    async fn test_payment_required_payload_shape() {
        let gate = unpaid_gate(GateConfig::new("search", 0.01));
        let headers = RequestHeaders::new().with("X-User-ID", "u1");

        let Decision::Rejected(rejection) = gate.decide(&headers).await else {
            panic!("expected rejection");
        };
        assert_eq!(rejection.status(), 402);

        let json = serde_json::to_value(&rejection).expect("serialize");
        assert_eq!(json["error"], "Payment required");
        assert!((json["price"].as_f64().expect("price") - 0.01).abs() < f64::EPSILON);
        assert_eq!(json["currency"], "USD");
        assert_eq!(json["phone_required"], false);
        assert!(json["payment_endpoint"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_phone_required_precedes_payment() {
        let config = GateConfig {
            phone_required: true,
            ..GateConfig::new("search", 0.01)
        };
        let gate = unpaid_gate(config);
        let headers = RequestHeaders::new().with("X-User-ID", "u1");

        let Decision::Rejected(rejection) = gate.decide(&headers).await else {
            panic!("expected rejection");
        };
        let json = serde_json::to_value(&rejection).expect("serialize");
        assert_eq!(json["error"], "Phone verification required");
        assert_eq!(rejection.status(), 402);
        assert!(json["verify_url"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_rate_limited_payload_shape() {
        let config = GateConfig {
            rate_limit: Some(1),
            ..GateConfig::new("search", 0.01)
        };
        let gate = unpaid_gate(config);
        let headers = RequestHeaders::new().with("X-User-ID", "u2");

        // First request consumes the only slot (and fails payment).
        let first = gate.decide(&headers).await;
        assert!(matches!(
            first,
            Decision::Rejected(Rejection::Payment(_))
        ));

        let Decision::Rejected(rejection) = gate.decide(&headers).await else {
            panic!("expected rejection");
        };
        assert_eq!(rejection.status(), 429);
        let json = serde_json::to_value(&rejection).expect("serialize");
        assert_eq!(json["error"], "Rate limit exceeded");
        assert_eq!(json["requests_per_minute"], 1);
        let retry = json["retry_after"].as_u64().expect("retry_after");
        assert!(retry >= 1 && retry <= 60);
    }

    #[tokio::test]
    async fn test_absent_identity_bypasses_rate_limit() {
        let config = GateConfig {
            rate_limit: Some(1),
            ..GateConfig::new("search", 0.01)
        };
        let gate = unpaid_gate(config);
        let headers = RequestHeaders::new();

        // Several anonymous requests; none is ever rate limited, all fall
        // through to the payment check.
        for _ in 0..3 {
            let decision = gate.decide(&headers).await;
            assert!(matches!(
                decision,
                Decision::Rejected(Rejection::Payment(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_rejected_request_is_not_billed() {
        let gate = unpaid_gate(GateConfig::new("search", 0.01));
        let headers = RequestHeaders::new().with("X-User-ID", "u1");

        let result = gate.guard(&headers, || async { "handled" }).await;
        assert!(result.is_err());
        assert!(gate.usage().snapshot().is_empty());
    }
}
