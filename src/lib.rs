//! # paygate
//!
//! Payment-gated request middleware for paid API endpoints.
//!
//! Given a request's headers, a [`Paywall`] gate returns one of four
//! outcomes - allow, payment required, phone verification required, or rate
//! limited - while avoiding redundant expensive verification (token
//! signature checks, on-chain lookups) through a time-bounded cache keyed by
//! caller identity, and enforcing an independent sliding-window rate limit
//! per identity. Allowed requests are billed to a per-caller usage ledger.
//!
//! The HTTP framework, token scheme, chain indexer and phone-verification
//! store are all external collaborators behind narrow traits
//! ([`TokenVerifier`], [`ChainClient`], [`PhoneVerifier`]); this crate is
//! the decision core, not a web layer or a payment processor. All gate
//! state is in-memory and process-lifetime only.
//!
//! ## Example
//!
//! ```rust,no_run
//! use paygate::{
//!     GateConfig, JwtVerifier, PaymentVerifier, PaymentVerifierConfig, Paywall, RequestHeaders,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let verifier = PaymentVerifier::new(PaymentVerifierConfig::default())
//!         .with_token_verifier(Arc::new(JwtVerifier::new("signing-key")));
//!     let gate = Paywall::new(GateConfig::new("search", 0.01), verifier);
//!
//!     let headers = RequestHeaders::new()
//!         .with("X-User-ID", "u1")
//!         .with("Authorization", "Bearer <token>");
//!     match gate.guard(&headers, || async { "results" }).await {
//!         Ok(body) => println!("{body}"),
//!         Err(rejection) => println!("{} {:?}", rejection.status(), rejection),
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod gate;
pub mod identity;
pub mod payment;
pub mod phone;
pub mod rate_limit;
pub mod request;
pub mod usage;

pub use config::GateConfig;
pub use error::{Error, Result};
pub use gate::{Decision, PaymentRequired, Paywall, PhoneRequired, RateLimited, Rejection};
pub use identity::{CallerInfo, CallerRegistry};
pub use payment::{
    BalanceDelta, CacheStats, ChainClient, ChainClientConfig, Credentials, HttpChainClient,
    JwtVerifier, PaymentVerifier, PaymentVerifierConfig, TokenClaims, TokenVerifier,
    VerificationCache,
};
pub use phone::{HeaderPhoneVerifier, PhoneVerifier};
pub use rate_limit::RateLimiter;
pub use request::RequestHeaders;
pub use usage::{UsageReport, UsageTracker};
