//! Payment verification for paygate.
//!
//! Verification is the expensive part of a gate decision, so it is split in
//! two layers: the collaborators that actually check a credential, and a
//! time-bounded cache in front of them.
//!
//! ```text
//! gate decision
//!       │
//!       ▼
//! ┌─────────────────────┐
//! │ VerificationCache   │
//! └─────────┬───────────┘
//!           │
//!    ┌──────┴──────┐
//!    │             │
//!   HIT          MISS
//!    │             │
//!    ▼             ▼
//! cached bool  PaymentVerifier
//!                  │
//!           ┌──────┴──────┐
//!           │             │
//!     TokenVerifier   ChainClient
//!     (signed token)  (wallet deltas)
//! ```
//!
//! Either credential path sufficing; collaborator failures are logged and
//! fail closed.

mod cache;
mod chain;
mod token;
mod verifier;

pub use cache::{CacheStats, VerificationCache};
pub use chain::{BalanceDelta, ChainClient, ChainClientConfig, HttpChainClient};
pub use token::{JwtVerifier, TokenClaims, TokenVerifier};
pub use verifier::{Credentials, PaymentVerifier, PaymentVerifierConfig};
