//! Caller identity derivation.
//!
//! An identity is an opaque string recomputed per request from request
//! metadata; it is the key for the verification cache, the rate limiter and
//! the usage ledger, so derivation must be deterministic: the same credential
//! always yields the same identity string within a process run.
//!
//! Two schemes are provided:
//! - [`extract`]: credential-based (explicit ID header, bearer token, wallet
//!   address), used when callers authenticate themselves.
//! - [`CallerRegistry`]: network-based (client IP), used for anonymous
//!   callers such as crawlers.

mod registry;

pub use registry::{CallerInfo, CallerRegistry};

use crate::request::{RequestHeaders, USER_ID};
use sha2::{Digest, Sha256};

/// Hex characters of the token hash kept in a derived identity.
const TOKEN_HASH_LEN: usize = 16;

/// Characters of the wallet address kept in a derived identity.
const WALLET_PREFIX_LEN: usize = 8;

/// Derive the caller identity from request headers.
///
/// Resolution order, first match wins:
/// 1. `X-User-ID` header, used verbatim.
/// 2. Bearer token, hashed to `user_<hash>`.
/// 3. Wallet address, truncated to `wallet_<prefix>`.
///
/// Returns `None` when no identifying credential is present. An absent
/// identity bypasses rate limiting and degrades the cache key; payment
/// checks still run (and fail, since there is no credential to verify).
#[must_use]
pub fn extract(headers: &RequestHeaders) -> Option<String> {
    if let Some(user_id) = headers.get(USER_ID) {
        return Some(user_id.to_string());
    }
    if let Some(token) = headers.auth_token() {
        return Some(format!("user_{}", token_hash(token)));
    }
    if let Some(wallet) = headers.wallet_address() {
        let prefix: String = wallet.chars().take(WALLET_PREFIX_LEN).collect();
        return Some(format!("wallet_{prefix}"));
    }
    None
}

/// Fixed-length hex digest of a bearer token.
fn token_hash(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(TOKEN_HASH_LEN);
    hash
}
