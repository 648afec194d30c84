//! Phone-verification collaborator.
//!
//! OTP delivery and verified-number storage live outside this crate; the
//! gate only asks a yes/no question per request. [`HeaderPhoneVerifier`]
//! trusts a host-asserted header, for deployments where an upstream proxy or
//! session layer has already done the check.

use crate::request::{RequestHeaders, PHONE_VERIFIED};
use async_trait::async_trait;

/// Answers whether the caller's phone is currently verified.
#[async_trait]
pub trait PhoneVerifier: Send + Sync {
    /// Check the caller's phone-verification status.
    ///
    /// Any lookup failure should be reported as `false` (fail-closed).
    async fn is_verified(&self, identity: Option<&str>, headers: &RequestHeaders) -> bool;
}

/// [`PhoneVerifier`] that trusts the `X-Phone-Verified` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderPhoneVerifier;

#[async_trait]
impl PhoneVerifier for HeaderPhoneVerifier {
    async fn is_verified(&self, _identity: Option<&str>, headers: &RequestHeaders) -> bool {
        headers
            .get(PHONE_VERIFIED)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }
}
