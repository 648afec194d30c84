//! Request boundary: the header view the gate consumes.
//!
//! The HTTP framework and routing layer are external to this crate; a
//! [`RequestHeaders`] value is the narrow interface a host adapter fills in
//! from whatever request type it has. Lookup is case-insensitive, matching
//! HTTP header semantics.

use std::collections::HashMap;

/// `Authorization` header, optionally `Bearer `-prefixed.
pub const AUTHORIZATION: &str = "Authorization";
/// Explicit caller identity header.
pub const USER_ID: &str = "X-User-ID";
/// Wallet address header for on-chain payment verification.
pub const WALLET_ADDRESS: &str = "X-Wallet-Address";
/// Phone number supplied by the caller.
pub const PHONE_NUMBER: &str = "X-Phone-Number";
/// Host-asserted phone verification flag (`"true"` when verified).
pub const PHONE_VERIFIED: &str = "X-Phone-Verified";

/// Proxy headers checked for the real client IP, in precedence order.
/// `X-Forwarded-For` may carry a comma-separated chain; the first entry is
/// the originating client.
const IP_HEADERS: [&str; 7] = [
    "X-Forwarded-For",
    "X-Real-IP",
    "X-Client-IP",
    "CF-Connecting-IP",
    "X-Forwarded",
    "Forwarded-For",
    "Forwarded",
];

/// Case-insensitive header map handed to the gate by the host adapter.
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders {
    headers: HashMap<String, String>,
    /// Direct peer address, used when no proxy header identifies the client.
    peer_addr: Option<String>,
}

impl RequestHeaders {
    /// Create an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any previous value for the same name.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Record the direct peer address of the connection.
    #[must_use]
    pub fn with_peer_addr(mut self, addr: impl Into<String>) -> Self {
        self.peer_addr = Some(addr.into());
        self
    }

    /// Look up a header by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Bearer token from the `Authorization` header, with or without the
    /// `Bearer ` prefix.
    #[must_use]
    pub fn auth_token(&self) -> Option<&str> {
        let raw = self.get(AUTHORIZATION)?;
        Some(raw.strip_prefix("Bearer ").unwrap_or(raw).trim())
    }

    /// Wallet address, if the caller supplied one.
    #[must_use]
    pub fn wallet_address(&self) -> Option<&str> {
        self.get(WALLET_ADDRESS)
    }

    /// Best-effort client IP: first proxy header that carries one, else the
    /// direct peer address.
    #[must_use]
    pub fn client_ip(&self) -> Option<&str> {
        for header in IP_HEADERS {
            if let Some(value) = self.get(header) {
                let first = value.split(',').next().unwrap_or(value).trim();
                if !first.is_empty() {
                    return Some(first);
                }
            }
        }
        self.peer_addr.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let headers = RequestHeaders::new().with("X-User-ID", "u1");
        assert_eq!(headers.get("x-user-id"), Some("u1"));
        assert_eq!(headers.get("X-USER-ID"), Some("u1"));
        assert_eq!(headers.get("X-Wallet-Address"), None);
    }

    #[test]
    fn test_auth_token_strips_bearer() {
        let headers = RequestHeaders::new().with(AUTHORIZATION, "Bearer tok_123");
        assert_eq!(headers.auth_token(), Some("tok_123"));

        let bare = RequestHeaders::new().with(AUTHORIZATION, "tok_123");
        assert_eq!(bare.auth_token(), Some("tok_123"));

        assert_eq!(RequestHeaders::new().auth_token(), None);
    }

    #[test]
    fn test_client_ip_precedence() {
        let headers = RequestHeaders::new()
            .with("X-Real-IP", "10.0.0.2")
            .with("X-Forwarded-For", "203.0.113.7, 10.0.0.1");
        assert_eq!(headers.client_ip(), Some("203.0.113.7"));
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let headers = RequestHeaders::new().with_peer_addr("192.0.2.9");
        assert_eq!(headers.client_ip(), Some("192.0.2.9"));
        assert_eq!(RequestHeaders::new().client_ip(), None);
    }
}
