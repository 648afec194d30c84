//! Token credential verification.
//!
//! The gate only needs the claims out of a token; signature and expiry
//! validation live behind the [`TokenVerifier`] trait so hosts can plug in
//! whatever token scheme they issue. [`JwtVerifier`] is the shipped
//! implementation for HS256-signed JWTs.

use crate::error::{Error, Result};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

/// Claims the gate reads out of a payment token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Declared paid amount.
    #[serde(default)]
    pub amount: f64,
    /// Identity the token is bound to, if any. A bound token only verifies
    /// for requests claiming the same identity.
    #[serde(default, rename = "sub")]
    pub subject: Option<String>,
    /// Phone number bound into the token, if any.
    #[serde(default)]
    pub phone: Option<String>,
    /// Expiry as seconds since the epoch.
    #[serde(default)]
    pub exp: u64,
}

/// Decodes and validates payment tokens.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Decode `token`, validating signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed, mis-signed or expired tokens. The
    /// payment verifier treats any error as a failed verification.
    async fn decode(&self, token: &str) -> Result<TokenClaims>;
}

/// HS256 JWT verifier.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Create a verifier for tokens signed with `secret`.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn decode(&self, token: &str) -> Result<TokenClaims> {
        jsonwebtoken::decode::<TokenClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| Error::Token(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &str = "test-signing-key";

    fn sign(claims: &serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encode")
    }

    fn future_exp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_secs()
            + 3600
    }

    #[tokio::test]
    async fn test_decode_valid_token() {
        let token = sign(
            &json!({"amount": 0.02, "sub": "u1", "exp": future_exp()}),
            SECRET,
        );
        let claims = JwtVerifier::new(SECRET)
            .decode(&token)
            .await
            .expect("valid token");
        assert!((claims.amount - 0.02).abs() < f64::EPSILON);
        assert_eq!(claims.subject.as_deref(), Some("u1"));
        assert_eq!(claims.phone, None);
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let token = sign(&json!({"amount": 0.02, "exp": future_exp()}), "other-key");
        assert!(JwtVerifier::new(SECRET).decode(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let token = sign(&json!({"amount": 0.02, "exp": 1_000_000}), SECRET);
        assert!(JwtVerifier::new(SECRET).decode(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let result = JwtVerifier::new(SECRET).decode("not-a-jwt").await;
        assert!(matches!(result, Err(Error::Token(_))));
    }
}
