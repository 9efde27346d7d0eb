//! # lb-auth-jwt
//!
//! HS256 bearer-token implementation of `AuthProvider`.
//! The token's `sub` claim is the owner id every life block is filtered by.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lb_core::error::{AppError, Result};
use lb_core::traits::AuthProvider;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: u64,
    exp: u64,
}

pub struct JwtAuthProvider {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    /// Lifetime of issued tokens, in seconds.
    token_ttl_secs: i64,
}

impl JwtAuthProvider {
    /// `secret` is the shared HMAC key (e.g., from `auth.jwt_secret`).
    pub fn new(secret: &[u8], token_ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            token_ttl_secs,
        }
    }

    /// Signs a token for `user_id`. Used by local tooling and tests; real
    /// deployments are expected to get tokens from their identity service.
    pub fn issue_token(&self, user_id: &str) -> anyhow::Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.max(0) as u64,
            exp: (now + self.token_ttl_secs).max(0) as u64,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }
}

impl AuthProvider for JwtAuthProvider {
    fn verify_token(&self, token: &str) -> Result<String> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            log::debug!("rejected bearer token: {e}");
            AppError::Unauthorized("invalid or expired token".to_string())
        })?;

        if data.claims.sub.is_empty() {
            return Err(AppError::Unauthorized("token has no subject".to_string()));
        }
        Ok(data.claims.sub)
    }
}
