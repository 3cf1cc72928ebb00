//! HS256 JSON Web Tokens.

use chrono::{Duration, Utc};
use common::UserId;
use domain::{DomainError, TokenClaims, TokenHandler};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::IntegrationError;

/// How long an issued token stays valid, in hours.
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    id: UserId,
    email: String,
    full_name: String,
    is_admin: bool,
    iat: i64,
    exp: i64,
}

/// Token handler signing with a shared secret.
pub struct JwtTokenHandler {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl JwtTokenHandler {
    pub fn new(secret: &str) -> Self {
        Self::with_lifetime(secret, Duration::hours(TOKEN_LIFETIME_HOURS))
    }

    pub fn with_lifetime(secret: &str, lifetime: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime,
        }
    }
}

impl TokenHandler for JwtTokenHandler {
    fn generate(&self, claims: &TokenClaims) -> domain::Result<String> {
        let now = Utc::now();
        let jwt = JwtClaims {
            id: claims.id.clone(),
            email: claims.email.clone(),
            full_name: claims.full_name.clone(),
            is_admin: claims.is_admin,
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &jwt, &self.encoding)
            .map_err(|e| IntegrationError::Token(e).into())
    }

    fn parse(&self, token: &str) -> domain::Result<TokenClaims> {
        let data = decode::<JwtClaims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            DomainError::Unauthenticated
        })?;
        let claims = data.claims;
        Ok(TokenClaims {
            id: claims.id,
            email: claims.email,
            full_name: claims.full_name,
            is_admin: claims.is_admin,
        })
    }
}
