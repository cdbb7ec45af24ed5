//! Session token service
//!
//! HS256-signed JWTs carrying identity + role claims and an absolute
//! expiry. Tokens are stateless: there is no revocation list, so a token
//! stays valid until its embedded expiry regardless of later account or
//! role changes. Validation fails closed; no partial claims ever escape.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::store::Role;

const DEFAULT_JWT_SECRET: &str = "dev-jwt-secret-change-me";
const DEFAULT_TOKEN_TTL_SECONDS: i64 = 60 * 30;

/// Claim set embedded in a session token; never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaims {
    /// Subject identity (the user's email)
    pub sub: String,
    /// Role string captured at issuance; compared verbatim by the guard
    pub role: String,
    /// Numeric user id
    pub uid: i64,
    /// Absolute expiry, unix seconds
    pub exp: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("malformed token")]
    Malformed,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Unix seconds matching the embedded `exp` claim
    pub expires_at: usize,
}

/// Issues and validates session tokens with a fixed symmetric secret.
///
/// The secret and TTL are set once at construction and never mutated;
/// tests construct their own service with an explicit secret.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    ttl_seconds: i64,
}

impl TokenService {
    pub fn new(secret: impl Into<String>, ttl_seconds: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl_seconds,
        }
    }

    /// Build from `RV_JWT_SECRET` / `RV_TOKEN_TTL_SECONDS`
    pub fn from_env() -> Self {
        let secret =
            std::env::var("RV_JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());
        let ttl_seconds = std::env::var("RV_TOKEN_TTL_SECONDS")
            .ok()
            .and_then(|raw| raw.parse::<i64>().ok())
            .filter(|ttl| *ttl > 0)
            .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS);
        Self::new(secret, ttl_seconds)
    }

    /// Sign a token for the given identity with the service's TTL
    pub fn issue(&self, subject: &str, role: Role, user_id: i64) -> Result<IssuedToken, TokenError> {
        let exp = (Utc::now() + Duration::seconds(self.ttl_seconds)).timestamp();
        let exp = usize::try_from(exp)
            .map_err(|_| TokenError::Signing("expiry predates the epoch".to_string()))?;
        let claims = AuthClaims {
            sub: subject.to_string(),
            role: role.as_str().to_string(),
            uid: user_id,
            exp,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|err| TokenError::Signing(err.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at: exp,
        })
    }

    /// Verify signature, then expiry; any failure yields an error
    pub fn validate(&self, token: &str) -> Result<AuthClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<AuthClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|decoded| decoded.claims)
        .map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_validate_round_trips_claims() {
        let service = TokenService::new("test-secret", 1800);
        let issued = service.issue("a@b.com", Role::Customer, 7).unwrap();

        let claims = service.validate(&issued.token).unwrap();
        assert_eq!(claims.sub, "a@b.com");
        assert_eq!(claims.role, "customer");
        assert_eq!(claims.uid, 7);
        assert_eq!(claims.exp, issued.expires_at);
    }

    #[test]
    fn expired_token_fails_expired_not_malformed() {
        let service = TokenService::new("test-secret", -120);
        let issued = service.issue("a@b.com", Role::Customer, 7).unwrap();

        assert_eq!(service.validate(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn wrong_secret_fails_signature_check() {
        let issuing = TokenService::new("secret-one", 1800);
        let validating = TokenService::new("secret-two", 1800);
        let issued = issuing.issue("a@b.com", Role::Admin, 1).unwrap();

        assert_eq!(
            validating.validate(&issued.token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn garbage_token_is_malformed() {
        let service = TokenService::new("test-secret", 1800);
        assert_eq!(
            service.validate("not.a.token"),
            Err(TokenError::Malformed)
        );
    }
}
