//! Access guard
//!
//! `require_token` extracts and validates the bearer token;
//! `require_role` compares the embedded role verbatim. Roles have no
//! hierarchy: an admin token does not pass a customer check or vice
//! versa. Because the role is baked into the token at issuance, role
//! changes only take effect on re-login.

use axum::http::{header::AUTHORIZATION, HeaderMap};

use super::store::{AuthError, Role};
use super::token::{AuthClaims, TokenService};

/// Extract the bearer token from the request headers and validate it
pub fn require_token(tokens: &TokenService, headers: &HeaderMap) -> Result<AuthClaims, AuthError> {
    let header = headers.get(AUTHORIZATION).ok_or_else(|| {
        AuthError::Unauthenticated("Missing authorization header".to_string())
    })?;
    let value = header
        .to_str()
        .map_err(|_| AuthError::Unauthenticated("Invalid authorization header".to_string()))?;
    let token = value.strip_prefix("Bearer ").ok_or_else(|| {
        AuthError::Unauthenticated("Authorization scheme must be Bearer".to_string())
    })?;

    tokens
        .validate(token)
        .map_err(|err| AuthError::Unauthenticated(err.to_string()))
}

/// Require the exact role embedded in the claims
pub fn require_role(claims: &AuthClaims, expected: Role) -> Result<(), AuthError> {
    if claims.role != expected.as_str() {
        return Err(AuthError::Forbidden(format!(
            "Requires role '{}'",
            expected.as_str()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", 1800)
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn accepts_valid_bearer_token() {
        let tokens = service();
        let issued = tokens.issue("a@b.com", Role::Customer, 7).unwrap();
        let headers = headers_with(&format!("Bearer {}", issued.token));

        let claims = require_token(&tokens, &headers).unwrap();
        assert_eq!(claims.uid, 7);
    }

    #[test]
    fn rejects_missing_header() {
        let result = require_token(&service(), &HeaderMap::new());
        assert!(matches!(result, Err(AuthError::Unauthenticated(_))));
    }

    #[test]
    fn rejects_wrong_scheme_before_validation() {
        let headers = headers_with("Basic abc123");
        let result = require_token(&service(), &headers);
        assert!(matches!(result, Err(AuthError::Unauthenticated(_))));
    }

    #[test]
    fn rejects_expired_token() {
        let tokens = TokenService::new("test-secret", -120);
        let issued = tokens.issue("a@b.com", Role::Customer, 7).unwrap();
        let headers = headers_with(&format!("Bearer {}", issued.token));

        let result = require_token(&tokens, &headers);
        assert!(matches!(result, Err(AuthError::Unauthenticated(_))));
    }

    #[test]
    fn role_check_is_exact_in_both_directions() {
        let tokens = service();
        let admin = tokens.issue("admin@b.com", Role::Admin, 1).unwrap();
        let customer = tokens.issue("cust@b.com", Role::Customer, 2).unwrap();
        let admin_claims = tokens.validate(&admin.token).unwrap();
        let customer_claims = tokens.validate(&customer.token).unwrap();

        assert!(require_role(&admin_claims, Role::Admin).is_ok());
        assert!(require_role(&customer_claims, Role::Customer).is_ok());

        // No hierarchy: admin does not pass a customer gate
        assert!(matches!(
            require_role(&admin_claims, Role::Customer),
            Err(AuthError::Forbidden(_))
        ));
        assert!(matches!(
            require_role(&customer_claims, Role::Admin),
            Err(AuthError::Forbidden(_))
        ));
    }
}
