//! Access-token plumbing: issuing JWTs at login/registration and validating them on every `/api` request.
//!
//! Tokens are HS256 with a shared secret ([`AuthConfig`]). A token carries the customer id, username and roles,
//! and is valid for 24 hours. There is no refresh flow; clients log in again when the token lapses.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shoppit_engine::db_types::{Customer, Roles};

use crate::{config::AuthConfig, errors::AuthError};

const TOKEN_VALIDITY: Duration = Duration::hours(24);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The customer id.
    pub sub: i64,
    pub username: String,
    pub roles: Roles,
    pub iat: i64,
    pub exp: i64,
}

/// Extracts the validated claims that [`JwtMiddleware`][crate::middleware::JwtMiddlewareFactory] stored on the
/// request. Handlers simply take a `JwtClaims` argument.
impl FromRequest for JwtClaims {
    type Error = crate::errors::ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned();
        ready(claims.ok_or_else(|| AuthError::MissingToken.into()))
    }
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        Self { encoding_key }
    }

    /// Issue an access token for the given customer. The caller is responsible for having authenticated the
    /// customer and looked up their roles first.
    pub fn issue_token(&self, customer: &Customer, roles: Roles) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: customer.id,
            username: customer.username.clone(),
            roles,
            iat: now.timestamp(),
            exp: (now + TOKEN_VALIDITY).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}

/// Validate a bearer token and return its claims. Expiry is enforced by `jsonwebtoken`'s default validation.
pub fn validate_token(token: &str, config: &AuthConfig) -> Result<JwtClaims, AuthError> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
    let data = decode::<JwtClaims>(token, &decoding_key, &Validation::default())
        .map_err(|e| AuthError::ValidationError(e.to_string()))?;
    Ok(data.claims)
}

/// Pull the token out of an `Authorization: Bearer ...` header value.
pub fn bearer_token(header_value: &str) -> Result<&str, AuthError> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::PoorlyFormattedToken("expected 'Bearer <token>'".to_string()))
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use shop_common::Secret;
    use shoppit_engine::db_types::Role;

    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig { jwt_secret: Secret::new("a-test-secret-that-is-long-enough!".to_string()) }
    }

    fn customer() -> Customer {
        Customer {
            id: 42,
            username: "amina".to_string(),
            email: "amina@example.com".to_string(),
            first_name: None,
            last_name: None,
            phone: None,
            city: None,
            state: None,
            address: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issued_tokens_validate() {
        let config = test_config();
        let issuer = TokenIssuer::new(&config);
        let token = issuer.issue_token(&customer(), vec![Role::User, Role::Write]).unwrap();
        let claims = validate_token(&token, &config).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.username, "amina");
        assert_eq!(claims.roles, vec![Role::User, Role::Write]);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let issuer = TokenIssuer::new(&test_config());
        let token = issuer.issue_token(&customer(), vec![Role::User]).unwrap();
        let other = AuthConfig { jwt_secret: Secret::new("a-different-secret-also-long-enough".to_string()) };
        assert!(validate_token(&token, &other).is_err());
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert!(bearer_token("abc.def.ghi").is_err());
        assert!(bearer_token("Bearer ").is_err());
    }
}
