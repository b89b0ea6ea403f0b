//! HS256 access/refresh token issuance and verification.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use uuid::Uuid;

use orgdir_core::UserId;

use crate::claims::{JwtClaims, TokenType, validate_claims};
use crate::config::AuthConfig;
use crate::error::AuthError;

/// Access + refresh token pair returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signs and verifies the JWTs handed out by `/auth/login`.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    config: AuthConfig,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.config.jwt_issuer)
            .field("access_token_ttl_secs", &self.config.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.config.refresh_token_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(config: AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Build (unsigned) claims for `user_id`, valid from `now`.
    ///
    /// Fails when the configured lifetime pushes `exp` past what a timestamp
    /// can represent.
    pub fn claims_for(
        &self,
        user_id: UserId,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<JwtClaims, AuthError> {
        let ttl_secs = match token_type {
            TokenType::Access => self.config.access_token_ttl_secs,
            TokenType::Refresh => self.config.refresh_token_ttl_secs,
        };
        let exp = i64::try_from(ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(AuthError::TokenLifetimeOutOfRange {
                token_type: token_type.as_str(),
                ttl_secs,
            })?;

        Ok(JwtClaims {
            sub: user_id,
            token_type,
            iss: self.config.jwt_issuer.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4(),
        })
    }

    pub fn encode(&self, claims: &JwtClaims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::TokenInvalid(format!("encode: {e}")))
    }

    pub fn issue(&self, user_id: UserId, token_type: TokenType, now: DateTime<Utc>) -> Result<String, AuthError> {
        self.encode(&self.claims_for(user_id, token_type, now)?)
    }

    pub fn issue_pair(&self, user_id: UserId, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenType::Access, now)?,
            refresh: self.issue(user_id, TokenType::Refresh, now)?,
        })
    }

    /// Verify signature + issuer, then check the time window against `now`
    /// and that the token is of the `expected` type.
    pub fn decode(&self, token: &str, expected: TokenType, now: DateTime<Utc>) -> Result<JwtClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.jwt_issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);
        // Expiry is checked by `validate_claims` against the caller-supplied clock.
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::TokenInvalid(e.to_string()))?;

        validate_claims(&claims, now)?;

        if claims.token_type != expected {
            return Err(AuthError::WrongTokenType {
                expected: expected.as_str(),
            });
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::TokenValidationError;

    fn codec() -> TokenCodec {
        TokenCodec::new(AuthConfig {
            jwt_secret: "test-secret".into(),
            jwt_issuer: "orgdir-test".into(),
            access_token_ttl_secs: 60,
            refresh_token_ttl_secs: 3600,
        })
    }

    #[test]
    fn access_token_roundtrip() {
        let codec = codec();
        let user_id = UserId::new();
        let now = Utc::now();

        let pair = codec.issue_pair(user_id, now).unwrap();
        let claims = codec.decode(&pair.access, TokenType::Access, now).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "orgdir-test");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let codec = codec();
        let now = Utc::now();
        let pair = codec.issue_pair(UserId::new(), now).unwrap();

        let err = codec.decode(&pair.refresh, TokenType::Access, now).unwrap_err();
        assert_eq!(err, AuthError::WrongTokenType { expected: "access" });
        assert!(codec.decode(&pair.refresh, TokenType::Refresh, now).is_ok());
    }

    #[test]
    fn expired_access_token_is_rejected() {
        let codec = codec();
        let issued = Utc::now() - TimeDelta::minutes(5);
        let token = codec.issue(UserId::new(), TokenType::Access, issued).unwrap();

        let err = codec.decode(&token, TokenType::Access, Utc::now()).unwrap_err();
        assert_eq!(err, AuthError::TokenRejected(TokenValidationError::Expired));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = TokenCodec::new(AuthConfig {
            jwt_secret: "another-secret".into(),
            ..codec().config().clone()
        });
        let now = Utc::now();
        let token = other.issue(UserId::new(), TokenType::Access, now).unwrap();

        assert!(matches!(
            codec().decode(&token, TokenType::Access, now),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn jti_is_unique() {
        let codec = codec();
        let now = Utc::now();
        let uid = UserId::new();
        let a = codec.claims_for(uid, TokenType::Access, now).unwrap();
        let b = codec.claims_for(uid, TokenType::Access, now).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn unrepresentable_lifetime_is_an_error() {
        let codec = TokenCodec::new(AuthConfig {
            access_token_ttl_secs: 10_000_000_000_000_000,
            refresh_token_ttl_secs: u64::MAX,
            ..codec().config().clone()
        });
        let now = Utc::now();

        assert_eq!(
            codec.issue_pair(UserId::new(), now).unwrap_err(),
            AuthError::TokenLifetimeOutOfRange {
                token_type: "access",
                ttl_secs: 10_000_000_000_000_000,
            }
        );
        assert!(matches!(
            codec.issue(UserId::new(), TokenType::Refresh, now),
            Err(AuthError::TokenLifetimeOutOfRange { token_type: "refresh", .. })
        ));
    }
}
