//! Authentication configuration.

/// Configuration for token issuance and verification.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for HS256 signing.
    pub jwt_secret: String,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Access token lifetime in seconds (default: 300 = 5 minutes).
    pub access_token_ttl_secs: u64,
    /// Refresh token lifetime in seconds (default: 86_400 = 1 day).
    pub refresh_token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret".into(),
            jwt_issuer: "orgdir".into(),
            access_token_ttl_secs: 300,
            refresh_token_ttl_secs: 86_400,
        }
    }
}
