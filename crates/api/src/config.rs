//! Process configuration, read from environment variables.

use core::str::FromStr;

use thiserror::Error;

use orgdir_auth::AuthConfig;
use orgdir_infra::HttpIpLookup;

/// What to do when a freshly created user cannot be linked to its role group.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum GroupLinkFailure {
    /// Log a warning and keep the user without the group.
    #[default]
    Ignore,
    /// Remove the user again and fail the request.
    Fail,
}

impl FromStr for GroupLinkFailure {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(GroupLinkFailure::Ignore),
            "fail" => Ok(GroupLinkFailure::Fail),
            other => Err(ConfigError::invalid("GROUP_LINK_FAILURE", format!("'{other}' is not one of: ignore, fail"))),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,
}

impl ConfigError {
    fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub auth: AuthConfig,
    pub ip_lookup_url: String,
    pub group_link_failure: GroupLinkFailure,
    /// `Some` when `USE_PERSISTENT_STORES=true`.
    pub database_url: Option<String>,
    pub seed_demo_data: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            auth: AuthConfig::default(),
            ip_lookup_url: HttpIpLookup::DEFAULT_URL.to_string(),
            group_link_failure: GroupLinkFailure::default(),
            database_url: None,
            seed_demo_data: false,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            defaults.auth.jwt_secret.clone()
        });

        let auth = AuthConfig {
            jwt_secret,
            jwt_issuer: get("JWT_ISSUER").unwrap_or(defaults.auth.jwt_issuer),
            access_token_ttl_secs: parse_or("ACCESS_TOKEN_TTL_SECS", get("ACCESS_TOKEN_TTL_SECS"), defaults.auth.access_token_ttl_secs)?,
            refresh_token_ttl_secs: parse_or("REFRESH_TOKEN_TTL_SECS", get("REFRESH_TOKEN_TTL_SECS"), defaults.auth.refresh_token_ttl_secs)?,
        };

        let use_persistent = parse_or("USE_PERSISTENT_STORES", get("USE_PERSISTENT_STORES"), false)?;
        let database_url = if use_persistent {
            Some(get("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?)
        } else {
            None
        };

        let group_link_failure = match get("GROUP_LINK_FAILURE") {
            Some(raw) => raw.parse()?,
            None => defaults.group_link_failure,
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            auth,
            ip_lookup_url: get("IP_LOOKUP_URL").unwrap_or(defaults.ip_lookup_url),
            group_link_failure,
            database_url,
            seed_demo_data: parse_or("SEED_DEMO_DATA", get("SEED_DEMO_DATA"), false)?,
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::invalid(key, format!("'{raw}': {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.auth.access_token_ttl_secs, 300);
        assert_eq!(cfg.auth.refresh_token_ttl_secs, 86_400);
        assert_eq!(cfg.ip_lookup_url, "https://api.ipify.org");
        assert_eq!(cfg.group_link_failure, GroupLinkFailure::Ignore);
        assert_eq!(cfg.database_url, None);
        assert!(!cfg.seed_demo_data);
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            ("JWT_SECRET", "s3cret"),
            ("ACCESS_TOKEN_TTL_SECS", "60"),
            ("GROUP_LINK_FAILURE", "Fail"),
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://localhost/orgdir"),
            ("SEED_DEMO_DATA", "true"),
        ])
        .unwrap();
        assert_eq!(cfg.auth.jwt_secret, "s3cret");
        assert_eq!(cfg.auth.access_token_ttl_secs, 60);
        assert_eq!(cfg.group_link_failure, GroupLinkFailure::Fail);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/orgdir"));
        assert!(cfg.seed_demo_data);
    }

    #[test]
    fn persistent_stores_require_database_url() {
        assert_eq!(
            config(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err(),
            ConfigError::MissingDatabaseUrl
        );
    }

    #[test]
    fn malformed_values_name_the_variable() {
        let err = config(&[("ACCESS_TOKEN_TTL_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ACCESS_TOKEN_TTL_SECS", .. }));

        let err = config(&[("GROUP_LINK_FAILURE", "retry")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "GROUP_LINK_FAILURE", .. }));
    }
}
