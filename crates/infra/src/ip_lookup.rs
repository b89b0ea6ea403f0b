//! Public IP address lookup for the `/info` endpoint.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct IpLookupError(pub String);

/// Resolves the public IP address the service is reachable from.
#[async_trait]
pub trait PublicIpLookup: Send + Sync {
    async fn public_ip(&self) -> Result<String, IpLookupError>;
}

/// Plain-text IP echo service over HTTP (ipify by default).
#[derive(Debug, Clone)]
pub struct HttpIpLookup {
    client: reqwest::Client,
    url: String,
}

impl HttpIpLookup {
    pub const DEFAULT_URL: &'static str = "https://api.ipify.org";

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl Default for HttpIpLookup {
    fn default() -> Self {
        Self::new(Self::DEFAULT_URL)
    }
}

#[async_trait]
impl PublicIpLookup for HttpIpLookup {
    async fn public_ip(&self) -> Result<String, IpLookupError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| IpLookupError(e.to_string()))?;

        let body = response.text().await.map_err(|e| IpLookupError(e.to_string()))?;
        Ok(body.trim().to_string())
    }
}

/// Fixed answer, for tests and offline development.
#[derive(Debug, Clone)]
pub struct StaticIpLookup(pub Result<String, IpLookupError>);

impl StaticIpLookup {
    pub fn ok(ip: impl Into<String>) -> Self {
        Self(Ok(ip.into()))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self(Err(IpLookupError(message.into())))
    }
}

#[async_trait]
impl PublicIpLookup for StaticIpLookup {
    async fn public_ip(&self) -> Result<String, IpLookupError> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_lookup_returns_configured_answer() {
        assert_eq!(StaticIpLookup::ok("203.0.113.7").public_ip().await.unwrap(), "203.0.113.7");
        assert_eq!(
            StaticIpLookup::failing("offline").public_ip().await,
            Err(IpLookupError("offline".into()))
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let lookup = HttpIpLookup::new("http://127.0.0.1:9/");
        assert!(lookup.public_ip().await.is_err());
    }
}
