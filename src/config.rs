//! Client configuration with builder pattern

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Daemon address used when nothing else is configured
pub const DEFAULT_ENDPOINT: &str = "http://localhost:2375";

/// API version every request path is pinned to by default
pub const DEFAULT_API_VERSION: &str = "1.41";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub api_version: Option<String>,
    pub connect_timeout: Duration,
    /// Whole-request deadline. `None` lets `wait` and followed logs block
    /// for as long as the container runs.
    pub timeout: Option<Duration>,
    pub auth: Option<AuthConfig>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_version: Some(DEFAULT_API_VERSION.to_string()),
            connect_timeout: Duration::from_secs(10),
            timeout: None,
            auth: None,
            user_agent: format!("docker-remote/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Read `DOCKER_HOST` and `DOCKER_API_VERSION` from the environment
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("DOCKER_HOST").ok();
        let version = std::env::var("DOCKER_API_VERSION").ok();
        Self::from_env_values(host.as_deref(), version.as_deref())
    }

    fn from_env_values(host: Option<&str>, version: Option<&str>) -> Result<Self> {
        let mut config = ClientConfig::default();
        if let Some(host) = host.map(str::trim).filter(|h| !h.is_empty()) {
            config.endpoint = endpoint_from_docker_host(host)?;
        }
        if let Some(version) = version.map(str::trim).filter(|v| !v.is_empty()) {
            config.api_version = Some(version.trim_start_matches('v').to_string());
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(Error::Validation(format!(
                "endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        if let Some(version) = &self.api_version {
            let well_formed = !version.is_empty()
                && version.split('.').all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
            if !well_formed {
                return Err(Error::Validation(format!("invalid API version {:?}", version)));
            }
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(&self.endpoint, self.api_version.clone())
    }
}

fn endpoint_from_docker_host(host: &str) -> Result<String> {
    if let Some(rest) = host.strip_prefix("tcp://") {
        Ok(format!("http://{}", rest))
    } else if host.starts_with("http://") || host.starts_with("https://") {
        Ok(host.to_string())
    } else {
        Err(Error::Validation(format!(
            "unsupported DOCKER_HOST {:?}: only tcp:// and http(s):// endpoints are supported",
            host
        )))
    }
}

/// Base URL plus the API version prefix of the target daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
    api_version: Option<String>,
}

impl Endpoint {
    pub fn new(base_url: &str, api_version: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    /// Full URL for a resource path such as `/containers/json`
    pub fn url(&self, path: &str) -> String {
        match &self.api_version {
            Some(version) => format!("{}/v{}{}", self.base_url, version, path),
            None => format!("{}{}", self.base_url, path),
        }
    }
}

/// Registry credentials sent as `X-Registry-Auth` on pull and push
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "serveraddress", skip_serializing_if = "Option::is_none")]
    pub server_address: Option<String>,
}

impl AuthConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Default::default()
        }
    }

    pub fn server_address(mut self, address: impl Into<String>) -> Self {
        self.server_address = Some(address.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Base64url-encoded JSON, the form the daemon expects in the header
    pub fn header_value(&self) -> Result<String> {
        let json = crate::codec::encode(self)?;
        Ok(URL_SAFE.encode(json))
    }
}

#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = Some(version.into());
        self
    }

    /// Send unversioned paths and let the daemon pick its default
    pub fn unversioned(mut self) -> Self {
        self.config.api_version = None;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.config.auth = Some(auth);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }

    pub fn build_validated(self) -> Result<ClientConfig> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::builder()
            .endpoint("http://10.0.0.5:2375/")
            .api_version("1.43")
            .timeout(Duration::from_secs(5))
            .build();

        assert_eq!(config.endpoint, "http://10.0.0.5:2375/");
        assert_eq!(config.api_version.as_deref(), Some("1.43"));
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.endpoint().url("/info"), "http://10.0.0.5:2375/v1.43/info");
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert!(config.timeout.is_none());
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint().url("/_ping"), "http://localhost:2375/v1.41/_ping");
    }

    #[test]
    fn test_config_validation() {
        let config = ClientConfig::builder().endpoint("localhost:2375").build();
        assert!(config.validate().is_err());

        let config = ClientConfig::builder().api_version("one.two").build();
        assert!(config.validate().is_err());

        assert!(ClientConfig::builder().unversioned().build_validated().is_ok());
    }

    #[test]
    fn test_unversioned_endpoint() {
        let endpoint = Endpoint::new("http://docker:2375", None);
        assert_eq!(endpoint.url("/version"), "http://docker:2375/version");
        assert!(endpoint.api_version().is_none());
    }

    #[test]
    fn test_docker_host_values() {
        let config = ClientConfig::from_env_values(Some("tcp://127.0.0.1:4243"), Some("v1.40")).unwrap();
        assert_eq!(config.endpoint, "http://127.0.0.1:4243");
        assert_eq!(config.api_version.as_deref(), Some("1.40"));

        let config = ClientConfig::from_env_values(None, None).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);

        let err = ClientConfig::from_env_values(Some("unix:///var/run/docker.sock"), None).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_auth_header_value() {
        let auth = AuthConfig::new("jane", "s3cret").server_address("registry.local:5000");
        let header = auth.header_value().unwrap();
        let decoded = URL_SAFE.decode(header).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&decoded).unwrap();

        assert_eq!(value["username"], "jane");
        assert_eq!(value["serveraddress"], "registry.local:5000");
        assert!(value.get("email").is_none());
    }
}
