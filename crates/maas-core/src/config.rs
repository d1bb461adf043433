//! Configuration structures for MAAS controller sessions.
//!
//! [`ControllerConfig`] is the serializable, validated form suitable for config
//! files. [`ControllerArgs`] is the minimal bootstrap input a session needs:
//! where the controller lives and which API key to sign with.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::client::ClientConfig;
use crate::error::{Error, Result};
use crate::version::SUPPORTED_API_VERSIONS;

/// Bootstrap inputs for a controller session.
#[derive(Debug)]
pub struct ControllerArgs {
    /// Controller base URL, e.g. `http://maas.example.com/MAAS/`
    pub base_url: String,
    /// API key in `consumer:token:secret` form
    pub api_key: SecretString,
}

impl ControllerArgs {
    /// Create bootstrap arguments.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: SecretString::from(api_key.into()),
        }
    }
}

/// Configuration for a MAAS controller client.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ControllerConfig {
    /// Controller base URL
    #[validate(url)]
    pub base_url: String,

    /// API key for authentication
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Protocol versions to try, most desirable first
    #[validate(length(min = 1))]
    #[serde(default = "default_supported_versions")]
    pub supported_versions: Vec<String>,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,
}

fn default_supported_versions() -> Vec<String> {
    SUPPORTED_API_VERSIONS
        .iter()
        .map(|version| (*version).to_string())
        .collect()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_tls_verify() -> bool {
    true
}

impl ControllerConfig {
    /// Create a configuration for the given controller URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] if the URL is invalid.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let config = Self {
            base_url: base_url.into(),
            api_key: None,
            supported_versions: default_supported_versions(),
            request_timeout_secs: default_request_timeout_secs(),
            tls_verify: default_tls_verify(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the protocol versions to try.
    #[must_use]
    pub fn with_supported_versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_versions = versions.into_iter().map(Into::into).collect();
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// HTTP client settings derived from this configuration.
    #[must_use]
    pub const fn client_config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_timeout(self.timeout())
            .with_tls_verify(self.tls_verify)
    }

    /// Bootstrap arguments for a session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] if validation fails or no API key is set.
    pub fn to_args(&self) -> Result<ControllerArgs> {
        self.validate()?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::NotValid("missing API key".to_string()))?;
        Ok(ControllerArgs::new(self.base_url.clone(), api_key))
    }
}
