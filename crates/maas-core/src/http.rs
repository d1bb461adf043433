//! OAuth-signed HTTP transport built on `reqwest`.
//!
//! MAAS API keys have the form `consumer_key:token_key:token_secret`. Every
//! request carries an OAuth 1.0 PLAINTEXT `Authorization` header derived from
//! them, with a fresh nonce and timestamp.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use url::{form_urlencoded, Url};
use uuid::Uuid;

use crate::client::ClientConfig;
use crate::error::TransportError;
use crate::transport::{ensure_trailing_slash, Connector, RequestDescriptor, Transport};
use crate::version::ProtocolVersion;

/// OAuth credentials parsed from an API key.
#[derive(Debug)]
pub struct Credentials {
    consumer_key: String,
    token_key: String,
    token_secret: SecretString,
}

impl Credentials {
    /// Parse a `consumer_key:token_key:token_secret` API key.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidCredentials`] unless the key has exactly
    /// three `:`-separated parts.
    pub fn parse(api_key: &SecretString) -> Result<Self, TransportError> {
        let parts: Vec<&str> = api_key.expose_secret().split(':').collect();
        match parts.as_slice() {
            [consumer_key, token_key, token_secret] => Ok(Self {
                consumer_key: (*consumer_key).to_string(),
                token_key: (*token_key).to_string(),
                token_secret: SecretString::from((*token_secret).to_string()),
            }),
            _ => Err(TransportError::InvalidCredentials(format!(
                "API key must have 3 parts separated by ':', got {}",
                parts.len()
            ))),
        }
    }

    /// The consumer key.
    #[must_use]
    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    /// The token key.
    #[must_use]
    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    /// Build the `Authorization` header value for one request.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        // The consumer secret is always empty for MAAS keys.
        let signature = format!("&{}", self.token_secret.expose_secret());
        let nonce = Uuid::new_v4().to_string();
        let timestamp = Utc::now().timestamp().to_string();

        let fields = [
            ("realm", ""),
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_token", self.token_key.as_str()),
            ("oauth_signature_method", "PLAINTEXT"),
            ("oauth_signature", signature.as_str()),
            ("oauth_nonce", nonce.as_str()),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_version", "1.0"),
        ];

        let rendered: Vec<String> = fields
            .iter()
            .map(|(key, value)| {
                let escaped: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
                format!("{key}=\"{escaped}\"")
            })
            .collect();

        format!("OAuth {}", rendered.join(", "))
    }
}

/// Build the versioned API root: `<base>/api/<version>/`.
///
/// # Errors
///
/// Returns [`TransportError::InvalidEndpoint`] if the result is not a URL.
pub fn api_url(base_url: &str, version: &ProtocolVersion) -> Result<Url, TransportError> {
    let url = format!("{}api/{version}/", ensure_trailing_slash(base_url));
    Url::parse(&url).map_err(|err| {
        TransportError::InvalidEndpoint(format!("invalid MAAS base URL `{base_url}`: {err}"))
    })
}

/// Transport that signs each request and talks HTTP via `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    api_url: Url,
    credentials: Arc<Credentials>,
}

impl HttpTransport {
    /// Create a transport for `version` of the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidCredentials`] for a malformed key,
    /// [`TransportError::InvalidEndpoint`] for a bad URL, or
    /// [`TransportError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: &SecretString,
        version: &ProtocolVersion,
        config: &ClientConfig,
    ) -> Result<Self, TransportError> {
        let credentials = Credentials::parse(api_key)?;
        let api_url = api_url(base_url, version)?;
        let http = config.build_http_client()?;

        Ok(Self {
            http,
            api_url,
            credentials: Arc::new(credentials),
        })
    }

    /// The versioned API root requests are resolved against.
    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Append `path` to the API root one escaped segment at a time, so `?`,
    /// `#` and `%` inside a segment stay part of the path.
    fn build_url(&self, path: &str) -> Result<Url, TransportError> {
        let normalized = path.strip_prefix('/').unwrap_or(path);

        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                TransportError::InvalidEndpoint(format!(
                    "MAAS URL `{}` cannot take path `{path}`",
                    self.api_url
                ))
            })?
            .pop_if_empty()
            .extend(normalized.split('/'));
        Ok(url)
    }

    fn sign(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, self.credentials.authorization_header())
            .header("Accept", "application/json")
    }
}

async fn read_body(response: Response) -> Result<Vec<u8>, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.bytes().await?.to_vec());
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(TransportError::Server { status, body })
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &RequestDescriptor) -> Result<Vec<u8>, TransportError> {
        let url = self.build_url(&request.path)?;
        let builder = self.http.get(url).query(&request.query_pairs());
        let response = self.sign(builder).send().await?;
        read_body(response).await
    }

    async fn post(&self, request: &RequestDescriptor) -> Result<Vec<u8>, TransportError> {
        let url = self.build_url(&request.path)?;
        let mut builder = self.http.post(url);
        if let Some(op) = &request.op {
            builder = builder.query(&[("op", op.as_str())]);
        }

        builder = match &request.file {
            Some(file) => {
                let mut form = Form::new();
                for (key, value) in request.params.pairs() {
                    form = form.text(key.clone(), value.clone());
                }
                let part = Part::bytes(file.content.clone()).file_name(file.name.clone());
                form = form.part(file.name.clone(), part);
                builder.multipart(form)
            }
            None => builder.form(request.params.pairs()),
        };

        let response = self.sign(builder).send().await?;
        read_body(response).await
    }

    async fn delete(&self, request: &RequestDescriptor) -> Result<(), TransportError> {
        let url = self.build_url(&request.path)?;
        let response = self.sign(self.http.delete(url)).send().await?;
        read_body(response).await.map(|_| ())
    }
}

/// Connector producing [`HttpTransport`]s that share one client configuration.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    config: ClientConfig,
}

impl HttpConnector {
    /// Create a connector with the given HTTP settings.
    #[must_use]
    pub const fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

impl Connector for HttpConnector {
    fn connect(
        &self,
        base_url: &str,
        api_key: &SecretString,
        version: &ProtocolVersion,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        let transport = HttpTransport::new(base_url, api_key, version, &self.config)?;
        Ok(Arc::new(transport))
    }
}
