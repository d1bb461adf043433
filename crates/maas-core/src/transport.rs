//! The transport seam.
//!
//! A [`Transport`] performs one signed HTTP round trip per call and reports
//! non-2xx answers as [`TransportError::Server`] with the status and body intact.
//! A [`Connector`] builds a transport bound to one protocol version's URL.

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;

use crate::error::TransportError;
use crate::params::Params;
use crate::version::ProtocolVersion;

/// Form field name used for uploaded file content.
pub const FILE_FIELD: &str = "file";

/// Return `path` with exactly one trailing `/`.
#[must_use]
pub fn ensure_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// A single named file attached to a POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    /// Form field name
    pub name: String,
    /// File content
    pub content: Vec<u8>,
}

impl FilePayload {
    /// Create a payload under the given field name.
    #[must_use]
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }
}

/// Everything a transport needs to issue one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Resource path relative to the versioned API root, with a trailing `/`
    pub path: String,
    /// Sub-operation, sent as the `op` query parameter
    pub op: Option<String>,
    /// Query parameters for GET, form fields for POST
    pub params: Params,
    /// Optional file attachment for POST
    pub file: Option<FilePayload>,
}

impl RequestDescriptor {
    /// Describe a request to `path`, normalizing its trailing separator.
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            path: ensure_trailing_slash(path),
            ..Self::default()
        }
    }

    /// Set the sub-operation. Empty names are ignored.
    #[must_use]
    pub fn with_op(mut self, op: &str) -> Self {
        if !op.is_empty() {
            self.op = Some(op.to_string());
        }
        self
    }

    /// Set the parameters.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Attach a file.
    #[must_use]
    pub fn with_file(mut self, file: FilePayload) -> Self {
        self.file = Some(file);
        self
    }

    /// Query string pairs for a GET: the parameters followed by `op`.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .params
            .pairs()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if let Some(op) = &self.op {
            pairs.push(("op", op.as_str()));
        }
        pairs
    }
}

/// Performs signed HTTP requests against one versioned API root.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET the resource; `op` and parameters go in the query string.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Server`] for non-2xx responses.
    async fn get(&self, request: &RequestDescriptor) -> Result<Vec<u8>, TransportError>;

    /// POST to the resource; `op` goes in the query string, parameters (and any
    /// file) in the body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Server`] for non-2xx responses.
    async fn post(&self, request: &RequestDescriptor) -> Result<Vec<u8>, TransportError>;

    /// DELETE the resource.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Server`] for non-2xx responses.
    async fn delete(&self, request: &RequestDescriptor) -> Result<(), TransportError>;
}

/// Builds transports bound to a protocol version's URL convention.
pub trait Connector: Send + Sync {
    /// Build a transport for `version` of the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidCredentials`] if the API key is malformed,
    /// or another variant if the transport cannot be set up.
    fn connect(
        &self,
        base_url: &str,
        api_key: &SecretString,
        version: &ProtocolVersion,
    ) -> Result<Arc<dyn Transport>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_added_once() {
        assert_eq!(ensure_trailing_slash("machines"), "machines/");
        assert_eq!(ensure_trailing_slash("machines/"), "machines/");
        assert_eq!(ensure_trailing_slash("files/a.txt"), "files/a.txt/");
    }

    #[test]
    fn descriptor_normalizes_path_and_op() {
        let request = RequestDescriptor::new("users").with_op("whoami");
        assert_eq!(request.path, "users/");
        assert_eq!(request.op.as_deref(), Some("whoami"));

        let request = RequestDescriptor::new("version/").with_op("");
        assert_eq!(request.path, "version/");
        assert!(request.op.is_none());
    }

    #[test]
    fn query_pairs_append_op() {
        let mut params = Params::new();
        params.add("hostname", "node-1");
        params.add("hostname", "node-2");
        let request = RequestDescriptor::new("machines")
            .with_params(params)
            .with_op("list");

        assert_eq!(
            request.query_pairs(),
            vec![("hostname", "node-1"), ("hostname", "node-2"), ("op", "list")]
        );
    }
}
