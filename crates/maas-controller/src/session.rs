//! The controller session and its request primitives.

use maas_core::schema::{FieldType, Schema};
use maas_core::sequencer::RequestSequencer;
use maas_core::transport::FILE_FIELD;
use maas_core::{
    CallError, CallFailure, CapabilitySet, Error, FilePayload, Params, ProtocolVersion,
    RequestDescriptor, Transport,
};
use reqwest::Method;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::policy::OperationClass;
use crate::Result;

/// An authenticated, version-negotiated handle to a MAAS controller.
///
/// The negotiated version and capabilities never change; create a new session to
/// renegotiate. Clones share the transport and request numbering.
#[derive(Clone)]
pub struct Controller {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_version: ProtocolVersion,
    capabilities: CapabilitySet,
    sequencer: Arc<RequestSequencer>,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// A session that has not yet read the server's capabilities.
    pub(crate) fn bootstrap(
        transport: Arc<dyn Transport>,
        base_url: &str,
        api_version: ProtocolVersion,
        sequencer: Arc<RequestSequencer>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.to_string(),
            api_version,
            capabilities: CapabilitySet::new(),
            sequencer,
        }
    }

    pub(crate) fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// The controller's base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The negotiated protocol version.
    #[must_use]
    pub const fn api_version(&self) -> ProtocolVersion {
        self.api_version
    }

    /// The capabilities the server reported.
    #[must_use]
    pub const fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// Number of requests issued through this session so far.
    #[must_use]
    pub fn requests_issued(&self) -> u64 {
        self.sequencer.last_id()
    }

    /// Read the version document and return the reported capabilities.
    pub(crate) async fn read_api_version(&self) -> Result<CapabilitySet> {
        let parsed = self.get("version").await?;

        let schema = Schema::new().required("capabilities", FieldType::list(FieldType::String));
        let coerced = schema
            .coerce(&parsed)
            .map_err(|source| Error::Deserialization {
                context: "version response".to_string(),
                source,
            })?;

        Ok(coerced
            .string_list("capabilities")
            .unwrap_or_default()
            .into_iter()
            .collect())
    }

    /// Verify the credentials by asking who we are.
    pub(crate) async fn check_creds(&self) -> Result<()> {
        self.get_op("users", "whoami")
            .await
            .map(|_| ())
            .map_err(|err| OperationClass::CredentialCheck.translate(err))
    }

    /// GET `path` and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Returns a [`CallError`] if the round trip fails or the body is not JSON.
    pub async fn get(&self, path: &str) -> std::result::Result<Value, CallError> {
        self.get_json(RequestDescriptor::new(path)).await
    }

    /// GET `path` with query parameters and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Returns a [`CallError`] if the round trip fails or the body is not JSON.
    pub async fn get_query(
        &self,
        path: &str,
        params: Params,
    ) -> std::result::Result<Value, CallError> {
        self.get_json(RequestDescriptor::new(path).with_params(params))
            .await
    }

    /// GET `path?op=<op>` and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Returns a [`CallError`] if the round trip fails or the body is not JSON.
    pub async fn get_op(&self, path: &str, op: &str) -> std::result::Result<Value, CallError> {
        self.get_json(RequestDescriptor::new(path).with_op(op)).await
    }

    /// POST form parameters to `path?op=<op>` and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Returns a [`CallError`] if the round trip fails or the body is not JSON.
    pub async fn post(
        &self,
        path: &str,
        op: &str,
        params: Params,
    ) -> std::result::Result<Value, CallError> {
        let request = RequestDescriptor::new(path)
            .with_op(op)
            .with_params(params);
        let bytes = self.post_raw(&request).await?;
        decode(Method::POST, &request, &bytes)
    }

    /// POST form parameters and a single file to `path?op=<op>`.
    ///
    /// The raw response body is returned undecoded.
    ///
    /// # Errors
    ///
    /// Returns a [`CallError`] if the round trip fails.
    pub async fn post_file(
        &self,
        path: &str,
        op: &str,
        params: Params,
        content: Vec<u8>,
    ) -> std::result::Result<Vec<u8>, CallError> {
        let request = RequestDescriptor::new(path)
            .with_op(op)
            .with_params(params)
            .with_file(FilePayload::new(FILE_FIELD, content));
        self.post_raw(&request).await
    }

    /// DELETE `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`CallError`] if the round trip fails.
    pub async fn delete(&self, path: &str) -> std::result::Result<(), CallError> {
        let request = RequestDescriptor::new(path);
        let id = self.sequencer.next_id();
        trace!(
            request = %format_args!("{id:x}"),
            base_url = %self.base_url,
            path = %request.path,
            "DELETE request"
        );

        match self.transport.delete(&request).await {
            Ok(()) => {
                trace!(request = %format_args!("{id:x}"), "response complete");
                Ok(())
            }
            Err(err) => {
                trace!(request = %format_args!("{id:x}"), error = %err, "response error");
                Err(call_error(Method::DELETE, &request, CallFailure::Transport(err)))
            }
        }
    }

    async fn get_json(&self, request: RequestDescriptor) -> std::result::Result<Value, CallError> {
        let id = self.sequencer.next_id();
        trace!(
            request = %format_args!("{id:x}"),
            base_url = %self.base_url,
            path = %request.path,
            op = ?request.op,
            query = %request.params.encode(),
            "GET request"
        );

        let bytes = match self.transport.get(&request).await {
            Ok(bytes) => bytes,
            Err(err) => {
                trace!(request = %format_args!("{id:x}"), error = %err, "response error");
                return Err(call_error(Method::GET, &request, CallFailure::Transport(err)));
            }
        };
        trace!(
            request = %format_args!("{id:x}"),
            body = %String::from_utf8_lossy(&bytes),
            "response"
        );

        decode(Method::GET, &request, &bytes)
    }

    async fn post_raw(&self, request: &RequestDescriptor) -> std::result::Result<Vec<u8>, CallError> {
        let id = self.sequencer.next_id();
        trace!(
            request = %format_args!("{id:x}"),
            base_url = %self.base_url,
            path = %request.path,
            op = ?request.op,
            params = %request.params.encode(),
            file = request.file.is_some(),
            "POST request"
        );

        match self.transport.post(request).await {
            Ok(bytes) => {
                trace!(
                    request = %format_args!("{id:x}"),
                    body = %String::from_utf8_lossy(&bytes),
                    "response"
                );
                Ok(bytes)
            }
            Err(err) => {
                trace!(request = %format_args!("{id:x}"), error = %err, "response error");
                Err(call_error(Method::POST, request, CallFailure::Transport(err)))
            }
        }
    }
}

fn call_error(method: Method, request: &RequestDescriptor, failure: CallFailure) -> CallError {
    CallError::new(method, request.path.clone(), request.op.as_deref(), failure)
}

fn decode(
    method: Method,
    request: &RequestDescriptor,
    bytes: &[u8],
) -> std::result::Result<Value, CallError> {
    serde_json::from_slice(bytes)
        .map_err(|err| call_error(method, request, CallFailure::from(err)))
}
