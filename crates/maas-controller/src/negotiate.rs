//! Protocol version negotiation and session bootstrap.
//!
//! Candidates are tried in order. Problems reading a candidate's version
//! document are soft: the next candidate is tried. Everything else
//! (malformed candidates, unusable credentials, a failed identity check) is
//! hard and ends negotiation immediately.

use maas_core::config::{ControllerArgs, ControllerConfig};
use maas_core::http::HttpConnector;
use maas_core::sequencer::RequestSequencer;
use maas_core::version::SUPPORTED_API_VERSIONS;
use maas_core::{Connector, Error, ProtocolVersion, TransportError};
use std::sync::Arc;
use tracing::{debug, info};

use crate::session::Controller;
use crate::Result;

/// Outcome of trying one candidate version.
enum Attempt {
    /// The candidate works; negotiation is over.
    Accepted(Controller),
    /// Soft failure; try the next candidate.
    Rejected(Error),
    /// Hard failure; stop negotiating.
    Aborted(Error),
}

/// Negotiates a protocol version with a controller and bootstraps a session.
pub struct Negotiator {
    connector: Arc<dyn Connector>,
    versions: Vec<String>,
}

impl std::fmt::Debug for Negotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Negotiator")
            .field("versions", &self.versions)
            .finish_non_exhaustive()
    }
}

impl Negotiator {
    /// Create a negotiator trying the default supported versions.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            versions: SUPPORTED_API_VERSIONS
                .iter()
                .map(|version| (*version).to_string())
                .collect(),
        }
    }

    /// Override the candidate versions, most desirable first.
    #[must_use]
    pub fn with_versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.versions = versions.into_iter().map(Into::into).collect();
        self
    }

    /// Candidate versions in the order they are tried.
    #[must_use]
    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    /// Negotiate a version and return a ready session.
    ///
    /// # Errors
    ///
    /// - [`Error::NotValid`] for a malformed candidate version or API key
    /// - [`Error::PermissionDenied`] if the server rejects the credentials
    /// - [`Error::UnsupportedVersion`] if no candidate is served
    /// - [`Error::Transport`] if a transport cannot be built for a candidate
    /// - [`Error::Unexpected`] for anything else
    pub async fn negotiate(&self, args: &ControllerArgs) -> Result<Controller> {
        let sequencer = Arc::new(RequestSequencer::new());

        for candidate in &self.versions {
            match self.attempt(args, candidate, &sequencer).await {
                Attempt::Accepted(controller) => {
                    info!(
                        base_url = %args.base_url,
                        version = %controller.api_version(),
                        capabilities = controller.capabilities().len(),
                        "connected to MAAS controller"
                    );
                    return Ok(controller);
                }
                Attempt::Rejected(err) => {
                    debug!(
                        base_url = %args.base_url,
                        version = %candidate,
                        error = %err,
                        "API version not served, trying next"
                    );
                }
                Attempt::Aborted(err) => return Err(err),
            }
        }

        Err(Error::UnsupportedVersion(format!(
            "controller at {} does not support any of [{}]",
            args.base_url,
            self.versions.join(", ")
        )))
    }

    async fn attempt(
        &self,
        args: &ControllerArgs,
        candidate: &str,
        sequencer: &Arc<RequestSequencer>,
    ) -> Attempt {
        let version = match ProtocolVersion::parse(candidate) {
            Ok(version) => version,
            Err(err) => return Attempt::Aborted(err),
        };

        let transport = match self
            .connector
            .connect(&args.base_url, &args.api_key, &version)
        {
            Ok(transport) => transport,
            Err(TransportError::InvalidCredentials(message)) => {
                return Attempt::Aborted(Error::NotValid(message))
            }
            Err(err) => {
                return Attempt::Aborted(Error::transport(
                    format!("connecting to API {version}"),
                    err,
                ))
            }
        };

        let controller =
            Controller::bootstrap(transport, &args.base_url, version, Arc::clone(sequencer));
        let capabilities = match controller.read_api_version().await {
            Ok(capabilities) => capabilities,
            Err(err) => return Attempt::Rejected(err),
        };
        let controller = controller.with_capabilities(capabilities);

        match controller.check_creds().await {
            Ok(()) => Attempt::Accepted(controller),
            Err(err) => Attempt::Aborted(err),
        }
    }
}

impl Controller {
    /// Connect to a controller over HTTP with the default settings.
    ///
    /// # Errors
    ///
    /// See [`Negotiator::negotiate`].
    pub async fn new(args: ControllerArgs) -> Result<Self> {
        Negotiator::new(Arc::new(HttpConnector::default()))
            .negotiate(&args)
            .await
    }

    /// Connect to a controller described by a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotValid`] for an invalid configuration, otherwise see
    /// [`Negotiator::negotiate`].
    pub async fn from_config(config: &ControllerConfig) -> Result<Self> {
        let args = config.to_args()?;
        Negotiator::new(Arc::new(HttpConnector::new(config.client_config())))
            .with_versions(config.supported_versions.iter().cloned())
            .negotiate(&args)
            .await
    }
}
