//! # maas-core
//!
//! Core types and utilities for talking to a MAAS region controller.
//!
//! This crate provides the foundational pieces shared by every MAAS client crate:
//! the semantic error taxonomy, protocol versions and capabilities, request
//! parameters, response schema coercion, and the signed HTTP transport.
//!
//! ## Modules
//!
//! - [`error`] - Semantic error kinds, transport errors and call errors
//! - [`version`] - Protocol versions and server capability sets
//! - [`params`] - Ordered, multi-valued query/form parameters
//! - [`schema`] - Shape validation for loosely-typed JSON responses
//! - [`sequencer`] - Per-session request numbering for log correlation
//! - [`config`] - Controller connection configuration
//! - [`client`] - HTTP client configuration
//! - [`transport`] - The transport seam (request descriptors, traits)
//! - [`http`] - OAuth-signed `reqwest` transport

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod params;
pub mod schema;
pub mod sequencer;
pub mod transport;
pub mod version;

// Re-export commonly used types
pub use error::{CallError, CallFailure, Error, ErrorKind, Result, TransportError};
pub use params::Params;
pub use transport::{Connector, FilePayload, RequestDescriptor, Transport};
pub use version::{CapabilitySet, ProtocolVersion};
