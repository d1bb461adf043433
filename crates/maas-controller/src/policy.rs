//! Per-operation translation of server status codes into error kinds.
//!
//! The same status means different things to different operations: 409 from
//! allocation is "no match" while 409 from release is "cannot complete". Each
//! [`OperationClass`] therefore owns its own small table, and any status it
//! does not list degrades to [`ErrorKind::Unexpected`].

use maas_core::{CallError, Error, ErrorKind};
use reqwest::StatusCode;

/// Operations with a documented failure contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    /// `users/?op=whoami` during session bootstrap
    CredentialCheck,
    /// Creating a device or machine
    Creation,
    /// `machines/?op=allocate`
    MachineAllocation,
    /// `machines/?op=release`
    MachineRelease,
    /// `files/<name>/`
    FileFetch,
    /// `files/?op=create`
    FileCreation,
    /// Everything without a specific contract
    Other,
}

const CREDENTIAL_CHECK: &[(StatusCode, ErrorKind)] =
    &[(StatusCode::UNAUTHORIZED, ErrorKind::PermissionDenied)];

const CREATION: &[(StatusCode, ErrorKind)] = &[(StatusCode::BAD_REQUEST, ErrorKind::BadRequest)];

const MACHINE_ALLOCATION: &[(StatusCode, ErrorKind)] =
    &[(StatusCode::CONFLICT, ErrorKind::NoMatch)];

const MACHINE_RELEASE: &[(StatusCode, ErrorKind)] = &[
    (StatusCode::BAD_REQUEST, ErrorKind::BadRequest),
    (StatusCode::FORBIDDEN, ErrorKind::PermissionDenied),
    (StatusCode::CONFLICT, ErrorKind::CannotComplete),
];

const FILE_FETCH: &[(StatusCode, ErrorKind)] = &[(StatusCode::NOT_FOUND, ErrorKind::NoMatch)];

const FILE_CREATION: &[(StatusCode, ErrorKind)] =
    &[(StatusCode::BAD_REQUEST, ErrorKind::BadRequest)];

impl OperationClass {
    /// The status-to-kind table for this operation.
    #[must_use]
    pub const fn rules(self) -> &'static [(StatusCode, ErrorKind)] {
        match self {
            Self::CredentialCheck => CREDENTIAL_CHECK,
            Self::Creation => CREATION,
            Self::MachineAllocation => MACHINE_ALLOCATION,
            Self::MachineRelease => MACHINE_RELEASE,
            Self::FileFetch => FILE_FETCH,
            Self::FileCreation => FILE_CREATION,
            Self::Other => &[],
        }
    }

    /// Kind for a status returned by this operation.
    #[must_use]
    pub fn classify(self, status: StatusCode) -> ErrorKind {
        self.rules()
            .iter()
            .find(|(mapped, _)| *mapped == status)
            .map_or(ErrorKind::Unexpected, |(_, kind)| *kind)
    }

    /// Translate a failed call into a semantic error.
    ///
    /// Calls that failed without a server status (connection errors, invalid
    /// JSON) are always unexpected.
    #[must_use]
    pub fn translate(self, err: CallError) -> Error {
        match err.status() {
            Some(status) => Error::from_call(self.classify(status), err),
            None => Error::unexpected(err),
        }
    }
}
