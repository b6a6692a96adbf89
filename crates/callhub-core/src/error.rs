//! Shared error type across callhub crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Missing or unrecognized consumer.
    Unauthenticated,
    /// Known consumer, method not in its ACL.
    Forbidden,
    /// Startup configuration rejected.
    ConfigInvalid,
    /// A subscriber destination became unusable.
    TransportFailure,
    /// Malformed request.
    BadRequest,
    /// No handler registered for the method.
    Unimplemented,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::Unauthenticated => "UNAUTHENTICATED",
            ClientCode::Forbidden => "FORBIDDEN",
            ClientCode::ConfigInvalid => "CONFIG_INVALID",
            ClientCode::TransportFailure => "TRANSPORT_FAILURE",
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::Unimplemented => "UNIMPLEMENTED",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, HubError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HubError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid config: {0}")]
    ConfigInvalid(String),
    #[error("transport failure: {0}")]
    TransportFailure(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unknown method: {0}")]
    UnknownMethod(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl HubError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            HubError::Unauthenticated(_) => ClientCode::Unauthenticated,
            HubError::Forbidden(_) => ClientCode::Forbidden,
            HubError::ConfigInvalid(_) => ClientCode::ConfigInvalid,
            HubError::TransportFailure(_) => ClientCode::TransportFailure,
            HubError::BadRequest(_) => ClientCode::BadRequest,
            HubError::UnknownMethod(_) => ClientCode::Unimplemented,
            HubError::Internal(_) => ClientCode::Internal,
        }
    }
}
