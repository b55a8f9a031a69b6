use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::AuthorizationStatus;

/// Result type for location lookups.
pub type LocationResult<T> = Result<T, LocationError>;

/// A failure reported by the platform location service, passed through as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{domain} error {code}: {message}")]
pub struct NativeError {
    /// Error domain, e.g. `kCLErrorDomain`.
    pub domain: String,
    /// Domain-specific error code.
    pub code: i64,
    /// Human-readable description from the platform.
    #[serde(default)]
    pub message: String,
}

impl NativeError {
    /// Creates a native error.
    pub fn new(domain: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            code,
            message: message.into(),
        }
    }
}

/// Errors that can occur when fetching the current location.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    /// The service reported success but delivered no fixes.
    #[error("no location was reported")]
    NoLocation,

    /// Authorization was not granted after asking the user.
    #[error("location access not authorized ({0:?})")]
    NotAuthorized(AuthorizationStatus),

    /// The platform location service failed.
    #[error("location service failed: {0}")]
    Native(#[from] NativeError),

    /// The bridge was closed while the request was pending.
    #[error("location bridge was deinitialized")]
    Deinitialized,

    /// An endpoint with no implementation was called.
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),
}
