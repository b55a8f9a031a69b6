//! Injectable client with live, test and preview implementations.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use log::{error, warn};
use serde::Deserialize;

use crate::{Coordinate, LocationBridge, LocationError, LocationResult, sys};

/// Environment variable read by [`ClientVariant::from_env`].
pub const VARIANT_ENV: &str = "GEOCLIENT_LOCATION_CLIENT";

type GetLocation = dyn Fn() -> BoxFuture<'static, LocationResult<Coordinate>> + Send + Sync;

/// Handle application code depends on to fetch the current location.
///
/// Cloning is cheap; clones share the same implementation.
#[derive(Clone)]
pub struct LocationClient {
    get_location: Arc<GetLocation>,
    scope: Option<Arc<BridgeScope>>,
}

impl fmt::Debug for LocationClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationClient")
            .field("bridged", &self.scope.is_some())
            .finish_non_exhaustive()
    }
}

/// Closes the bridge when the last client clone goes away.
///
/// In-flight calls hold the bridge itself, never the scope, so they cannot
/// keep it open.
struct BridgeScope(Arc<LocationBridge>);

impl Drop for BridgeScope {
    fn drop(&mut self) {
        self.0.close();
    }
}

impl LocationClient {
    /// Creates a client from a custom implementation, typically a test stub.
    pub fn new<F, Fut>(get_location: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LocationResult<Coordinate>> + Send + 'static,
    {
        Self {
            get_location: Arc::new(move || get_location().boxed()),
            scope: None,
        }
    }

    /// Creates a client backed by `bridge`.
    ///
    /// The bridge is closed by [`close`](Self::close), or once the last
    /// clone of the client is dropped. Either way, calls still pending fail
    /// with [`LocationError::Deinitialized`].
    #[must_use]
    pub fn from_bridge(bridge: Arc<LocationBridge>) -> Self {
        let scope = Arc::new(BridgeScope(Arc::clone(&bridge)));
        let client = Self::new(move || {
            let bridge = Arc::clone(&bridge);
            async move { bridge.get_current_location().await }
        });
        Self {
            scope: Some(scope),
            ..client
        }
    }

    /// The platform location service.
    #[must_use]
    pub fn live() -> Self {
        Self::from_bridge(Arc::new(LocationBridge::new(sys::system_service())))
    }

    /// The client for unit tests: fails every call until overridden.
    #[must_use]
    pub fn test_value() -> Self {
        Self::unimplemented("LocationClient::get_location")
    }

    /// The client for design-time previews. Same as [`live`](Self::live).
    #[must_use]
    pub fn preview() -> Self {
        Self::live()
    }

    /// A client whose every call logs an error and fails with
    /// [`LocationError::Unimplemented`].
    #[must_use]
    pub fn unimplemented(endpoint: &'static str) -> Self {
        Self::new(move || {
            error!("unimplemented: {endpoint} was called without an override");
            future::ready(Err(LocationError::Unimplemented(endpoint)))
        })
    }

    /// A client that always reports `coordinate`.
    #[must_use]
    pub fn constant(coordinate: Coordinate) -> Self {
        Self::new(move || future::ready(Ok(coordinate)))
    }

    /// The client for `variant`.
    #[must_use]
    pub fn for_variant(variant: ClientVariant) -> Self {
        match variant {
            ClientVariant::Live => Self::live(),
            ClientVariant::Test => Self::test_value(),
            ClientVariant::Preview => Self::preview(),
        }
    }

    /// Fetches the current coordinate.
    ///
    /// The returned future does not borrow the client, so it can be spawned
    /// on its own.
    ///
    /// # Errors
    /// Resolves to whatever the underlying implementation reports; see
    /// [`LocationBridge::get_current_location`] for the live client.
    pub fn get_location(&self) -> BoxFuture<'static, LocationResult<Coordinate>> {
        (self.get_location)()
    }

    /// Tears down the bridge behind this client, if any.
    ///
    /// Every clone is affected: pending and later calls fail with
    /// [`LocationError::Deinitialized`]. Custom clients ignore this.
    pub fn close(&self) {
        if let Some(scope) = &self.scope {
            scope.0.close();
        }
    }
}

/// Which [`LocationClient`] implementation to compose with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientVariant {
    /// The platform service.
    #[default]
    Live,
    /// Unimplemented; for unit tests that stub explicitly.
    Test,
    /// The platform service, for previews.
    Preview,
}

/// Returned when parsing an unrecognized [`ClientVariant`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown location client variant `{0}` (expected live, test or preview)")]
pub struct UnknownVariant(pub String);

impl FromStr for ClientVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "test" => Ok(Self::Test),
            "preview" => Ok(Self::Preview),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl fmt::Display for ClientVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Live => "live",
            Self::Test => "test",
            Self::Preview => "preview",
        })
    }
}

impl ClientVariant {
    /// Reads the variant from [`VARIANT_ENV`], defaulting to [`ClientVariant::Live`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(VARIANT_ENV).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> Self {
        value.map_or_else(Self::default, |value| {
            value.parse().unwrap_or_else(|err| {
                warn!("ignoring {VARIANT_ENV}: {err}");
                Self::default()
            })
        })
    }
}
