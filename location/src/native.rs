//! The seam between the bridge and a platform location service.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{AuthorizationStatus, Location, NativeError};

/// Error domain used when a native event payload cannot be decoded.
pub const SERIALIZATION_DOMAIN: &str = "geoclient.serialization";

/// Receives callbacks from a [`NativeLocationService`].
///
/// Callbacks may arrive on any thread.
pub trait LocationDelegate: Send + Sync {
    /// The service produced one or more fixes (possibly none).
    fn on_locations_updated(&self, locations: &[Location]);

    /// The service failed to produce a fix.
    fn on_location_error(&self, error: NativeError);

    /// The authorization status changed, or a request for it completed.
    fn on_authorization_changed(&self, status: AuthorizationStatus);
}

/// A platform location service, modeled after `CLLocationManager`.
///
/// Requests are fire-and-forget: results are reported to the delegate
/// registered with [`set_delegate`](Self::set_delegate). Implementations
/// hold the delegate weakly; whoever registers it keeps it alive.
pub trait NativeLocationService: Send + Sync + fmt::Debug {
    /// Registers the delegate that receives callbacks.
    fn set_delegate(&self, delegate: Weak<dyn LocationDelegate>);

    /// The current authorization status.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Asks the user for when-in-use authorization.
    fn request_when_in_use_authorization(&self);

    /// Requests a single fix.
    fn request_location(&self);

    /// Stops any update in progress. Calling it when idle is a no-op.
    fn stop_updating_location(&self);
}

/// A delegate callback in transportable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NativeEvent {
    /// See [`LocationDelegate::on_locations_updated`].
    LocationsUpdated {
        /// Fixes, most recent last.
        locations: Vec<Location>,
    },
    /// See [`LocationDelegate::on_location_error`].
    LocationError {
        /// The platform failure.
        error: NativeError,
    },
    /// See [`LocationDelegate::on_authorization_changed`].
    AuthorizationChanged {
        /// The new status.
        status: AuthorizationStatus,
    },
}

impl NativeEvent {
    /// Decodes an event from its JSON form.
    ///
    /// # Errors
    /// Returns a [`NativeError`] in the [`SERIALIZATION_DOMAIN`] if the
    /// payload is malformed.
    pub fn from_json(json: &str) -> Result<Self, NativeError> {
        serde_json::from_str(json)
            .map_err(|err| NativeError::new(SERIALIZATION_DOMAIN, 0, err.to_string()))
    }

    /// Invokes the matching callback on `delegate`.
    pub fn dispatch(self, delegate: &dyn LocationDelegate) {
        match self {
            Self::LocationsUpdated { locations } => delegate.on_locations_updated(&locations),
            Self::LocationError { error } => delegate.on_location_error(error),
            Self::AuthorizationChanged { status } => delegate.on_authorization_changed(status),
        }
    }
}

/// Weak delegate storage shared by service implementations.
#[derive(Default)]
pub struct DelegateSlot {
    delegate: Mutex<Option<Weak<dyn LocationDelegate>>>,
}

impl fmt::Debug for DelegateSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateSlot")
            .field("live", &self.get().is_some())
            .finish()
    }
}

impl DelegateSlot {
    /// Replaces the stored delegate.
    pub fn set(&self, delegate: Weak<dyn LocationDelegate>) {
        let mut guard = self.delegate.lock().expect("delegate mutex poisoned");
        *guard = Some(delegate);
    }

    /// The delegate, if one is registered and still alive.
    #[must_use]
    pub fn get(&self) -> Option<Arc<dyn LocationDelegate>> {
        let guard = self.delegate.lock().expect("delegate mutex poisoned");
        guard.as_ref().and_then(Weak::upgrade)
    }

    /// Delivers `event` to the delegate. Returns `false` if there was nobody to deliver to.
    pub fn dispatch(&self, event: NativeEvent) -> bool {
        // Upgrade outside the lock so a callback may call back into the service.
        let Some(delegate) = self.get() else {
            warn!("dropping location event, no live delegate: {event:?}");
            return false;
        };
        event.dispatch(delegate.as_ref());
        true
    }
}
