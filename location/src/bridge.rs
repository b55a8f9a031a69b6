//! Turns native location callbacks into awaitable results.

use std::sync::{Arc, Weak};

use log::{debug, warn};

use crate::{
    AuthorizationStatus, Coordinate, Location, LocationDelegate, LocationError, LocationResult,
    NativeError, NativeLocationService, WaiterQueue,
};

/// What an authorization waiter is woken with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthorizationSignal {
    /// The service reported a status.
    Changed(AuthorizationStatus),
    /// The bridge closed; carries the status read at close time.
    Closed(AuthorizationStatus),
}

impl AuthorizationSignal {
    const fn status(self) -> AuthorizationStatus {
        match self {
            Self::Changed(status) | Self::Closed(status) => status,
        }
    }
}

/// Delegate registered with the native service. Owned by the bridge.
#[derive(Debug, Default)]
struct BridgeDelegate {
    locations: WaiterQueue<LocationResult<Coordinate>>,
    authorizations: WaiterQueue<AuthorizationSignal>,
}

impl LocationDelegate for BridgeDelegate {
    fn on_locations_updated(&self, locations: &[Location]) {
        let result = locations
            .first()
            .map(Location::coordinate)
            .ok_or(LocationError::NoLocation);
        let resolved = self.locations.resolve_all(result);
        debug!(
            "received {} location(s), resolved {resolved} waiter(s)",
            locations.len()
        );
    }

    fn on_location_error(&self, error: NativeError) {
        warn!("location request failed: {error}");
        self.locations.resolve_all(Err(LocationError::Native(error)));
    }

    fn on_authorization_changed(&self, status: AuthorizationStatus) {
        let resolved = self
            .authorizations
            .resolve_all(AuthorizationSignal::Changed(status));
        debug!("authorization changed to {status:?}, resolved {resolved} waiter(s)");
    }
}

/// Counts of callers currently suspended on the bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingWaiters {
    /// Callers waiting for a fix.
    pub location: usize,
    /// Callers waiting for an authorization decision.
    pub authorization: usize,
}

/// Adapter from a callback-based [`NativeLocationService`] to `async` calls.
///
/// Both operations may be called concurrently. Callers that are waiting
/// when a callback arrives all receive the same outcome. Call
/// [`close`](Self::close) when the owning scope ends; it also runs on drop.
#[derive(Debug)]
pub struct LocationBridge {
    service: Arc<dyn NativeLocationService>,
    // The service only holds this weakly.
    delegate: Arc<BridgeDelegate>,
}

impl LocationBridge {
    /// Creates a bridge and registers its delegate with `service`.
    pub fn new(service: Arc<dyn NativeLocationService>) -> Self {
        let delegate = Arc::new(BridgeDelegate::default());
        let weak: Weak<BridgeDelegate> = Arc::downgrade(&delegate);
        service.set_delegate(weak);
        Self { service, delegate }
    }

    /// The authorization status as the service currently reports it.
    #[must_use]
    pub fn authorization_status(&self) -> AuthorizationStatus {
        self.service.authorization_status()
    }

    /// Requests when-in-use authorization if it is not already granted.
    ///
    /// Returns immediately when already authorized. Otherwise waits for the
    /// next status change, whatever it is, so a denial resolves too.
    /// Concurrent callers share a single native request.
    pub async fn request_authorization(&self) -> AuthorizationStatus {
        self.await_authorization().await.status()
    }

    async fn await_authorization(&self) -> AuthorizationSignal {
        let status = self.service.authorization_status();
        if status.is_authorized() {
            return AuthorizationSignal::Changed(status);
        }

        let Ok(registration) = self.delegate.authorizations.register() else {
            return AuthorizationSignal::Closed(status);
        };
        if registration.first {
            debug!("requesting when-in-use authorization (currently {status:?})");
            self.service.request_when_in_use_authorization();
        } else {
            debug!("joining pending authorization request");
        }

        match registration.waiter.await {
            Some(signal) => signal,
            None => AuthorizationSignal::Closed(self.service.authorization_status()),
        }
    }

    /// Fetches the current coordinate, asking for authorization first if needed.
    ///
    /// # Errors
    /// - [`LocationError::NotAuthorized`] if authorization was not granted.
    /// - [`LocationError::NoLocation`] if the service reported no fixes.
    /// - [`LocationError::Native`] if the service failed.
    /// - [`LocationError::Deinitialized`] if the bridge closed first.
    pub async fn get_current_location(&self) -> LocationResult<Coordinate> {
        if self.is_closed() {
            return Err(LocationError::Deinitialized);
        }

        if !self.service.authorization_status().is_authorized() {
            match self.await_authorization().await {
                AuthorizationSignal::Changed(status) if status.is_authorized() => {}
                AuthorizationSignal::Changed(status) => {
                    return Err(LocationError::NotAuthorized(status));
                }
                AuthorizationSignal::Closed(_) => return Err(LocationError::Deinitialized),
            }
        }

        let registration = self
            .delegate
            .locations
            .register()
            .map_err(|_| LocationError::Deinitialized)?;

        // Overlapping single-shot requests are not supported natively.
        self.service.stop_updating_location();
        self.service.request_location();

        registration
            .waiter
            .await
            .unwrap_or(Err(LocationError::Deinitialized))
    }

    /// Callers currently suspended in each operation.
    #[must_use]
    pub fn pending(&self) -> PendingWaiters {
        PendingWaiters {
            location: self.delegate.locations.len(),
            authorization: self.delegate.authorizations.len(),
        }
    }

    /// Returns `true` once [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.delegate.locations.is_closed()
    }

    /// Resolves every pending caller and stops the native service.
    ///
    /// Location callers fail with [`LocationError::Deinitialized`].
    /// Authorization callers receive the current status. Later calls to
    /// [`get_current_location`](Self::get_current_location) fail immediately.
    pub fn close(&self) {
        let status = self.service.authorization_status();
        let Some(failed) = self
            .delegate
            .locations
            .close(Err(LocationError::Deinitialized))
        else {
            return;
        };
        let released = self
            .delegate
            .authorizations
            .close(AuthorizationSignal::Closed(status))
            .unwrap_or_default();

        self.service.stop_updating_location();
        debug!(
            "location bridge closed: failed {failed} location waiter(s), released {released} authorization waiter(s)"
        );
    }
}

impl Drop for LocationBridge {
    fn drop(&mut self) {
        self.close();
    }
}
