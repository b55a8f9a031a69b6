//! Apple platform (iOS/macOS) location service using swift-bridge.
//!
//! The Swift side owns a `CLLocationManager` and its delegate. Every
//! delegate callback is serialized as a JSON [`NativeEvent`] and handed to
//! [`EventRelay::dispatch_event`].

use std::fmt;
use std::sync::{Mutex, Weak};

use log::error;

use crate::{
    AuthorizationStatus, DelegateSlot, LocationDelegate, NativeEvent, NativeLocationService,
};

#[swift_bridge::bridge]
mod ffi {
    extern "Rust" {
        type EventRelay;

        fn dispatch_event(self: &EventRelay, json_event: &str);
    }

    extern "Swift" {
        type CoreLocationManager;

        #[swift_bridge(init)]
        fn new(relay: EventRelay) -> CoreLocationManager;

        // Raw `CLAuthorizationStatus` value.
        fn authorization_status(self: &CoreLocationManager) -> i32;
        fn request_when_in_use_authorization(self: &CoreLocationManager);
        fn request_location(self: &CoreLocationManager);
        fn stop_updating_location(self: &CoreLocationManager);
    }
}

/// Service backed by `CoreLocation`.
///
/// The Swift manager is created when the delegate is registered.
#[derive(Default)]
pub(crate) struct CoreLocationService {
    manager: Mutex<Option<ffi::CoreLocationManager>>,
}

// Safety: CoreLocationManager is only touched behind the Mutex, and the Swift
// side marshals CLLocationManager calls onto the thread it was created on.
#[allow(clippy::non_send_fields_in_send_ty)]
unsafe impl Send for CoreLocationService {}
unsafe impl Sync for CoreLocationService {}

impl fmt::Debug for CoreLocationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreLocationService").finish()
    }
}

impl CoreLocationService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn with_manager<R>(&self, action: impl FnOnce(&ffi::CoreLocationManager) -> R) -> Option<R> {
        let guard = self.manager.lock().expect("poisoned manager mutex");
        let manager = guard.as_ref();
        if manager.is_none() {
            error!("CoreLocation manager used before a delegate was registered");
        }
        manager.map(action)
    }
}

const fn status_from_raw(raw: i32) -> AuthorizationStatus {
    match raw {
        1 => AuthorizationStatus::Restricted,
        2 => AuthorizationStatus::Denied,
        3 => AuthorizationStatus::AuthorizedAlways,
        4 => AuthorizationStatus::AuthorizedWhenInUse,
        _ => AuthorizationStatus::NotDetermined,
    }
}

impl NativeLocationService for CoreLocationService {
    fn set_delegate(&self, delegate: Weak<dyn LocationDelegate>) {
        let relay = EventRelay::new(delegate);
        let manager = ffi::CoreLocationManager::new(relay);
        let mut guard = self.manager.lock().expect("poisoned manager mutex");
        *guard = Some(manager);
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        self.with_manager(|manager| status_from_raw(manager.authorization_status()))
            .unwrap_or_default()
    }

    fn request_when_in_use_authorization(&self) {
        self.with_manager(ffi::CoreLocationManager::request_when_in_use_authorization);
    }

    fn request_location(&self) {
        self.with_manager(ffi::CoreLocationManager::request_location);
    }

    fn stop_updating_location(&self) {
        self.with_manager(ffi::CoreLocationManager::stop_updating_location);
    }
}

/// Receives serialized delegate callbacks from Swift.
pub struct EventRelay {
    delegate: DelegateSlot,
}

impl EventRelay {
    fn new(delegate: Weak<dyn LocationDelegate>) -> Self {
        let slot = DelegateSlot::default();
        slot.set(delegate);
        Self { delegate: slot }
    }

    fn dispatch_event(&self, json_event: &str) {
        let event = NativeEvent::from_json(json_event)
            .unwrap_or_else(|error| NativeEvent::LocationError { error });
        self.delegate.dispatch(event);
    }
}

impl fmt::Debug for EventRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRelay").finish()
    }
}
