//! A scripted native location service for driving the bridge by hand.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Weak};

use geoclient_location::{
    AuthorizationStatus, Coordinate, DelegateSlot, Location, LocationDelegate, NativeError,
    NativeEvent, NativeLocationService,
};

/// A request the bridge issued to the native service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    RequestAuthorization,
    RequestLocation,
    StopUpdating,
}

/// Records every request and only calls back when the test says so.
#[derive(Debug, Default)]
pub struct ScriptedService {
    delegate: DelegateSlot,
    status: Mutex<AuthorizationStatus>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedService {
    pub fn new(status: AuthorizationStatus) -> Arc<Self> {
        let service = Self::default();
        *service.status.lock().unwrap() = status;
        Arc::new(service)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().into_iter().filter(|c| *c == call).count()
    }

    /// Changes the status without notifying the delegate.
    pub fn set_status(&self, status: AuthorizationStatus) {
        *self.status.lock().unwrap() = status;
    }

    /// Changes the status and notifies the delegate, as the OS would.
    pub fn change_authorization(&self, status: AuthorizationStatus) {
        self.set_status(status);
        self.delegate
            .dispatch(NativeEvent::AuthorizationChanged { status });
    }

    pub fn deliver(&self, coordinates: &[Coordinate]) {
        let locations = coordinates
            .iter()
            .copied()
            .map(Location::from_coordinate)
            .collect();
        self.delegate
            .dispatch(NativeEvent::LocationsUpdated { locations });
    }

    pub fn fail(&self, error: NativeError) {
        self.delegate.dispatch(NativeEvent::LocationError { error });
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.get().is_some()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl NativeLocationService for ScriptedService {
    fn set_delegate(&self, delegate: Weak<dyn LocationDelegate>) {
        self.delegate.set(delegate);
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        *self.status.lock().unwrap()
    }

    fn request_when_in_use_authorization(&self) {
        self.record(Call::RequestAuthorization);
    }

    fn request_location(&self) {
        self.record(Call::RequestLocation);
    }

    fn stop_updating_location(&self) {
        self.record(Call::StopUpdating);
    }
}
