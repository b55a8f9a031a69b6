//! Fallback for platforms without a location service.

use std::sync::Weak;

use crate::{
    AuthorizationStatus, DelegateSlot, LocationDelegate, NativeError, NativeEvent,
    NativeLocationService,
};

const DOMAIN: &str = "geoclient.unsupported";

#[derive(Debug, Default)]
pub(crate) struct UnsupportedService {
    delegate: DelegateSlot,
}

impl NativeLocationService for UnsupportedService {
    fn set_delegate(&self, delegate: Weak<dyn LocationDelegate>) {
        self.delegate.set(delegate);
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        AuthorizationStatus::Restricted
    }

    fn request_when_in_use_authorization(&self) {
        self.delegate.dispatch(NativeEvent::AuthorizationChanged {
            status: AuthorizationStatus::Restricted,
        });
    }

    fn request_location(&self) {
        self.delegate.dispatch(NativeEvent::LocationError {
            error: NativeError::new(DOMAIN, 0, "location is not available on this platform"),
        });
    }

    fn stop_updating_location(&self) {}
}
