//! Windows location service using the WinRT `Geolocator`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;

use log::{debug, error};
use windows::Devices::Geolocation::{GeolocationAccessStatus, Geolocator};

use crate::{
    AuthorizationStatus, DelegateSlot, Location, LocationDelegate, NativeError, NativeEvent,
    NativeLocationService,
};

const DOMAIN: &str = "Windows.Devices.Geolocation";

// 100ns ticks between 1601-01-01 and 1970-01-01.
const UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;
const TICKS_PER_MILLI: i64 = 10_000;

#[derive(Debug, Default)]
struct Shared {
    delegate: DelegateSlot,
    status: Mutex<AuthorizationStatus>,
    generation: AtomicU64,
}

impl Shared {
    fn set_status(&self, status: AuthorizationStatus) {
        *self.status.lock().expect("status mutex poisoned") = status;
    }
}

/// WinRT geolocator. Blocking WinRT calls run on worker threads.
#[derive(Debug, Default)]
pub(crate) struct GeolocatorService {
    shared: Arc<Shared>,
}

impl GeolocatorService {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl NativeLocationService for GeolocatorService {
    fn set_delegate(&self, delegate: Weak<dyn LocationDelegate>) {
        self.shared.delegate.set(delegate);
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        *self.shared.status.lock().expect("status mutex poisoned")
    }

    fn request_when_in_use_authorization(&self) {
        let shared = Arc::clone(&self.shared);
        let spawned = spawn_worker("geolocator-access", move || {
            let status = request_access().unwrap_or_else(|err| {
                error!("geolocation access request failed: {err}");
                AuthorizationStatus::Restricted
            });
            shared.set_status(status);
            shared
                .delegate
                .dispatch(NativeEvent::AuthorizationChanged { status });
        });

        if !spawned {
            self.shared.set_status(AuthorizationStatus::Restricted);
            self.shared
                .delegate
                .dispatch(NativeEvent::AuthorizationChanged {
                    status: AuthorizationStatus::Restricted,
                });
        }
    }

    fn request_location(&self) {
        let shared = Arc::clone(&self.shared);
        let generation = shared.generation.load(Ordering::SeqCst);
        let spawned = spawn_worker("geolocator-position", move || {
            let event = match current_position() {
                Ok(location) => NativeEvent::LocationsUpdated {
                    locations: vec![location],
                },
                Err(error) => NativeEvent::LocationError { error },
            };
            if shared.generation.load(Ordering::SeqCst) != generation {
                debug!("discarding result of a stopped location request");
                return;
            }
            shared.delegate.dispatch(event);
        });

        if !spawned {
            self.shared.delegate.dispatch(NativeEvent::LocationError {
                error: NativeError::new(DOMAIN, 0, "failed to spawn location worker"),
            });
        }
    }

    fn stop_updating_location(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
    }
}

fn spawn_worker(name: &str, work: impl FnOnce() + Send + 'static) -> bool {
    match thread::Builder::new().name(name.to_string()).spawn(work) {
        Ok(_) => true,
        Err(err) => {
            error!("failed to spawn {name} thread: {err}");
            false
        }
    }
}

fn winrt_error(err: &windows::core::Error) -> NativeError {
    NativeError::new(DOMAIN, i64::from(err.code().0), err.message().to_string())
}

fn request_access() -> Result<AuthorizationStatus, NativeError> {
    let access = Geolocator::RequestAccessAsync()
        .and_then(|operation| operation.get())
        .map_err(|err| winrt_error(&err))?;

    Ok(match access {
        GeolocationAccessStatus::Allowed => AuthorizationStatus::AuthorizedWhenInUse,
        GeolocationAccessStatus::Denied => AuthorizationStatus::Denied,
        _ => AuthorizationStatus::NotDetermined,
    })
}

fn current_position() -> Result<Location, NativeError> {
    let geolocator = Geolocator::new().map_err(|err| winrt_error(&err))?;
    let position = geolocator
        .GetGeopositionAsync()
        .and_then(|operation| operation.get())
        .map_err(|err| winrt_error(&err))?;

    let coordinate = position.Coordinate().map_err(|err| winrt_error(&err))?;
    let point = coordinate
        .Point()
        .and_then(|point| point.Position())
        .map_err(|err| winrt_error(&err))?;

    let timestamp = coordinate
        .Timestamp()
        .ok()
        .map(|time| (time.UniversalTime - UNIX_EPOCH_TICKS) / TICKS_PER_MILLI)
        .and_then(|millis| u64::try_from(millis).ok())
        .unwrap_or_else(super::now_millis);

    Ok(Location {
        latitude: point.Latitude,
        longitude: point.Longitude,
        altitude: Some(point.Altitude),
        horizontal_accuracy: coordinate.Accuracy().ok(),
        vertical_accuracy: coordinate
            .AltitudeAccuracy()
            .ok()
            .and_then(|accuracy| accuracy.Value().ok()),
        timestamp,
    })
}
