//! Linux location service using the GeoClue2 D-Bus service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

use futures::executor::block_on;
use log::{debug, error, warn};
use zbus::Connection;
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

use crate::{
    AuthorizationStatus, DelegateSlot, Location, LocationDelegate, NativeError, NativeEvent,
    NativeLocationService,
};

const SERVICE: &str = "org.freedesktop.GeoClue2";
const MANAGER_PATH: &str = "/org/freedesktop/GeoClue2/Manager";
const MANAGER_INTERFACE: &str = "org.freedesktop.GeoClue2.Manager";
const CLIENT_INTERFACE: &str = "org.freedesktop.GeoClue2.Client";
const LOCATION_INTERFACE: &str = "org.freedesktop.GeoClue2.Location";
const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";
const ACCESS_DENIED: &str = "org.freedesktop.DBus.Error.AccessDenied";

const DESKTOP_ID: &str = "geoclient";
// GCLUE_ACCURACY_LEVEL_EXACT
const ACCURACY_LEVEL_EXACT: u32 = 8;
// GeoClue reports -DBL_MAX for an unknown altitude.
const UNKNOWN_ALTITUDE: f64 = -f64::MAX;

const FIX_POLL_ATTEMPTS: u32 = 40;
const FIX_POLL_INTERVAL: Duration = Duration::from_millis(250);

const CODE_FAILED: i64 = 0;
const CODE_DENIED: i64 = 1;
const CODE_LOCATION_UNKNOWN: i64 = 2;

#[derive(Debug, Default)]
struct Shared {
    delegate: DelegateSlot,
    status: Mutex<AuthorizationStatus>,
    // Bumped on stop; fixes from an older generation are discarded.
    generation: AtomicU64,
}

impl Shared {
    fn set_status(&self, status: AuthorizationStatus) {
        *self.status.lock().expect("status mutex poisoned") = status;
    }
}

/// GeoClue2 client. Each request runs on its own worker thread.
#[derive(Debug, Default)]
pub(crate) struct GeoClueService {
    shared: Arc<Shared>,
}

impl GeoClueService {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl NativeLocationService for GeoClueService {
    fn set_delegate(&self, delegate: Weak<dyn LocationDelegate>) {
        self.shared.delegate.set(delegate);
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        *self.shared.status.lock().expect("status mutex poisoned")
    }

    fn request_when_in_use_authorization(&self) {
        let shared = Arc::clone(&self.shared);
        let spawned = spawn_worker("geoclue-authorization", move || {
            let status = match block_on(probe_access()) {
                Ok(()) => AuthorizationStatus::AuthorizedWhenInUse,
                Err(err) if is_access_denied(&err) => AuthorizationStatus::Denied,
                Err(err) => {
                    error!("GeoClue2 is not available: {err}");
                    AuthorizationStatus::Restricted
                }
            };
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
        let spawned = spawn_worker("geoclue-location", move || {
            let event = match block_on(fetch_location()) {
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
                error: NativeError::new(SERVICE, CODE_FAILED, "failed to spawn location worker"),
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

fn is_access_denied(err: &zbus::Error) -> bool {
    match err {
        zbus::Error::MethodError(name, _, _) => name.as_str() == ACCESS_DENIED,
        zbus::Error::FDO(fdo) => matches!(**fdo, zbus::fdo::Error::AccessDenied(_)),
        _ => false,
    }
}

fn geoclue_error(context: &str, err: &zbus::Error) -> NativeError {
    let code = if is_access_denied(err) {
        CODE_DENIED
    } else {
        CODE_FAILED
    };
    NativeError::new(SERVICE, code, format!("{context}: {err}"))
}

/// A started GeoClue2 client.
struct Session {
    connection: Connection,
    client: OwnedObjectPath,
}

impl Session {
    async fn start() -> zbus::Result<Self> {
        let connection = Connection::system().await?;

        let reply = connection
            .call_method(
                Some(SERVICE),
                MANAGER_PATH,
                Some(MANAGER_INTERFACE),
                "GetClient",
                &(),
            )
            .await?;
        let (client,): (OwnedObjectPath,) = reply.body().deserialize()?;
        let session = Self { connection, client };

        // GeoClue2 refuses to start a client without a desktop ID.
        session
            .set_client_property("DesktopId", Value::from(DESKTOP_ID))
            .await?;
        session
            .set_client_property("RequestedAccuracyLevel", Value::from(ACCURACY_LEVEL_EXACT))
            .await?;
        session.call_client("Start").await?;

        Ok(session)
    }

    async fn set_client_property(&self, name: &str, value: Value<'_>) -> zbus::Result<()> {
        self.connection
            .call_method(
                Some(SERVICE),
                self.client.as_str(),
                Some(PROPERTIES_INTERFACE),
                "Set",
                &(CLIENT_INTERFACE, name, value),
            )
            .await?;
        Ok(())
    }

    async fn call_client(&self, method: &str) -> zbus::Result<()> {
        self.connection
            .call_method(
                Some(SERVICE),
                self.client.as_str(),
                Some(CLIENT_INTERFACE),
                method,
                &(),
            )
            .await?;
        Ok(())
    }

    async fn property(&self, path: &str, interface: &str, name: &str) -> zbus::Result<OwnedValue> {
        let reply = self
            .connection
            .call_method(
                Some(SERVICE),
                path,
                Some(PROPERTIES_INTERFACE),
                "Get",
                &(interface, name),
            )
            .await?;
        let value: OwnedValue = reply.body().deserialize()?;
        Ok(value)
    }

    async fn location_property(&self, path: &str, name: &str) -> zbus::Result<f64> {
        let value = self.property(path, LOCATION_INTERFACE, name).await?;
        Ok(f64::try_from(value)?)
    }

    /// Polls the client until GeoClue2 publishes its first fix.
    async fn location_path(&self) -> zbus::Result<Option<OwnedObjectPath>> {
        for _ in 0..FIX_POLL_ATTEMPTS {
            let value = self
                .property(self.client.as_str(), CLIENT_INTERFACE, "Location")
                .await?;
            let path = OwnedObjectPath::try_from(value)?;
            if path.as_str() != "/" {
                return Ok(Some(path));
            }
            futures_timer::Delay::new(FIX_POLL_INTERVAL).await;
        }
        Ok(None)
    }

    async fn stop(self) {
        if let Err(err) = self.call_client("Stop").await {
            warn!("failed to stop GeoClue2 client: {err}");
        }
    }
}

async fn probe_access() -> zbus::Result<()> {
    Session::start().await?.stop().await;
    Ok(())
}

async fn fetch_location() -> Result<Location, NativeError> {
    let session = Session::start()
        .await
        .map_err(|err| geoclue_error("failed to start GeoClue2 client", &err))?;
    let result = read_location(&session).await;
    session.stop().await;
    result
}

async fn read_location(session: &Session) -> Result<Location, NativeError> {
    let path = session
        .location_path()
        .await
        .map_err(|err| geoclue_error("failed to read location path", &err))?
        .ok_or_else(|| {
            NativeError::new(SERVICE, CODE_LOCATION_UNKNOWN, "no fix reported by GeoClue2")
        })?;

    let latitude = session
        .location_property(path.as_str(), "Latitude")
        .await
        .map_err(|err| geoclue_error("failed to read latitude", &err))?;
    let longitude = session
        .location_property(path.as_str(), "Longitude")
        .await
        .map_err(|err| geoclue_error("failed to read longitude", &err))?;
    let altitude = session
        .location_property(path.as_str(), "Altitude")
        .await
        .ok()
        .filter(|altitude| *altitude > UNKNOWN_ALTITUDE);
    let accuracy = session
        .location_property(path.as_str(), "Accuracy")
        .await
        .ok();

    Ok(Location {
        latitude,
        longitude,
        altitude,
        horizontal_accuracy: accuracy,
        vertical_accuracy: None,
        timestamp: super::now_millis(),
    })
}
