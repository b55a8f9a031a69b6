//! Awaitable access to the platform location service.
//!
//! Platform location APIs report fixes and authorization changes through
//! delegate callbacks. This crate turns those callbacks into a single
//! `async` call, negotiates authorization on the way, and packages the
//! result behind [`LocationClient`] so application code can swap the live
//! service for a stub.
//!
//! # Usage
//!
//! ```ignore
//! use geoclient_location::LocationClient;
//!
//! let client = LocationClient::live();
//! let coordinate = client.get_location().await?;
//! println!("{}, {}", coordinate.latitude, coordinate.longitude);
//! ```

#![warn(missing_docs)]

mod authorization;
mod bridge;
mod client;
mod error;
mod native;
mod waiter;

/// Platform-specific implementations.
pub mod sys;

use serde::{Deserialize, Serialize};

pub use authorization::AuthorizationStatus;
pub use bridge::{LocationBridge, PendingWaiters};
pub use client::{ClientVariant, LocationClient, UnknownVariant, VARIANT_ENV};
pub use error::{LocationError, LocationResult, NativeError};
pub use native::{
    DelegateSlot, LocationDelegate, NativeEvent, NativeLocationService, SERIALIZATION_DOMAIN,
};
pub use waiter::{QueueClosed, Registration, Waiter, WaiterQueue};

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from degrees.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A location fix as reported by the native service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
    /// Altitude in meters above sea level, if available.
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Horizontal accuracy in meters, if available.
    #[serde(default)]
    pub horizontal_accuracy: Option<f64>,
    /// Vertical accuracy in meters, if available.
    #[serde(default)]
    pub vertical_accuracy: Option<f64>,
    /// Timestamp as Unix epoch milliseconds.
    #[serde(default)]
    pub timestamp: u64,
}

impl Location {
    /// Creates a fix that carries only a coordinate.
    #[must_use]
    pub const fn from_coordinate(coordinate: Coordinate) -> Self {
        Self {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            altitude: None,
            horizontal_accuracy: None,
            vertical_accuracy: None,
            timestamp: 0,
        }
    }

    /// The coordinate of this fix.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}
