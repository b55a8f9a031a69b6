//! # geoclient
//!
//! Awaitable, injectable access to the platform location service.
//!
//! Platform location APIs deliver fixes and authorization decisions through
//! delegate callbacks. geoclient bridges those callbacks into a single
//! `async` call and offers `live`, `test` and `preview` clients so
//! application code can depend on location without depending on a device.
//!
//! ## Features
//!
//! - `location` (default): the location bridge and client.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! geoclient = "0.1"
//! ```
//!
//! ```rust,ignore
//! use geoclient::location::{ClientVariant, LocationClient};
//!
//! async fn where_am_i() {
//!     let client = LocationClient::for_variant(ClientVariant::from_env());
//!     if let Ok(coordinate) = client.get_location().await {
//!         println!("Latitude: {}, Longitude: {}", coordinate.latitude, coordinate.longitude);
//!     }
//! }
//! ```

#[cfg(feature = "location")]
pub use geoclient_location as location;
