//! Platform-specific location services.

use std::sync::Arc;

use crate::NativeLocationService;

#[cfg(any(target_os = "ios", target_os = "macos"))]
mod apple;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(not(any(
    target_os = "ios",
    target_os = "macos",
    target_os = "windows",
    target_os = "linux"
)))]
mod unsupported;

/// The location service of the current platform.
#[cfg(any(target_os = "ios", target_os = "macos"))]
#[must_use]
pub fn system_service() -> Arc<dyn NativeLocationService> {
    Arc::new(apple::CoreLocationService::new())
}

/// The location service of the current platform.
#[cfg(target_os = "windows")]
#[must_use]
pub fn system_service() -> Arc<dyn NativeLocationService> {
    Arc::new(windows::GeolocatorService::new())
}

/// The location service of the current platform.
#[cfg(target_os = "linux")]
#[must_use]
pub fn system_service() -> Arc<dyn NativeLocationService> {
    Arc::new(linux::GeoClueService::new())
}

/// The location service of the current platform.
///
/// This platform has none: authorization reads as restricted and every
/// request fails.
#[cfg(not(any(
    target_os = "ios",
    target_os = "macos",
    target_os = "windows",
    target_os = "linux"
)))]
#[must_use]
pub fn system_service() -> Arc<dyn NativeLocationService> {
    Arc::new(unsupported::UnsupportedService::default())
}

/// Current time as Unix epoch milliseconds.
#[cfg(any(target_os = "windows", target_os = "linux"))]
fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
