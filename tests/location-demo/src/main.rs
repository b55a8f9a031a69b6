//! Manual test binary for geoclient-location.
//!
//! Run with: cargo run -p geoclient-location-demo
//! Set `GEOCLIENT_LOCATION_CLIENT=test` to exercise the unimplemented client.

use geoclient_location::{ClientVariant, LocationClient, LocationError};

#[tokio::main]
async fn main() {
    println!("=== geoclient location demo ===\n");

    let variant = ClientVariant::from_env();
    println!("Client variant: {variant}");
    let client = LocationClient::for_variant(variant);

    println!("Getting current location...");
    match client.get_location().await {
        Ok(coordinate) => {
            println!("✓ Location retrieved successfully!");
            println!("  Latitude:  {:.6}°", coordinate.latitude);
            println!("  Longitude: {:.6}°", coordinate.longitude);
        }
        Err(LocationError::NotAuthorized(status)) => {
            println!("✗ Location access not granted ({status:?}). Check your privacy settings.");
        }
        Err(e) => {
            println!("✗ Failed to get location: {e}");
        }
    }
}
