//! Build script for geoclient-location.

use std::env;
use std::path::PathBuf;

const APPLE_BRIDGE: &str = "src/sys/apple/mod.rs";

fn main() {
    println!("cargo:rerun-if-changed={APPLE_BRIDGE}");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os != "ios" && target_os != "macos" {
        return;
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("cargo sets OUT_DIR"));
    let pkg_name = env::var("CARGO_PKG_NAME").expect("cargo sets CARGO_PKG_NAME");

    swift_bridge_build::parse_bridges(vec![APPLE_BRIDGE]).write_all_concatenated(out_dir, &pkg_name);
}
