//! Build script for fuzzkit
//!
//! Embeds version and target information into the binary.

use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if let Ok(version) = env::var("CARGO_PKG_VERSION") {
        println!("cargo:rustc-env=FUZZKIT_VERSION={}", version);
    }
    if let Ok(target) = env::var("TARGET") {
        println!("cargo:rustc-env=FUZZKIT_TARGET={}", target);
    }
}
