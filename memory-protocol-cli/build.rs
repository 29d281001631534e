//! Build script for memory-protocol-cli
//!
//! Exports the `memory_protocol_*` C entry points from the memio binary so a
//! callback library may also link against them by name.

use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=fixtures/callbacks.c");

    // Tests compile the C fixture for the same target
    let target = env::var("TARGET").unwrap();
    println!("cargo:rustc-env=MEMIO_TARGET={}", target);

    match env::var("CARGO_CFG_TARGET_OS").as_deref() {
        Ok("linux") | Ok("android") | Ok("freebsd") => {
            println!("cargo:rustc-link-arg-bin=memio=-Wl,--export-dynamic");
        }
        Ok("macos") => {
            println!("cargo:rustc-link-arg-bin=memio=-Wl,-export_dynamic");
        }
        _ => {}
    }
}
