// Publishes the C header next to the build artifacts.
//
// `include/respira.h` is the source of truth. When `cbindgen` is on PATH a
// fresh header is generated into $OUT_DIR instead, so drift between the two
// shows up in review as a diff after regenerating.

use std::{env, fs, path::PathBuf, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=include/respira.h");

    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("set by cargo"));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("set by cargo"));
    let checked_in = crate_dir.join("include").join("respira.h");
    let out_header = out_dir.join("respira.h");

    let generated = Command::new("cbindgen")
        .args(["--crate", "respira-ffi", "--lang", "C", "--output"])
        .arg(&out_header)
        .current_dir(&crate_dir)
        .status()
        .map(|s| s.success())
        .unwrap_or(false);

    if !generated {
        fs::copy(&checked_in, &out_header).expect("include/respira.h is checked in");
    }
}
