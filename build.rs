// build.rs

//! build.rs — locate ParMETIS, generate Rust FFI bindings, and post-process
//! them.
//!
//! Discovery modes:
//!  • Default (pkg-config):  `pkg_config::probe("parmetis")`
//!  • Manual    (env-vars):  `PARMETIS_NO_PKG_CONFIG=1` plus `PARMETIS_DIR`
//!                           or (`PARMETIS_LIB_DIR` + `PARMETIS_INCLUDE_DIR`)
//!
//! After generating `parmetis_bindings.rs`, every `extern "C" { … }` block
//! is rewritten to `unsafe extern "C" { … }`, which current Rust requires.
//! `idx_t`/`real_t` come straight out of the installed header, so the
//! crate's `Idx`/`Real` typedefs inherit the library's compile-time widths.

#[cfg(feature = "parmetis-support")]
fn main() {
    use regex::Regex;
    use std::env;
    use std::fs::{self, read_to_string, write};
    use std::path::Path;

    // 1. find ParMETIS include/lib directories
    let (include_dir, _lib_dir) = if env::var_os("PARMETIS_NO_PKG_CONFIG").is_some() {
        let prefix = env::var("PARMETIS_DIR")
            .expect("PARMETIS_DIR must be set when PARMETIS_NO_PKG_CONFIG=1");

        let inc =
            env::var("PARMETIS_INCLUDE_DIR").unwrap_or_else(|_| format!("{}/include", &prefix));
        let lib = env::var("PARMETIS_LIB_DIR").unwrap_or_else(|_| format!("{}/lib", &prefix));

        println!("cargo:rustc-link-search=native={}", lib);
        println!("cargo:rustc-link-lib=dylib=parmetis");
        println!("cargo:rustc-link-lib=dylib=metis");

        println!("cargo:rerun-if-env-changed=PARMETIS_DIR");
        println!("cargo:rerun-if-env-changed=PARMETIS_LIB_DIR");
        println!("cargo:rerun-if-env-changed=PARMETIS_INCLUDE_DIR");

        (inc, lib)
    } else {
        let lib = pkg_config::Config::new()
            .statik(false)
            .probe("parmetis")
            .expect("Could not find ParMETIS via pkg-config; set PARMETIS_NO_PKG_CONFIG=1 to bypass");

        // pkg-config already emitted the link-search/link-lib lines for
        // parmetis itself; METIS rides along
        println!("cargo:rustc-link-lib=dylib=metis");

        let inc = lib
            .include_paths
            .first()
            .unwrap_or_else(|| panic!("pkg-config returned no include path for ParMETIS"))
            .display()
            .to_string();
        let lib_dir = lib
            .link_paths
            .first()
            .unwrap_or_else(|| panic!("pkg-config returned no library path for ParMETIS"))
            .display()
            .to_string();

        (inc, lib_dir)
    };

    // 2. generate + post-process parmetis_bindings.rs
    let out_path = Path::new("src").join("parmetis_bindings_raw.rs");
    let final_path = Path::new("src").join("parmetis_bindings.rs");

    let bindings = bindgen::Builder::default()
        .header(format!("{}/parmetis.h", include_dir))
        .allowlist_function("ParMETIS_.*")
        .allowlist_type("idx_t")
        .allowlist_type("real_t")
        .generate()
        .expect("Failed to generate ParMETIS bindings via bindgen");
    bindings
        .write_to_file(&out_path)
        .expect("Couldn't write raw bindings to src/parmetis_bindings_raw.rs");

    let raw_contents = read_to_string(&out_path)
        .expect("Unable to read src/parmetis_bindings_raw.rs for post-processing");

    let re_extern = Regex::new(r#"(?m)^(?P<prefix>\s*)(?P<block>extern\s+"C"\s*\{)"#)
        .expect("Invalid regex for extern block");
    let with_unsafe_extern = re_extern.replace_all(&raw_contents, |caps: &regex::Captures| {
        format!("{}unsafe {}", &caps["prefix"], &caps["block"])
    });

    write(&final_path, with_unsafe_extern.as_ref())
        .expect("Unable to write post-processed bindings to src/parmetis_bindings.rs");
    fs::remove_file(&out_path).expect("Unable to remove temporary parmetis_bindings_raw.rs");

    // 3. re-run triggers
    println!("cargo:rerun-if-env-changed=PARMETIS_NO_PKG_CONFIG");
    println!("cargo:rerun-if-env-changed=PARMETIS_DIR");
    println!("cargo:rerun-if-env-changed=PARMETIS_LIB_DIR");
    println!("cargo:rerun-if-env-changed=PARMETIS_INCLUDE_DIR");
    println!("cargo:rerun-if-changed={}/parmetis.h", include_dir);
}

#[cfg(not(feature = "parmetis-support"))]
fn main() {
    // no-op when the "parmetis-support" feature is disabled
}
