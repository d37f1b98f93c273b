//! Exposes the workspace `VERSION` file to the crate as `VEIL_VERSION`.

use std::path::Path;

fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("cargo sets CARGO_MANIFEST_DIR");
    let version_path = Path::new(&manifest_dir)
        .ancestors()
        .nth(2)
        .expect("crate lives two levels below the workspace root")
        .join("VERSION");

    println!("cargo:rerun-if-changed={}", version_path.display());

    let raw = std::fs::read_to_string(&version_path)
        .unwrap_or_else(|error| panic!("cannot read {}: {error}", version_path.display()));
    let version = raw.trim();
    assert!(!version.is_empty(), "VERSION must not be empty");
    assert!(
        !version.contains(char::is_whitespace),
        "VERSION must be a single token"
    );

    println!("cargo:rustc-env=VEIL_VERSION={version}");

    for name in ["VEIL_DROP_USER", "VEIL_DROP_GROUP"] {
        println!("cargo:rerun-if-env-changed={name}");
        if let Ok(value) = std::env::var(name) {
            assert!(!value.trim().is_empty(), "{name} must not be empty");
        }
    }
}
