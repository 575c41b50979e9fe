//! Build script for the checkout crate.
//!
//! Generates content-based hashes for static assets (stylesheet and script)
//! so templates can reference immutable, cache-busted file names.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Static assets to fingerprint: (path under `static/`, env var, extension).
const ASSETS: [(&str, &str, &str); 2] = [
    ("css/main", "CSS_HASH", "css"),
    ("js/checkout", "JS_HASH", "js"),
];

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let static_dir = Path::new(&manifest_dir).join("static");

    for (stem, var, ext) in ASSETS {
        hash_asset(&static_dir, stem, var, ext);
    }
}

/// Hash `static/{stem}.{ext}` and copy it to `static/{dir}/derived/` with the
/// hash in its file name.
///
/// Sets `{var}` for use with `env!`. An unreadable asset yields an empty hash
/// so the crate still builds.
fn hash_asset(static_dir: &Path, stem: &str, var: &str, ext: &str) {
    let source = static_dir.join(format!("{stem}.{ext}"));
    println!("cargo:rerun-if-changed={}", source.display());

    let content = match fs::read(&source) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read {}: {e}", source.display());
            println!("cargo:rustc-env={var}=");
            return;
        }
    };

    let hash = format!("{:x}", Sha256::digest(&content));
    let short_hash = &hash[..8];
    println!("cargo:rustc-env={var}={short_hash}");

    let source_dir = source.parent().unwrap_or(static_dir);
    let derived_dir = source_dir.join("derived");
    fs::create_dir_all(&derived_dir).expect("Failed to create derived asset directory");

    let file_name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("asset");
    let derived_path = derived_dir.join(format!("{file_name}.{short_hash}.{ext}"));
    fs::copy(&source, &derived_path).expect("Failed to copy asset to derived directory");
}
