// Where to find the manifest

use std::path::PathBuf;

/// Environment variable overriding the manifest location
pub const MANIFEST_ENV: &str = "NSMAP_MANIFEST";

/// Manifest file name looked up in the current directory
pub const DEFAULT_MANIFEST: &str = "autoload.json";

/// Explicit path first, then $NSMAP_MANIFEST, then ./autoload.json
pub fn manifest_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }

    if let Ok(path) = std::env::var(MANIFEST_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    PathBuf::from(DEFAULT_MANIFEST)
}
