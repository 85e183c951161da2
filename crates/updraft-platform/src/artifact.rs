use std::path::{Path, PathBuf};

/// File extension of the update artifact this platform can install.
#[must_use]
pub fn update_file_extension() -> &'static str {
    if cfg!(target_os = "windows") {
        ".exe"
    } else if cfg!(target_os = "macos") {
        ".dmg"
    } else {
        ".AppImage"
    }
}

/// Directory where downloads are staged unless the caller overrides it.
#[must_use]
pub fn default_staging_dir() -> PathBuf {
    std::env::temp_dir()
}

/// Path of the staging file for one download attempt.
///
/// The file name is deterministic (`<product><extension>`), so a new
/// attempt overwrites whatever a previous one left behind. `extension` is
/// normally [`update_file_extension`].
#[must_use]
pub fn staging_file_path(staging_dir: &Path, product_name: &str, extension: &str) -> PathBuf {
    staging_dir.join(format!("{product_name}{extension}"))
}
