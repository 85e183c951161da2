use std::path::Path;

use log::{info, warn};

/// Collaborator that hands a fully downloaded update artifact to the
/// operating system.
///
/// Returns `true` when the installer/launcher was started. The caller treats
/// `false` as "the update was downloaded but could not be launched"; it does
/// not retry.
pub trait Installer: Send + Sync {
    fn install(&self, file_path: &Path) -> bool;
}

/// Default [`Installer`]: starts the downloaded artifact as a detached
/// process and lets it outlive the current program.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedLauncher;

impl Installer for DetachedLauncher {
    fn install(&self, file_path: &Path) -> bool {
        match launch_detached(file_path) {
            Ok(()) => {
                info!("Launched installer: {}", file_path.display());
                true
            }
            Err(error) => {
                warn!(
                    "Failed to launch installer {}: {error}",
                    file_path.display()
                );
                false
            }
        }
    }
}

#[cfg(target_os = "windows")]
fn launch_detached(file_path: &Path) -> std::io::Result<()> {
    std::process::Command::new(file_path).spawn().map(|_| ())
}

#[cfg(target_os = "macos")]
fn launch_detached(file_path: &Path) -> std::io::Result<()> {
    std::process::Command::new("open")
        .arg(file_path)
        .spawn()
        .map(|_| ())
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn launch_detached(file_path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    // AppImages are downloaded without the exec bit.
    let mut permissions = std::fs::metadata(file_path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    std::fs::set_permissions(file_path, permissions)?;

    std::process::Command::new(file_path).spawn().map(|_| ())
}
