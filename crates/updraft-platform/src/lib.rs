//! Platform plumbing for Updraft.
//!
//! Everything OS-specific about applying an update lives here:
//! - The update artifact extension for the running platform.
//! - Staging file path resolution for in-progress downloads.
//! - Launching a downloaded installer as a detached process.

mod artifact;
mod launcher;

pub use artifact::{default_staging_dir, staging_file_path, update_file_extension};
pub use launcher::{DetachedLauncher, Installer};
