//! Self-update client core.
//!
//! Given a repository slug and the running program's version, this crate
//! checks the repository's release feed for newer, non-draft releases,
//! extracts a changelog, picks a platform-appropriate download, streams it
//! to a staging file with progress reporting, and hands the file to a
//! platform installer. Presentation is left to the embedding application,
//! which observes everything through [`UpdateStatusListener`].

mod changelog;
mod check;
mod download;
mod error;
mod listener;
mod release;
mod transport;
mod updater;
mod version;

/// Changelog model produced by a successful check.
pub use changelog::{ChangeLog, VersionEntry, build_changelog};
/// Download session state snapshots.
pub use download::DownloadState;
/// Failure modes of one check or download operation.
pub use error::UpdateError;
/// Callback surface consumed by the embedding application.
pub use listener::UpdateStatusListener;
/// Raw release feed model and asset selection.
pub use release::{RawAsset, RawRelease, select_update_url};
/// HTTP seam: abstract transport plus the reqwest-backed default.
pub use transport::{GITHUB_ACCEPT, HttpTransport, Transport, TransportError, TransportResponse};
/// The updater facade and its configuration.
pub use updater::{AutoUpdater, UpdaterConfig};
/// Version ordering predicates.
pub use version::VersionComparator;
