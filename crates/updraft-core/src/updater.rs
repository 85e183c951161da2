use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use updraft_platform::{
    DetachedLauncher, Installer, default_staging_dir, staging_file_path, update_file_extension,
};

use crate::changelog::normalize_tag;
use crate::check::UpdateCheckSession;
use crate::download::{DownloadSession, DownloadState};
use crate::error::UpdateError;
use crate::listener::UpdateStatusListener;
use crate::transport::{HttpTransport, Transport};
use crate::version::VersionComparator;

const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Static description of the product being updated.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Repository slug, `owner/name`.
    pub repo: String,
    /// Version of the running program, `v` prefix allowed.
    pub current_version: String,
    /// Name used for the staging file and the HTTP user agent.
    pub product_name: String,
    /// Releases API root; override for GitHub Enterprise or test servers.
    pub api_base: String,
    /// Directory holding the staging file; defaults to the system temp dir.
    pub staging_dir: PathBuf,
    /// Artifact suffix to look for in release assets; defaults to this
    /// platform's installer extension.
    pub target_extension: String,
}

impl UpdaterConfig {
    pub fn new(
        repo: impl Into<String>,
        current_version: impl Into<String>,
        product_name: impl Into<String>,
    ) -> Self {
        Self {
            repo: repo.into(),
            current_version: current_version.into(),
            product_name: product_name.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            staging_dir: default_staging_dir(),
            target_extension: update_file_extension().to_string(),
        }
    }
}

/// Self-update client for one product hosted on a GitHub-style forge.
///
/// Owns one check session and one download session; at most one operation
/// of each kind is in flight at a time. All operation outcomes are reported
/// through the registered [`UpdateStatusListener`].
pub struct AutoUpdater {
    config: UpdaterConfig,
    /// `config.current_version` with the tag prefix stripped, so it compares
    /// against normalized release tags.
    current_version: String,
    comparator: VersionComparator,
    transport: Arc<dyn Transport>,
    installer: Arc<dyn Installer>,
    listener: Mutex<Option<Arc<dyn UpdateStatusListener>>>,
    check: UpdateCheckSession,
    download: DownloadSession,
}

impl AutoUpdater {
    /// Build an updater with the default collaborators: a reqwest transport
    /// (redirects disabled, TLS verification on), the natural version
    /// comparator, and the platform's detached installer launcher.
    ///
    /// # Errors
    /// Returns an error when the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: UpdaterConfig) -> Result<Self, UpdateError> {
        let user_agent = format!(
            "{}/updraft/{}",
            config.product_name,
            env!("CARGO_PKG_VERSION")
        );
        let transport = HttpTransport::new(&user_agent)?;
        Self::with_collaborators(
            config,
            VersionComparator::default(),
            Arc::new(transport),
            Arc::new(DetachedLauncher),
        )
    }

    /// Build an updater with explicit collaborators. This is the seam both
    /// for custom version orderings and for exercising the state machine
    /// with scripted transports and installers.
    ///
    /// # Errors
    /// Returns [`UpdateError::Invalid`] when the current version is empty or
    /// the repository slug is not `owner/name`.
    pub fn with_collaborators(
        config: UpdaterConfig,
        comparator: VersionComparator,
        transport: Arc<dyn Transport>,
        installer: Arc<dyn Installer>,
    ) -> Result<Self, UpdateError> {
        if config.current_version.trim().is_empty() {
            return Err(UpdateError::Invalid(
                "current version string must not be empty".to_string(),
            ));
        }
        if !config.repo.contains('/') {
            return Err(UpdateError::Invalid(format!(
                "repository slug must be owner/name, got {:?}",
                config.repo
            )));
        }

        let current_version = normalize_tag(&config.current_version).to_string();

        Ok(Self {
            config,
            current_version,
            comparator,
            transport,
            installer,
            listener: Mutex::new(None),
            check: UpdateCheckSession::new(),
            download: DownloadSession::new(),
        })
    }

    /// Register (or replace) the listener. Swapping between operations is
    /// fine; an operation keeps reporting to the listener that was
    /// registered when it started.
    pub fn set_listener(&self, listener: Arc<dyn UpdateStatusListener>) {
        *self
            .listener
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(listener);
    }

    #[must_use]
    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    #[must_use]
    pub fn releases_feed_url(&self) -> String {
        format!(
            "{}/repos/{}/releases",
            self.config.api_base.trim_end_matches('/'),
            self.config.repo
        )
    }

    #[must_use]
    pub fn staging_path(&self) -> PathBuf {
        staging_file_path(
            &self.config.staging_dir,
            &self.config.product_name,
            &self.config.target_extension,
        )
    }

    #[must_use]
    pub fn download_state(&self) -> DownloadState {
        self.download.state()
    }

    /// Query the release feed and report the changelog of newer releases
    /// (possibly empty) or an error through the listener.
    ///
    /// # Errors
    /// Returns an error only when the call never became an operation: no
    /// listener is registered, or a check is already in flight.
    pub async fn check_for_updates(&self) -> Result<(), UpdateError> {
        let listener = self.listener()?;
        self.check
            .run(
                self.transport.as_ref(),
                &self.releases_feed_url(),
                &self.current_version,
                &self.comparator,
                &self.config.target_extension,
                &listener,
            )
            .await
    }

    /// Download `update_url` to the staging file and hand it to the
    /// installer, reporting progress and the outcome through the listener.
    ///
    /// # Errors
    /// Returns an error only when the call never became an operation: no
    /// listener is registered, or a download is already in flight.
    pub async fn download_and_install(&self, update_url: &str) -> Result<(), UpdateError> {
        let listener = self.listener()?;
        let staging_path = self.staging_path();
        self.download
            .run(
                self.transport.as_ref(),
                update_url,
                &staging_path,
                self.installer.as_ref(),
                &listener,
            )
            .await
    }

    fn listener(&self) -> Result<Arc<dyn UpdateStatusListener>, UpdateError> {
        self.listener
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                UpdateError::Invalid("no update status listener registered".to_string())
            })
    }
}
