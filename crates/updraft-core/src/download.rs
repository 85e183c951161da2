use std::path::Path;
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;

use updraft_platform::Installer;

use crate::error::UpdateError;
use crate::listener::UpdateStatusListener;
use crate::transport::{Transport, TransportResponse};

/// Redirect hops tolerated before the download is abandoned.
const MAX_REDIRECT_HOPS: u32 = 5;

/// Where one download currently is. Observable through
/// [`DownloadSession::state`] snapshots; terminal states collapse back to
/// `Idle` once the outcome has been reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Idle,
    StagingOpen,
    Requesting,
    Redirecting,
    Streaming,
    Installing,
    Completed,
    Failed,
}

/// One "download and install" operation: staging file, bounded redirect
/// chase, streamed write with progress, installer hand-off.
///
/// The session owns exactly one staging file while active and rejects
/// overlapping downloads without touching the in-flight one.
pub(crate) struct DownloadSession {
    state: Mutex<DownloadState>,
}

impl DownloadSession {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(DownloadState::Idle),
        }
    }

    pub(crate) fn state(&self) -> DownloadState {
        *self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn set_state(&self, next: DownloadState) {
        *self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = next;
    }

    /// Run one download and report through `listener`.
    ///
    /// On success the listener sees a progress stream, then one
    /// `on_update_download_finished`, then the installer is invoked with the
    /// staging file path. Every failure produces exactly one
    /// `on_update_error`. The session is idle again when this returns.
    ///
    /// # Errors
    /// Returns [`UpdateError::Busy`] when a download is already in flight;
    /// the rejected call produces no listener traffic and leaves the
    /// in-flight download untouched.
    pub(crate) async fn run(
        &self,
        transport: &dyn Transport,
        update_url: &str,
        staging_path: &Path,
        installer: &dyn Installer,
        listener: &Arc<dyn UpdateStatusListener>,
    ) -> Result<(), UpdateError> {
        {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if *state != DownloadState::Idle {
                return Err(UpdateError::Busy {
                    operation: "update download",
                });
            }
            *state = DownloadState::StagingOpen;
        }

        info!("Downloading update from {update_url}");
        let outcome = self
            .execute(transport, update_url, staging_path, installer, listener)
            .await;

        self.set_state(if outcome.is_ok() {
            DownloadState::Completed
        } else {
            DownloadState::Failed
        });

        // Idle again before the terminal error callback, so the listener may
        // retry from inside it.
        self.set_state(DownloadState::Idle);

        if let Err(error) = outcome {
            warn!("Update download failed: {error}");
            listener.on_update_error(error.to_string());
        }

        Ok(())
    }

    async fn execute(
        &self,
        transport: &dyn Transport,
        update_url: &str,
        staging_path: &Path,
        installer: &dyn Installer,
        listener: &Arc<dyn UpdateStatusListener>,
    ) -> Result<(), UpdateError> {
        let mut file = tokio::fs::File::create(staging_path).await.map_err(|source| {
            UpdateError::StagingOpen {
                path: staging_path.display().to_string(),
                source,
            }
        })?;

        if !update_url.starts_with("https://") {
            warn!("Update URL is not https: {update_url}");
        }

        let mut url = update_url.to_string();
        for _hop in 0..=MAX_REDIRECT_HOPS {
            self.set_state(DownloadState::Requesting);
            let response = transport.fetch(&url, None).await?;

            if let Some(target) = response.redirect_target {
                // Redirect bodies never reach the staging file; only the
                // final response is streamed into it.
                self.set_state(DownloadState::Redirecting);
                url = resolve_redirect(&url, &target)?;
                debug!("Following redirect to {url}");
                continue;
            }

            if !response.is_success() {
                return Err(UpdateError::HttpStatus {
                    status: response.status,
                });
            }

            self.set_state(DownloadState::Streaming);
            stream_to_staging(&mut file, response, staging_path, listener).await?;
            drop(file);

            listener.on_update_download_finished();

            self.set_state(DownloadState::Installing);
            info!("Handing {} to the installer", staging_path.display());
            if !installer.install(staging_path) {
                return Err(UpdateError::InstallLaunch);
            }

            return Ok(());
        }

        Err(UpdateError::RedirectLimit(MAX_REDIRECT_HOPS))
    }
}

async fn stream_to_staging(
    file: &mut tokio::fs::File,
    response: TransportResponse,
    staging_path: &Path,
    listener: &Arc<dyn UpdateStatusListener>,
) -> Result<(), UpdateError> {
    let total = response.content_length.unwrap_or(0);
    let mut received: u64 = 0;

    let mut body = response.body;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|source| UpdateError::StagingWrite {
                path: staging_path.display().to_string(),
                source,
            })?;
        received += chunk.len() as u64;
        listener.on_update_download_progress(progress_percent(received, total));
    }

    file.flush()
        .await
        .map_err(|source| UpdateError::StagingWrite {
            path: staging_path.display().to_string(),
            source,
        })?;

    info!("Download complete: {received} bytes");
    Ok(())
}

/// `min(100, received * 100 / total)`; a missing or degenerate total (zero,
/// or smaller than what already arrived) reports 100.
fn progress_percent(received: u64, total: u64) -> f32 {
    if total == 0 || total < received {
        return 100.0;
    }
    ((received as f64) * 100.0 / (total as f64)).min(100.0) as f32
}

fn resolve_redirect(current: &str, target: &str) -> Result<String, UpdateError> {
    let base = reqwest::Url::parse(current)
        .map_err(|_| UpdateError::MalformedRedirect(target.to_string()))?;
    let next = reqwest::Url::parse(target)
        .or_else(|_| base.join(target))
        .map_err(|_| UpdateError::MalformedRedirect(target.to_string()))?;

    if base.scheme() == "https" && next.scheme() != "https" {
        return Err(UpdateError::InsecureRedirect {
            from: current.to_string(),
            to: next.to_string(),
        });
    }

    Ok(next.to_string())
}
