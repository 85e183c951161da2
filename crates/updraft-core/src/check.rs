use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};

use crate::changelog::{ChangeLog, build_changelog};
use crate::error::UpdateError;
use crate::listener::UpdateStatusListener;
use crate::release::RawRelease;
use crate::transport::{GITHUB_ACCEPT, Transport};
use crate::version::VersionComparator;

/// One "check for updates" round trip: request the release feed, parse it,
/// filter it against the running version, report the result.
///
/// The session is reusable; it rejects overlapping checks and returns to
/// idle after every outcome.
pub(crate) struct UpdateCheckSession {
    in_flight: AtomicBool,
}

impl UpdateCheckSession {
    pub(crate) fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run one check and report through `listener` exactly once.
    ///
    /// # Errors
    /// Returns [`UpdateError::Busy`] when a check is already in flight; the
    /// rejected call produces no listener traffic.
    pub(crate) async fn run(
        &self,
        transport: &dyn Transport,
        feed_url: &str,
        current_version: &str,
        comparator: &VersionComparator,
        target_extension: &str,
        listener: &Arc<dyn UpdateStatusListener>,
    ) -> Result<(), UpdateError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(UpdateError::Busy {
                operation: "update check",
            });
        }

        debug!("Checking for updates at {feed_url}");
        let outcome = fetch_changelog(
            transport,
            feed_url,
            current_version,
            comparator,
            target_extension,
        )
        .await;

        // Idle again before reporting, so the listener may start the next
        // operation from inside its callback.
        self.in_flight.store(false, Ordering::Release);

        match outcome {
            Ok(changelog) => {
                info!(
                    "Update check finished, {} newer release(s)",
                    changelog.len()
                );
                listener.on_update_available(changelog);
            }
            Err(error) => listener.on_update_error(error.to_string()),
        }

        Ok(())
    }
}

async fn fetch_changelog(
    transport: &dyn Transport,
    feed_url: &str,
    current_version: &str,
    comparator: &VersionComparator,
    target_extension: &str,
) -> Result<ChangeLog, UpdateError> {
    let response = transport.fetch(feed_url, Some(GITHUB_ACCEPT)).await?;

    if !response.is_success() {
        return Err(UpdateError::HttpStatus {
            status: response.status,
        });
    }

    let body = response.into_bytes().await?;
    if body.is_empty() {
        return Err(UpdateError::EmptyResponse);
    }

    let releases: Vec<RawRelease> =
        serde_json::from_slice(&body).map_err(UpdateError::MalformedResponse)?;

    Ok(build_changelog(
        &releases,
        current_version,
        comparator,
        target_extension,
    ))
}
