use thiserror::Error;

use crate::transport::TransportError;

/// Failure modes of one check or download operation.
///
/// Every variant except [`Busy`](Self::Busy) and
/// [`Invalid`](Self::Invalid) is reported to the listener as the single
/// terminal callback of the operation that produced it; `Busy` is returned
/// to the caller instead, because the operation it rejects never started.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("update server responded with HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("No data downloaded.")]
    EmptyResponse,

    #[error("failed to parse the release feed: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("failed to open staging file {path}: {source}")]
    StagingOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write staging file {path}: {source}")]
    StagingWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stopped after {0} redirects without reaching the download")]
    RedirectLimit(u32),

    #[error("refusing redirect from {from} to insecure {to}")]
    InsecureRedirect { from: String, to: String },

    #[error("redirect target could not be resolved: {0}")]
    MalformedRedirect(String),

    #[error("Failed to launch the downloaded update.")]
    InstallLaunch,

    #[error("another {operation} is already in progress")]
    Busy { operation: &'static str },

    #[error("{0}")]
    Invalid(String),
}
