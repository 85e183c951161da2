use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use thiserror::Error;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Media type for GitHub's REST API content negotiation.
pub const GITHUB_ACCEPT: &str = "application/vnd.github+json";

#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be issued at all (malformed URL, client build
    /// failure). No response was ever in flight.
    #[error("Network request rejected: {0}")]
    Rejected(String),

    /// The transport failed after the request was issued (DNS, TLS,
    /// connection loss mid-stream).
    #[error("{0}")]
    Failed(String),
}

/// Head of one HTTP response plus its body as a byte stream.
///
/// Redirects are surfaced, not followed: the session owning the request
/// decides whether and where to follow.
pub struct TransportResponse {
    pub status: u16,
    /// `Location` target when the response is a redirect.
    pub redirect_target: Option<String>,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, TransportError>>,
}

impl TransportResponse {
    pub(crate) fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the body into memory. Used for the release feed, which is
    /// small; downloads stream instead.
    pub async fn into_bytes(self) -> Result<Vec<u8>, TransportError> {
        let mut body = self.body;
        let mut bytes = Vec::new();
        while let Some(chunk) = body.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        Ok(bytes)
    }
}

/// Abstract HTTP GET. The sessions drive everything through this seam so
/// the state machine can be exercised with scripted transports.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        accept: Option<&'static str>,
    ) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed [`Transport`].
///
/// Automatic redirects are disabled; the download session enforces its own
/// hop bound and downgrade policy. TLS certificate verification stays on.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client with redirects disabled and the given user agent.
    ///
    /// # Errors
    /// Returns [`TransportError::Rejected`] when the underlying client
    /// cannot be constructed.
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|error| TransportError::Rejected(error.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an existing client. The client must have automatic redirects
    /// disabled for the download hop accounting to hold.
    #[must_use]
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(
        &self,
        url: &str,
        accept: Option<&'static str>,
    ) -> Result<TransportResponse, TransportError> {
        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header(reqwest::header::ACCEPT, accept);
        }

        let response = request.send().await.map_err(|error| {
            if error.is_builder() {
                TransportError::Rejected(error.to_string())
            } else {
                TransportError::Failed(error.to_string())
            }
        })?;

        let status = response.status();
        let redirect_target = if status.is_redirection() {
            response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        } else {
            None
        };

        Ok(TransportResponse {
            status: status.as_u16(),
            redirect_target,
            content_length: response.content_length(),
            body: response
                .bytes_stream()
                .map_err(|error| TransportError::Failed(error.to_string()))
                .boxed(),
        })
    }
}
