//! Preflight resolution of a package's destination file name.
//!
//! Update servers often answer a stable "latest" link with a redirect to a
//! versioned file. [`DestinationResolver`] issues a HEAD request, follows the
//! redirect chain, and reports the file name of the *final* location. It is
//! a display and naming aid only: every failure collapses to `None` and
//! never affects a later download.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_LENGTH;
use tracing::{debug, instrument};
use url::Url;

use super::error::SessionError;
use super::http::{ClientTimeouts, build_client};
use crate::config::SessionConfig;

/// What a successful preflight learned about a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDestination {
    /// File name taken from the last path segment of `final_url`.
    pub file_name: String,
    /// Location after all redirects.
    pub final_url: Url,
    /// Advertised size, when the server sent a Content-Length header.
    pub content_length: Option<u64>,
}

/// Stateless HEAD-based resolver. Safe to share and to call concurrently.
#[derive(Debug, Clone)]
pub struct DestinationResolver {
    client: Client,
    timeout: Duration,
}

impl DestinationResolver {
    /// Creates a resolver bounded by `config.resolve_timeout_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ClientBuild`] if the HTTP client cannot be
    /// built (for example, an unusable proxy).
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        Self::with_timeout(config, config.resolve_timeout())
    }

    /// Creates a resolver with an explicit timeout, overriding the config.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_timeout(config: &SessionConfig, timeout: Duration) -> Result<Self, SessionError> {
        let client = build_client(config, ClientTimeouts::Total(timeout))?;
        Ok(Self { client, timeout })
    }

    /// The bound on a single resolution.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the file name `source` will be saved under, or `None`.
    pub async fn resolve(&self, source: &str) -> Option<String> {
        self.resolve_details(source)
            .await
            .map(|resolved| resolved.file_name)
    }

    /// Like [`resolve`](Self::resolve), also reporting the final URL and the
    /// advertised size.
    #[instrument(skip(self), fields(url = %source))]
    pub async fn resolve_details(&self, source: &str) -> Option<ResolvedDestination> {
        let Ok(url) = Url::parse(source) else {
            debug!("malformed source location");
            return None;
        };

        let request = self.client.head(url).send();
        let response = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                debug!(error = %error, "preflight request failed");
                return None;
            }
            Err(_) => {
                debug!(timeout_secs = self.timeout.as_secs(), "preflight request timed out");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "preflight returned non-success status");
            return None;
        }

        let final_url = response.url().clone();
        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let file_name = file_name_from_url(&final_url)?;

        debug!(file_name = %file_name, final_url = %final_url, "resolved destination");
        Some(ResolvedDestination {
            file_name,
            final_url,
            content_length,
        })
    }
}

/// Extracts the percent-decoded last path segment of `url`.
///
/// Returns `None` when the path ends in `/` or decodes to nothing usable.
#[must_use]
pub fn file_name_from_url(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(last).ok()?;
    // A decoded "%2F" must not smuggle in a directory component.
    Path::new(&*decoded)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}
