//! Seams between the session and the network.
//!
//! A [`Connector`] hands out one [`Transport`] per binding; a binding never
//! outlives its transfer, so neither does its transport. The HTTP
//! implementation lives in `http.rs`; tests plug in scripted transports.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::error::{SessionError, TransferError};
use super::events::ProgressSink;

/// What a transport needs to perform one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Absolute location of the package.
    pub source: Url,
    /// Local path the body is streamed into.
    pub destination: PathBuf,
}

/// Performs a single streaming transfer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Streams `request.source` into `request.destination`, reporting
    /// cumulative progress to `progress`.
    ///
    /// Implementations must watch `cancel` and return
    /// [`TransferError::Canceled`] when they abort because of it. Returns the
    /// number of bytes written on success.
    async fn fetch(
        &self,
        request: TransferRequest,
        progress: ProgressSink,
        cancel: CancellationToken,
    ) -> Result<u64, TransferError>;
}

/// Builds the transport behind a fresh binding.
pub trait Connector: Send + Sync {
    /// Creates a new, unused transport.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ClientBuild`] if the underlying client cannot
    /// be constructed.
    fn connect(&self) -> Result<Arc<dyn Transport>, SessionError>;
}
