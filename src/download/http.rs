//! HTTP transport for package transfers.
//!
//! [`HttpConnector`] builds a brand-new reqwest client for every binding, so
//! no connection state survives from one transfer to the next. Each
//! [`HttpTransport`] streams a single GET response body straight to the
//! destination file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Proxy};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::error::{SessionError, TransferError};
use super::events::ProgressSink;
use super::transport::{Connector, TransferRequest, Transport};
use crate::config::SessionConfig;
use crate::user_agent;

/// Connector producing reqwest-backed transports.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    config: SessionConfig,
}

impl HttpConnector {
    /// Creates a connector using the given timeouts, user agent and proxy.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }
}

impl Connector for HttpConnector {
    fn connect(&self) -> Result<Arc<dyn Transport>, SessionError> {
        let client = build_client(&self.config, ClientTimeouts::transfer(&self.config))?;
        Ok(Arc::new(HttpTransport { client }))
    }
}

/// Streams one GET response to disk.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, progress, cancel), fields(url = %request.source))]
    async fn fetch(
        &self,
        request: TransferRequest,
        mut progress: ProgressSink,
        cancel: CancellationToken,
    ) -> Result<u64, TransferError> {
        debug!(destination = %request.destination.display(), "starting transfer");

        let mut created_file = false;
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(TransferError::Canceled),
            result = stream_to_destination(&self.client, &request, &mut progress, &mut created_file) => result,
        };

        if let Err(error) = &result
            && created_file
        {
            debug!(
                path = %request.destination.display(),
                error = %error,
                "removing partial file after unsuccessful transfer"
            );
            let _ = tokio::fs::remove_file(&request.destination).await;
        }

        result
    }
}

/// Streams the response body for `request` into its destination.
///
/// Sets `created_file` once the destination has been created, so the caller
/// only cleans up files this transfer wrote.
async fn stream_to_destination(
    client: &Client,
    request: &TransferRequest,
    progress: &mut ProgressSink,
    created_file: &mut bool,
) -> Result<u64, TransferError> {
    let url = request.source.as_str();
    let path = request.destination.as_path();

    let response = client
        .get(request.source.clone())
        .send()
        .await
        .map_err(|e| TransferError::network(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransferError::http_status(url, status.as_u16()));
    }

    let total_bytes = response.content_length();
    debug!(total_bytes = ?total_bytes, "response headers received");

    let file = File::create(path)
        .await
        .map_err(|e| TransferError::io(path, e))?;
    *created_file = true;

    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk =
            chunk_result.map_err(|e| body_error(url, path, e, total_bytes, bytes_written))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| TransferError::io(path, e))?;

        bytes_written += chunk.len() as u64;
        progress.report(bytes_written, total_bytes);
    }

    writer
        .flush()
        .await
        .map_err(|e| TransferError::io(path, e))?;
    writer
        .into_inner()
        .sync_all()
        .await
        .map_err(|e| TransferError::io(path, e))?;

    if let Some(expected) = total_bytes
        && expected != bytes_written
    {
        return Err(TransferError::integrity(path, expected, bytes_written));
    }

    info!(path = %path.display(), bytes = bytes_written, "transfer complete");
    Ok(bytes_written)
}

/// Maps a failed body read. A connection that ends before the advertised
/// length is an integrity failure; stalls stay timeouts.
fn body_error(
    url: &str,
    path: &Path,
    source: reqwest::Error,
    total_bytes: Option<u64>,
    bytes_written: u64,
) -> TransferError {
    match total_bytes {
        Some(expected)
            if bytes_written < expected
                && !source.is_timeout()
                && (source.is_body() || source.is_decode()) =>
        {
            debug!(error = %source, "body ended before advertised length");
            TransferError::integrity(path, expected, bytes_written)
        }
        _ => TransferError::network(url, source),
    }
}

/// Which timeouts a client enforces.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ClientTimeouts {
    /// Idle timeout between body reads; transfers may run arbitrarily long.
    Transfer(Duration),
    /// Hard bound on the whole request.
    Total(Duration),
}

impl ClientTimeouts {
    fn transfer(config: &SessionConfig) -> Self {
        Self::Transfer(config.read_timeout())
    }
}

pub(crate) fn build_client(
    config: &SessionConfig,
    timeouts: ClientTimeouts,
) -> Result<Client, SessionError> {
    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(user_agent::default_user_agent);

    let mut builder = Client::builder()
        .connect_timeout(config.connect_timeout())
        .user_agent(user_agent);
    builder = match timeouts {
        ClientTimeouts::Transfer(idle) => builder.read_timeout(idle),
        ClientTimeouts::Total(total) => builder.timeout(total),
    };
    if let Some(proxy) = &config.proxy {
        let proxy = Proxy::all(proxy).map_err(|source| SessionError::ClientBuild { source })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|source| SessionError::ClientBuild { source })
}
