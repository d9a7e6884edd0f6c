//! Single-flight download session.
//!
//! A [`DownloadSession`] owns at most one transport binding and drives at
//! most one transfer at a time:
//!
//! ```text
//! Idle --prepare--> Prepared --start--> InFlight --> Succeeded | Canceled | Failed
//!   ^                  ^                                        |
//!   |                  +----------------prepare------------------+
//!   +--dispose-- (any state)
//! ```
//!
//! `start` on a terminal or idle session re-prepares first. `start` while a
//! transfer is in flight is rejected instead of queued.
//!
//! # Example
//!
//! ```no_run
//! use update_downloader::{DownloadDescriptor, DownloadSession};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = DownloadSession::default();
//! let source = Url::parse("https://cdn.example.com/app-2.0.zip")?;
//! let events = session.start(DownloadDescriptor::new(source, "/tmp/app-2.0.zip", "app-2.0"))?;
//! let outcome = events.outcome().await;
//! println!("finished: {outcome:?}");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info, instrument};

use super::binding::{BindingId, SessionState, TransportBinding};
use super::descriptor::DownloadDescriptor;
use super::error::SessionError;
use super::events::TransferEvents;
use super::http::HttpConnector;
use super::transport::Connector;
use crate::config::SessionConfig;

/// Drives one package transfer at a time and mediates cancellation.
pub struct DownloadSession {
    connector: Arc<dyn Connector>,
    binding: Option<TransportBinding>,
}

impl std::fmt::Debug for DownloadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadSession")
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

impl Default for DownloadSession {
    fn default() -> Self {
        Self::new(HttpConnector::default())
    }
}

impl DownloadSession {
    /// Creates an idle session whose bindings come from `connector`.
    ///
    /// No binding is created until [`prepare`](Self::prepare) or
    /// [`start`](Self::start).
    pub fn new(connector: impl Connector + 'static) -> Self {
        Self {
            connector: Arc::new(connector),
            binding: None,
        }
    }

    /// Creates an idle HTTP session with the given configuration.
    #[must_use]
    pub fn with_config(config: SessionConfig) -> Self {
        Self::new(HttpConnector::new(config))
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.binding
            .as_ref()
            .map_or(SessionState::Idle, TransportBinding::phase)
    }

    /// True iff a transfer is in flight.
    #[must_use]
    pub fn is_downloading(&self) -> bool {
        self.state() == SessionState::InFlight
    }

    /// Identity of the current binding, if any.
    #[must_use]
    pub fn binding_id(&self) -> Option<BindingId> {
        self.binding.as_ref().map(TransportBinding::id)
    }

    /// Discards the current binding (if any) and creates a fresh one.
    ///
    /// The old binding stops delivering notifications before the new one
    /// exists. If it was mid-transfer, its cancellation is requested; that
    /// request cannot fail. On success the session is `Prepared`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ClientBuild`] if the connector cannot build a
    /// transport. The session is then `Idle`.
    #[instrument(level = "debug", skip(self))]
    pub fn prepare(&mut self) -> Result<BindingId, SessionError> {
        self.fresh_binding().map(|binding| binding.id())
    }

    fn fresh_binding(&mut self) -> Result<&mut TransportBinding, SessionError> {
        debug!("preparing to download file");
        if let Some(previous) = self.binding.take() {
            debug!(
                binding = %previous.id(),
                state = ?previous.phase(),
                "binding existed already; discarding"
            );
            drop(previous);
        }

        let transport = self.connector.connect()?;
        let binding = TransportBinding::new(transport);
        debug!(binding = %binding.id(), "created new binding");
        Ok(self.binding.insert(binding))
    }

    /// Starts downloading `descriptor` and returns its event stream.
    ///
    /// Returns immediately; the transfer runs on the current tokio runtime.
    /// An idle or finished session is re-prepared first, so a transfer
    /// never runs on a binding that carried an earlier one.
    ///
    /// # Errors
    ///
    /// - [`SessionError::AlreadyInFlight`] if a transfer is running; that
    ///   transfer is left untouched.
    /// - [`SessionError::NoRuntime`] if called outside a tokio runtime.
    /// - [`SessionError::ClientBuild`] if re-preparation fails.
    #[instrument(skip(self, descriptor), fields(url = %descriptor.source()))]
    pub fn start(&mut self, descriptor: DownloadDescriptor) -> Result<TransferEvents, SessionError> {
        if let Some(binding) = &self.binding
            && binding.phase() == SessionState::InFlight
        {
            return Err(SessionError::AlreadyInFlight {
                binding: binding.id(),
            });
        }

        let runtime = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;

        let binding = match self.binding {
            Some(ref mut binding) if binding.phase() == SessionState::Prepared => binding,
            _ => self.fresh_binding()?,
        };

        info!(
            binding = %binding.id(),
            destination = %descriptor.destination().display(),
            token = %descriptor.correlation_token(),
            "starting file download"
        );
        Ok(binding.launch(descriptor, &runtime))
    }

    /// Requests that the in-flight transfer abort.
    ///
    /// Advisory and idempotent: it never fails and never emits anything
    /// itself. The resulting outcome (usually `Canceled`, or whatever the
    /// transport reported first) arrives through the transfer's event
    /// stream. Does nothing when no transfer is in flight.
    pub fn cancel(&self) {
        match &self.binding {
            Some(binding) if binding.request_cancel() => {
                info!(binding = %binding.id(), "canceling download");
            }
            _ => debug!("cancel requested with no download in flight"),
        }
    }

    /// Releases the binding, silencing and canceling any running transfer.
    ///
    /// Safe to call in any state and more than once. The session is `Idle`
    /// afterwards and can be prepared again.
    pub fn dispose(&mut self) {
        if let Some(binding) = self.binding.take() {
            debug!(binding = %binding.id(), "disposing binding");
        }
    }
}

impl Drop for DownloadSession {
    fn drop(&mut self) {
        self.dispose();
    }
}
