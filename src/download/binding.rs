//! Transport bindings: the single-use resource behind one transfer.
//!
//! A binding pairs a freshly connected [`Transport`] with a cancellation
//! token, the transfer's event forwarder and a phase tag. It is launched at
//! most once. Dropping it detaches the forwarder and cancels a running
//! transfer, so a discarded binding can never notify anyone again.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::descriptor::DownloadDescriptor;
use super::error::TransferError;
use super::events::{CompletionOutcome, EventForwarder, ProgressSink, TransferEvents};
use super::transport::{TransferRequest, Transport};

/// Process-unique identity of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value of the id.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a [`DownloadSession`](super::DownloadSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionState {
    /// No binding.
    Idle = 0,
    /// A fresh binding is ready to start.
    Prepared = 1,
    /// A transfer is running.
    InFlight = 2,
    /// The last transfer completed.
    Succeeded = 3,
    /// The last transfer was canceled.
    Canceled = 4,
    /// The last transfer failed.
    Failed = 5,
}

impl SessionState {
    /// True for `Succeeded`, `Canceled` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Canceled | Self::Failed)
    }

    fn for_outcome(outcome: &CompletionOutcome) -> Self {
        match outcome {
            CompletionOutcome::Succeeded => Self::Succeeded,
            CompletionOutcome::Canceled => Self::Canceled,
            CompletionOutcome::Failed { .. } => Self::Failed,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Prepared,
            2 => Self::InFlight,
            3 => Self::Succeeded,
            4 => Self::Canceled,
            5 => Self::Failed,
            _ => Self::Idle,
        }
    }
}

/// Phase tag shared between a binding and its transfer task.
#[derive(Debug)]
struct Phase(AtomicU8);

impl Phase {
    fn new(state: SessionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn load(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn store(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Exclusively owned, single-use transport resource.
pub(crate) struct TransportBinding {
    id: BindingId,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
    phase: Arc<Phase>,
    forwarder: Option<EventForwarder>,
}

impl fmt::Debug for TransportBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportBinding")
            .field("id", &self.id)
            .field("phase", &self.phase.load())
            .finish_non_exhaustive()
    }
}

impl TransportBinding {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            id: BindingId::next(),
            transport,
            cancel: CancellationToken::new(),
            phase: Arc::new(Phase::new(SessionState::Prepared)),
            forwarder: None,
        }
    }

    pub(crate) fn id(&self) -> BindingId {
        self.id
    }

    pub(crate) fn phase(&self) -> SessionState {
        self.phase.load()
    }

    /// Spawns the transfer for `descriptor` on `runtime`.
    ///
    /// Must only be called on a `Prepared` binding; the session enforces this.
    pub(crate) fn launch(&mut self, descriptor: DownloadDescriptor, runtime: &Handle) -> TransferEvents {
        debug_assert_eq!(self.phase(), SessionState::Prepared);

        let (forwarder, events) = EventForwarder::channel(descriptor.correlation_token().clone());
        self.forwarder = Some(forwarder.clone());
        self.phase.store(SessionState::InFlight);

        let binding = self.id;
        let token = descriptor.correlation_token().clone();
        let request = TransferRequest {
            source: descriptor.source().clone(),
            destination: descriptor.destination().to_path_buf(),
        };
        let transport = Arc::clone(&self.transport);
        let cancel = self.cancel.clone();
        let phase = Arc::clone(&self.phase);

        runtime.spawn(async move {
            let progress = ProgressSink::new(forwarder.clone());
            let result = AssertUnwindSafe(transport.fetch(request, progress, cancel))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    warn!(binding = %binding, message = %message, "transport panicked");
                    Err(TransferError::Panicked { message })
                });

            let outcome = CompletionOutcome::from_result(result);
            match &outcome {
                CompletionOutcome::Succeeded => {
                    info!(binding = %binding, token = %token, "download file is complete");
                }
                CompletionOutcome::Canceled => {
                    info!(binding = %binding, token = %token, "download canceled");
                }
                CompletionOutcome::Failed { reason } => {
                    warn!(binding = %binding, token = %token, error = %reason, "download failed");
                }
            }

            let delivered = forwarder.complete(outcome, |outcome| {
                phase.store(SessionState::for_outcome(outcome));
            });
            if !delivered {
                debug!(binding = %binding, "binding was discarded; completion not delivered");
            }
        });

        events
    }

    /// Asks a running transfer to abort. Returns false when nothing is running.
    pub(crate) fn request_cancel(&self) -> bool {
        if self.phase() != SessionState::InFlight {
            return false;
        }
        // CancellationToken::cancel is idempotent and cannot fail.
        self.cancel.cancel();
        true
    }
}

impl Drop for TransportBinding {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.detach();
        }
        if self.request_cancel() {
            debug!(binding = %self.id, "canceled in-flight transfer while discarding binding");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
