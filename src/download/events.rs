//! Caller-facing transfer notifications.
//!
//! Each started transfer gets its own unbounded channel. The transfer task
//! writes progress and exactly one completion into it through an
//! [`EventForwarder`]; the caller reads them from [`TransferEvents`].
//! Unbounded delivery keeps the transport from ever waiting on a slow
//! reader, and a single sender keeps events in emission order.

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;

use super::descriptor::CorrelationToken;
use super::error::TransferError;

/// Point-in-time progress of a running transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Bytes written to the destination so far.
    pub bytes_received: u64,
    /// Advertised size, absent when the server sent no content length.
    pub total_bytes: Option<u64>,
    /// Whole percent complete, absent when the total is unknown or zero.
    pub percentage: Option<u8>,
    /// Token from the originating descriptor.
    pub correlation_token: CorrelationToken,
}

impl ProgressSnapshot {
    /// Builds a snapshot, deriving the percentage from the two counters.
    #[must_use]
    pub fn new(
        bytes_received: u64,
        total_bytes: Option<u64>,
        correlation_token: CorrelationToken,
    ) -> Self {
        Self {
            bytes_received,
            total_bytes,
            percentage: percentage_of(bytes_received, total_bytes),
            correlation_token,
        }
    }
}

fn percentage_of(bytes_received: u64, total_bytes: Option<u64>) -> Option<u8> {
    let total = total_bytes.filter(|total| *total > 0)?;
    let percent = u128::from(bytes_received.min(total)) * 100 / u128::from(total);
    u8::try_from(percent).ok()
}

/// Terminal result of a transfer. Delivered exactly once.
#[derive(Debug)]
pub enum CompletionOutcome {
    /// The destination file is complete and closed.
    Succeeded,
    /// The transport aborted after a cancel request.
    Canceled,
    /// The transfer ended with an error.
    Failed {
        /// What went wrong.
        reason: TransferError,
    },
}

impl CompletionOutcome {
    /// Maps a transport result onto an outcome. The transport's own report
    /// of cancellation decides between `Canceled` and the other variants.
    pub(crate) fn from_result(result: Result<u64, TransferError>) -> Self {
        match result {
            Ok(_) => Self::Succeeded,
            Err(TransferError::Canceled) => Self::Canceled,
            Err(reason) => Self::Failed { reason },
        }
    }

    /// Returns true for `Succeeded`.
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns true for `Canceled`.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Returns the failure reason, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&TransferError> {
        match self {
            Self::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// A single notification from a transfer.
#[derive(Debug)]
pub enum DownloadEvent {
    /// Bytes arrived.
    Progress(ProgressSnapshot),
    /// The transfer reached a terminal state. Always the last event.
    Completed {
        /// Token from the originating descriptor.
        correlation_token: CorrelationToken,
        /// How the transfer ended.
        outcome: CompletionOutcome,
    },
}

impl DownloadEvent {
    /// Token from the originating descriptor.
    #[must_use]
    pub fn correlation_token(&self) -> &CorrelationToken {
        match self {
            Self::Progress(snapshot) => &snapshot.correlation_token,
            Self::Completed {
                correlation_token, ..
            } => correlation_token,
        }
    }
}

/// Write side of a transfer's event channel.
///
/// Detaching drops the sender, after which every notification is discarded.
/// Completion also drops the sender, so nothing can follow it.
#[derive(Debug, Clone)]
pub(crate) struct EventForwarder {
    sender: Arc<Mutex<Option<mpsc::UnboundedSender<DownloadEvent>>>>,
    correlation_token: CorrelationToken,
}

impl EventForwarder {
    /// Opens a fresh channel for one transfer.
    pub(crate) fn channel(correlation_token: CorrelationToken) -> (Self, TransferEvents) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let forwarder = Self {
            sender: Arc::new(Mutex::new(Some(sender))),
            correlation_token: correlation_token.clone(),
        };
        let events = TransferEvents {
            receiver,
            correlation_token,
        };
        (forwarder, events)
    }

    pub(crate) fn progress(&self, bytes_received: u64, total_bytes: Option<u64>) {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = guard.as_ref() {
            // A dropped receiver just means nobody is listening.
            let _ = sender.send(DownloadEvent::Progress(ProgressSnapshot::new(
                bytes_received,
                total_bytes,
                self.correlation_token.clone(),
            )));
        }
    }

    /// Sends the terminal event. Returns false if the forwarder was already
    /// detached or completed.
    ///
    /// `mark_terminal` runs under the same lock that [`detach`](Self::detach)
    /// takes, so anyone who observes its effect and then detaches still lets
    /// this completion through.
    pub(crate) fn complete(
        &self,
        outcome: CompletionOutcome,
        mark_terminal: impl FnOnce(&CompletionOutcome),
    ) -> bool {
        let mut guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        mark_terminal(&outcome);
        let Some(sender) = guard.take() else {
            return false;
        };
        let _ = sender.send(DownloadEvent::Completed {
            correlation_token: self.correlation_token.clone(),
            outcome,
        });
        true
    }

    pub(crate) fn detach(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    #[cfg(test)]
    pub(crate) fn is_attached(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Progress reporter handed to a [`Transport`](super::Transport).
///
/// Reports are cumulative byte counts. A report lower than the previous one
/// is raised to it, so callers always see non-decreasing progress.
#[derive(Debug)]
pub struct ProgressSink {
    forwarder: EventForwarder,
    last_reported: u64,
}

impl ProgressSink {
    pub(crate) fn new(forwarder: EventForwarder) -> Self {
        Self {
            forwarder,
            last_reported: 0,
        }
    }

    /// Forwards the cumulative byte count without waiting on the reader.
    pub fn report(&mut self, bytes_received: u64, total_bytes: Option<u64>) {
        self.last_reported = self.last_reported.max(bytes_received);
        self.forwarder.progress(self.last_reported, total_bytes);
    }

    /// Highest byte count reported so far.
    #[must_use]
    pub fn bytes_reported(&self) -> u64 {
        self.last_reported
    }
}

/// Read side of a transfer's event channel.
///
/// Yields zero or more [`DownloadEvent::Progress`] followed by exactly one
/// [`DownloadEvent::Completed`], then ends. If the session is re-prepared or
/// disposed mid-transfer the stream ends without a completion.
#[derive(Debug)]
pub struct TransferEvents {
    receiver: mpsc::UnboundedReceiver<DownloadEvent>,
    correlation_token: CorrelationToken,
}

impl TransferEvents {
    /// Token of the transfer these events belong to.
    #[must_use]
    pub fn correlation_token(&self) -> &CorrelationToken {
        &self.correlation_token
    }

    /// Waits for the next event.
    pub async fn next_event(&mut self) -> Option<DownloadEvent> {
        self.receiver.recv().await
    }

    /// Skips progress and waits for the terminal outcome.
    pub async fn outcome(self) -> Option<CompletionOutcome> {
        self.drain().await.1
    }

    /// Collects every progress snapshot and the terminal outcome.
    pub async fn drain(mut self) -> (Vec<ProgressSnapshot>, Option<CompletionOutcome>) {
        let mut snapshots = Vec::new();
        while let Some(event) = self.receiver.recv().await {
            match event {
                DownloadEvent::Progress(snapshot) => snapshots.push(snapshot),
                DownloadEvent::Completed { outcome, .. } => return (snapshots, Some(outcome)),
            }
        }
        (snapshots, None)
    }
}

impl Stream for TransferEvents {
    type Item = DownloadEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn token() -> CorrelationToken {
        CorrelationToken::from("t-1")
    }

    #[test]
    fn test_percentage_absent_without_total() {
        let snapshot = ProgressSnapshot::new(1024, None, token());
        assert_eq!(snapshot.percentage, None);
    }

    #[test]
    fn test_percentage_absent_for_zero_total() {
        let snapshot = ProgressSnapshot::new(0, Some(0), token());
        assert_eq!(snapshot.percentage, None);
    }

    #[test]
    fn test_percentage_rounds_down_and_clamps() {
        assert_eq!(ProgressSnapshot::new(1, Some(3), token()).percentage, Some(33));
        assert_eq!(ProgressSnapshot::new(4096, Some(4096), token()).percentage, Some(100));
        assert_eq!(ProgressSnapshot::new(5000, Some(4096), token()).percentage, Some(100));
        assert_eq!(
            ProgressSnapshot::new(u64::MAX, Some(u64::MAX), token()).percentage,
            Some(100)
        );
    }

    #[test]
    fn test_outcome_from_result() {
        assert!(CompletionOutcome::from_result(Ok(10)).is_succeeded());
        assert!(CompletionOutcome::from_result(Err(TransferError::Canceled)).is_canceled());
        let failed = CompletionOutcome::from_result(Err(TransferError::timeout("https://x.test")));
        assert!(matches!(failed.failure(), Some(TransferError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_completion_closes_channel_and_drops_later_progress() {
        let (forwarder, events) = EventForwarder::channel(token());
        forwarder.progress(1, None);
        assert!(forwarder.complete(CompletionOutcome::Succeeded, |_| {}));
        forwarder.progress(2, None);
        assert!(!forwarder.complete(CompletionOutcome::Canceled, |_| {}));

        let (snapshots, outcome) = events.drain().await;
        assert_eq!(snapshots.len(), 1);
        assert!(outcome.unwrap().is_succeeded());
    }

    #[tokio::test]
    async fn test_detach_silences_forwarder() {
        let (forwarder, events) = EventForwarder::channel(token());
        forwarder.detach();
        assert!(!forwarder.is_attached());
        forwarder.progress(1, None);
        assert!(!forwarder.complete(CompletionOutcome::Succeeded, |_| {}));

        let (snapshots, outcome) = events.drain().await;
        assert!(snapshots.is_empty());
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_sink_keeps_progress_non_decreasing() {
        let (forwarder, mut events) = EventForwarder::channel(token());
        let mut sink = ProgressSink::new(forwarder.clone());
        sink.report(2048, None);
        sink.report(1024, None);
        forwarder.complete(CompletionOutcome::Succeeded, |_| {});

        let received: Vec<u64> = (&mut events)
            .filter_map(|event| async move {
                match event {
                    DownloadEvent::Progress(snapshot) => Some(snapshot.bytes_received),
                    DownloadEvent::Completed { .. } => None,
                }
            })
            .collect()
            .await;
        assert_eq!(received, vec![2048, 2048]);
        assert_eq!(sink.bytes_reported(), 2048);
    }
}
