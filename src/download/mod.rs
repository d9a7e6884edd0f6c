//! Single-flight, cancelable package downloads.
//!
//! This module provides the download session an update client drives to fetch
//! one remote package at a time, along with the preflight resolver that
//! reports the file name a package will be saved under.
//!
//! # Features
//!
//! - One transfer in flight per session, enforced at `start`
//! - A fresh transport binding for every transfer
//! - Progress and exactly one completion per transfer, tagged with the
//!   caller's correlation token
//! - Cooperative cancellation that never blocks
//! - Configurable timeouts (30s connect, 5min idle read by default)
//!
//! # Example
//!
//! ```no_run
//! use update_downloader::{DownloadDescriptor, DownloadSession};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = DownloadSession::default();
//! let source = Url::parse("https://updates.example.com/app-2.0.zip")?;
//! let events = session.start(DownloadDescriptor::new(source, "./app-2.0.zip", "v2.0"))?;
//! let outcome = events.outcome().await;
//! println!("finished: {outcome:?}");
//! # Ok(())
//! # }
//! ```

mod binding;
pub(crate) mod constants;
mod descriptor;
mod error;
mod events;
mod http;
mod resolver;
mod session;
mod transport;

pub use binding::{BindingId, SessionState};
pub use descriptor::{CorrelationToken, DownloadDescriptor};
pub use error::{SessionError, TransferError};
pub use events::{CompletionOutcome, DownloadEvent, ProgressSink, ProgressSnapshot, TransferEvents};
pub use http::HttpConnector;
pub use resolver::{DestinationResolver, ResolvedDestination, file_name_from_url};
pub use session::DownloadSession;
pub use transport::{Connector, TransferRequest, Transport};
