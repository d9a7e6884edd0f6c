//! Update Downloader Library
//!
//! This library provides the download core of an update client: a
//! single-flight, cancelable download session that fetches a remote package
//! and reports progress, plus a preflight resolver that discovers the file
//! name a package will be saved under.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Session configuration (timeouts, user agent, proxy)
//! - [`download`] - Download session, transport binding, events, resolver

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::{ConfigError, SessionConfig};
pub use download::{
    BindingId, CompletionOutcome, Connector, CorrelationToken, DestinationResolver,
    DownloadDescriptor, DownloadEvent, DownloadSession, HttpConnector, ProgressSink,
    ProgressSnapshot, ResolvedDestination, SessionError, SessionState, TransferError,
    TransferEvents, TransferRequest, Transport, file_name_from_url,
};
