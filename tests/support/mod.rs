//! Shared helpers for integration tests.

pub mod raw_http;
pub mod socket_guard;
