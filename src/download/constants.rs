//! Constants for the download module (timeouts).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle read timeout during a transfer (5 minutes).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Fixed bound on a preflight destination resolution (30 seconds).
pub const RESOLVE_TIMEOUT_SECS: u64 = 30;
