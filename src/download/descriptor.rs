//! Download descriptors: what to fetch, where to put it, and who asked.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

/// Opaque caller-supplied value echoed back in every notification.
///
/// Lets callers tell logical requests apart even though a session only runs
/// one physical transfer at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    /// Creates a token from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CorrelationToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for CorrelationToken {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// Immutable description of a single transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadDescriptor {
    source: Url,
    destination: PathBuf,
    correlation_token: CorrelationToken,
}

impl DownloadDescriptor {
    /// Creates a descriptor for fetching `source` into `destination`.
    pub fn new(
        source: Url,
        destination: impl Into<PathBuf>,
        correlation_token: impl Into<CorrelationToken>,
    ) -> Self {
        Self {
            source,
            destination: destination.into(),
            correlation_token: correlation_token.into(),
        }
    }

    /// Absolute location of the package.
    #[must_use]
    pub fn source(&self) -> &Url {
        &self.source
    }

    /// Local path the bytes are written to.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Token echoed back in every notification for this transfer.
    #[must_use]
    pub fn correlation_token(&self) -> &CorrelationToken {
        &self.correlation_token
    }
}
