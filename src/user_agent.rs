//! Shared User-Agent string for transfer and resolver HTTP clients.

/// Product token sent ahead of the crate version.
const PRODUCT: &str = "update-downloader";

/// Default User-Agent for update traffic (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (update-client)")
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_contains_crate_version() {
        let ua = default_user_agent();
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("update-downloader/")
                .and_then(|s| s.split(' ').next())
                .expect("UA has version"),
            "UA must contain crate version"
        );
    }

    #[test]
    fn test_user_agent_identifies_update_client() {
        let ua = default_user_agent();
        assert!(ua.contains("update-client"), "UA must identify role: {ua}");
    }
}
