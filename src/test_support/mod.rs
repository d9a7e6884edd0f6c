//! Helpers shared by in-crate tests. The sources live with the integration
//! test support so there is one copy of each.

#[path = "../../tests/support/socket_guard.rs"]
pub(crate) mod socket_guard;

#[path = "../../tests/support/raw_http.rs"]
pub(crate) mod raw_http;
