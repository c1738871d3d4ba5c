//! Limits shared by every HTTP client in the workspace.

/// User-Agent string for listing and document requests.
pub const USER_AGENT: &str = concat!("abstractkb/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
pub const MAX_REDIRECTS: usize = 5;

/// Maximum response body we accept (10 MB).
pub const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;
