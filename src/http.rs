//! Shared HTTP client construction.
//!
//! Every network-touching component takes an optional caller-supplied
//! [`reqwest::Client`]; when none is given, it falls back to this one, which
//! carries the crate's identification in its `User-Agent`. The header is
//! baked in at construction - a caller-supplied client keeps whatever
//! identification the caller configured, nothing is overridden per request.

use std::time::Duration;

/// `binsource/{version}` identification sent with every request made by a
/// default client.
pub(crate) const USER_AGENT: &str = concat!("binsource/", env!("CARGO_PKG_VERSION"));

/// Build the crate's default HTTP client.
pub(crate) fn new_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(30))
        .build()
        // Construction only fails when the TLS backend cannot initialize.
        .expect("failed to construct HTTP client")
}
