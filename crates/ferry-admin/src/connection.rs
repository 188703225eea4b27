//! Store connection identity.

use serde::{Deserialize, Serialize};

use crate::AdminError;

/// Opaque identity of a store: its base URL and an Admin API access token.
///
/// The engine never inspects a connection beyond handing it to the transport.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub url: String,
    pub token: String,
}

impl Connection {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
        }
    }

    /// Reject connections with a blank URL or token.
    pub fn validate(&self) -> Result<(), AdminError> {
        if self.url.trim().is_empty() {
            return Err(AdminError::InvalidConnection("store URL is empty".to_string()));
        }
        if self.token.trim().is_empty() {
            return Err(AdminError::InvalidConnection(format!(
                "access token for {} is empty",
                self.url
            )));
        }
        Ok(())
    }

    /// Base URL with a scheme and without a trailing slash.
    ///
    /// `my-shop.example.com` becomes `https://my-shop.example.com`.
    pub fn base_url(&self) -> String {
        let url = self.url.trim().trim_end_matches('/');
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("https://{}", url)
        }
    }

    /// Whether two connections point at the same store, ignoring scheme and case.
    pub fn same_store(&self, other: &Connection) -> bool {
        fn host(c: &Connection) -> String {
            c.base_url()
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .to_ascii_lowercase()
        }
        host(self) == host(other)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish()
    }
}
