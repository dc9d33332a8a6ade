//! Transport trait for reaching mirrors

use std::path::Path;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use crate::fetch::error::FetchError;

/// Outcome of a bounded partial download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    /// Bytes received before the probe stopped
    pub bytes: u64,
    /// Time between the response headers and the last probed chunk
    pub elapsed: Duration,
}

/// Network capability consumed by mirrors
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Fetch a full response body
    ///
    /// # Arguments
    /// * `url` - Absolute URL to fetch
    /// * `headers` - Extra request headers (name, value)
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<Vec<u8>, FetchError>;

    /// Stream at most `max_bytes` of `url`, giving up after `timeout`
    async fn probe(
        &self,
        url: &str,
        headers: &[(String, String)],
        max_bytes: u64,
        timeout: Duration,
    ) -> Result<Probe, FetchError>;

    /// Stream `url` to `dest`, returning the number of bytes written.
    ///
    /// Implementations must not leave a partial file at `dest` on error, and
    /// must give up on a transfer that stops sending data.
    async fn download(&self, url: &str, headers: &[(String, String)], dest: &Path) -> Result<u64, FetchError>;
}
