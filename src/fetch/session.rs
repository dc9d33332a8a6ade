//! Run-scoped fetch context
//!
//! A [`FetchSession`] bundles the transport, a page cache that lives only as
//! long as the session, and the cancellation token of the run. Every network
//! call made by a mirror goes through it.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::fetch::error::FetchError;
use crate::fetch::links::extract_links;
use crate::fetch::transport::{Probe, Transport};

/// A fetched page with its resolved hyperlinks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub body: String,
    pub links: Vec<String>,
}

impl Page {
    pub fn new(url: &str, body: String) -> Self {
        let links = extract_links(&body, url);
        Self {
            url: url.to_string(),
            body,
            links,
        }
    }
}

/// Response bodies keyed by URL, scoped to one session
#[derive(Debug, Default)]
pub struct PageCache {
    entries: Mutex<HashMap<String, Arc<[u8]>>>,
}

impl PageCache {
    pub fn get(&self, url: &str) -> Option<Arc<[u8]>> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(url).cloned())
    }

    pub fn insert(&self, url: &str, body: Arc<[u8]>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(url.to_string(), body);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Transport, cache and cancellation for one resolution run
#[derive(Clone)]
pub struct FetchSession {
    transport: Arc<dyn Transport>,
    cache: Arc<PageCache>,
    cancellation: CancellationToken,
}

impl FetchSession {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_cancellation(transport, CancellationToken::new())
    }

    pub fn with_cancellation(transport: Arc<dyn Transport>, cancellation: CancellationToken) -> Self {
        Self {
            transport,
            cache: Arc::new(PageCache::default()),
            cancellation,
        }
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    /// Fetch `url` as a page, using the cache when possible
    pub async fn page(&self, url: &str, headers: &[(String, String)]) -> Result<Page, FetchError> {
        let body = self.cached_bytes(url, headers).await?;
        Ok(Page::new(url, String::from_utf8_lossy(&body).into_owned()))
    }

    /// Fetch `url` as text, using the cache when possible
    pub async fn text(&self, url: &str, headers: &[(String, String)]) -> Result<String, FetchError> {
        let body = self.cached_bytes(url, headers).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Fetch raw bytes, using the cache when possible
    pub async fn cached_bytes(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<Arc<[u8]>, FetchError> {
        if let Some(body) = self.cache.get(url) {
            debug!("Cache hit for {}", url);
            return Ok(body);
        }

        let body: Arc<[u8]> = self
            .cancellable(self.transport.get(url, headers))
            .await?
            .into();
        self.cache.insert(url, body.clone());
        Ok(body)
    }

    /// Fetch raw bytes, bypassing the cache
    pub async fn bytes(&self, url: &str, headers: &[(String, String)]) -> Result<Vec<u8>, FetchError> {
        self.cancellable(self.transport.get(url, headers)).await
    }

    /// Bounded partial download used to rank mirrors
    pub async fn probe(
        &self,
        url: &str,
        headers: &[(String, String)],
        max_bytes: u64,
        timeout: Duration,
    ) -> Result<Probe, FetchError> {
        self.cancellable(self.transport.probe(url, headers, max_bytes, timeout))
            .await
    }

    /// Full download to `dest`; cancellation removes any partial output
    pub async fn download(
        &self,
        url: &str,
        headers: &[(String, String)],
        dest: &Path,
    ) -> Result<u64, FetchError> {
        let result = self.cancellable(self.transport.download(url, headers, dest)).await;
        if matches!(result, Err(FetchError::Cancelled)) {
            let _ = tokio::fs::remove_file(crate::fetch::http::part_path(dest)).await;
            let _ = tokio::fs::remove_file(dest).await;
        }
        result
    }

    async fn cancellable<T>(
        &self,
        future: impl Future<Output = Result<T, FetchError>>,
    ) -> Result<T, FetchError> {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(FetchError::Cancelled),
            result = future => result,
        }
    }
}
