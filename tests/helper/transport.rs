//! In-memory transport for mirror tests

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use isofetch::fetch::{FetchError, Probe, Transport};
use isofetch::integrity::{ChecksumAlgorithm, digest_reader};

#[derive(Clone)]
struct Route {
    body: Vec<u8>,
    probe_elapsed: Duration,
}

/// Serves fixed bodies by URL; unknown URLs answer 404
#[derive(Default)]
pub struct FakeTransport {
    routes: HashMap<String, Route>,
    downloads: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`
    pub fn route(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.routes.insert(
            url.to_string(),
            Route {
                body: body.into(),
                probe_elapsed: Duration::from_millis(1),
            },
        );
        self
    }

    /// Serve a file whose speed probe takes `probe_elapsed`
    pub fn file(mut self, url: &str, body: impl Into<Vec<u8>>, probe_elapsed: Duration) -> Self {
        self.routes.insert(
            url.to_string(),
            Route {
                body: body.into(),
                probe_elapsed,
            },
        );
        self
    }

    /// URLs passed to `download`, in call order
    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    fn lookup(&self, url: &str) -> Result<&Route, FetchError> {
        self.routes.get(url).ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &str, _headers: &[(String, String)]) -> Result<Vec<u8>, FetchError> {
        Ok(self.lookup(url)?.body.clone())
    }

    async fn probe(
        &self,
        url: &str,
        _headers: &[(String, String)],
        max_bytes: u64,
        _timeout: Duration,
    ) -> Result<Probe, FetchError> {
        let route = self.lookup(url)?;
        Ok(Probe {
            bytes: (route.body.len() as u64).min(max_bytes),
            elapsed: route.probe_elapsed,
        })
    }

    async fn download(&self, url: &str, _headers: &[(String, String)], dest: &Path) -> Result<u64, FetchError> {
        self.downloads.lock().unwrap().push(url.to_string());
        let route = self.lookup(url)?;
        tokio::fs::write(dest, &route.body).await?;
        Ok(route.body.len() as u64)
    }
}

/// Lowercase SHA-256 of `data`
pub fn sha256(data: &[u8]) -> String {
    digest_reader(data, ChecksumAlgorithm::Sha256).unwrap()
}
