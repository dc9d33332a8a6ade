//! reqwest-backed [`Transport`]

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::{DOWNLOAD_STALL_TIMEOUT_MS, USER_AGENT};
use crate::fetch::error::FetchError;
use crate::fetch::transport::{Probe, Transport};

/// HTTP transport shared by every mirror of a run
pub struct HttpTransport {
    client: reqwest::Client,
    fetch_timeout: Duration,
    stall_timeout: Duration,
}

impl HttpTransport {
    /// Creates a new HttpTransport with a custom page-fetch timeout
    pub fn new(fetch_timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(fetch_timeout)
            .build()?;
        Ok(Self {
            client,
            fetch_timeout,
            stall_timeout: Duration::from_millis(DOWNLOAD_STALL_TIMEOUT_MS),
        })
    }

    /// Abandon a full download once no data arrived for `stall_timeout`
    pub fn with_stall_timeout(mut self, stall_timeout: Duration) -> Self {
        self.stall_timeout = stall_timeout;
        self
    }

    async fn send(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, FetchError> {
        let mut request = self.client.get(url).headers(header_map(headers)?);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| timeout_or_network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} returned status {}", url, status);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<Vec<u8>, FetchError> {
        debug!("GET {}", url);
        let response = self.send(url, headers, Some(self.fetch_timeout)).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| timeout_or_network(url, e))?;
        Ok(body.to_vec())
    }

    async fn probe(
        &self,
        url: &str,
        headers: &[(String, String)],
        max_bytes: u64,
        timeout: Duration,
    ) -> Result<Probe, FetchError> {
        let deadline = Instant::now() + timeout;
        let mut response = self.send(url, headers, Some(timeout)).await?;

        let start = Instant::now();
        let mut bytes = 0u64;
        while bytes < max_bytes {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let chunk = tokio::time::timeout(remaining, response.chunk())
                .await
                .map_err(|_| FetchError::Timeout(url.to_string()))?
                .map_err(|e| timeout_or_network(url, e))?;
            match chunk {
                Some(chunk) => bytes += chunk.len() as u64,
                None => break,
            }
        }
        let elapsed = start.elapsed();

        debug!("Probed {} bytes of {} in {:?}", bytes, url, elapsed);
        Ok(Probe { bytes, elapsed })
    }

    async fn download(&self, url: &str, headers: &[(String, String)], dest: &Path) -> Result<u64, FetchError> {
        let part_file = part_path(dest);
        debug!("Downloading {} to {:?}", url, part_file);

        let result = stream_to_file(self, url, headers, &part_file).await;
        match result {
            Ok(written) => {
                tokio::fs::rename(&part_file, dest).await?;
                Ok(written)
            }
            Err(e) => {
                warn!("Failed to download {} to {:?}: {}", url, part_file, e);
                let _ = tokio::fs::remove_file(&part_file).await;
                Err(e)
            }
        }
    }
}

/// Stream the body into `part_file`; every wait for data is bounded by the
/// transport's stall timeout, the transfer as a whole is not
async fn stream_to_file(
    transport: &HttpTransport,
    url: &str,
    headers: &[(String, String)],
    part_file: &Path,
) -> Result<u64, FetchError> {
    let stalled = |_| FetchError::Timeout(url.to_string());
    let mut response = tokio::time::timeout(transport.stall_timeout, transport.send(url, headers, None))
        .await
        .map_err(stalled)??;
    let mut file = tokio::fs::File::create(part_file).await?;
    let mut written = 0u64;

    while let Some(chunk) = tokio::time::timeout(transport.stall_timeout, response.chunk())
        .await
        .map_err(stalled)?
        .map_err(|e| timeout_or_network(url, e))?
    {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

/// `<dest>.part`, next to the final file
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let invalid = |reason: String| FetchError::InvalidHeader {
            name: name.clone(),
            reason,
        };
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn timeout_or_network(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Network(error)
    }
}
