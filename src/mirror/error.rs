use thiserror::Error;

use crate::fetch::FetchError;
use crate::integrity::IntegrityFailure;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Source {url} is unavailable: {source}")]
    SourceUnavailable {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("No version found on {url} using pattern '{pattern}'")]
    VersionNotFound { url: String, pattern: String },

    #[error("No checksum found on {url}{}", render_errors(.errors))]
    ChecksumNotFound { url: String, errors: Vec<String> },

    #[error("Download link not found on {url} for version {version}")]
    DownloadLinkNotFound { url: String, version: String },

    #[error("Signature not found on {url}: {reason}")]
    SignatureNotFound { url: String, reason: String },

    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("Integrity check failed: {0}")]
    IntegrityCheck(#[from] IntegrityFailure),

    #[error("Download failed: {0}")]
    Download(#[source] FetchError),

    #[error("Version {found} is older than the latest version {latest}")]
    StaleVersion { found: String, latest: String },

    #[error("Operation '{0}' reported failure")]
    Rejected(String),

    #[error("Mirror {0} has not been initialized")]
    NotInitialized(String),
}

impl MirrorError {
    pub fn source_unavailable(url: &str, source: FetchError) -> Self {
        MirrorError::SourceUnavailable {
            url: url.to_string(),
            source,
        }
    }
}

fn render_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        String::new()
    } else {
        format!(" (errors: {})", errors.join("; "))
    }
}
