//! A mirror and the state it resolves

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::fetch::FetchSession;
use crate::integrity::{ChecksumRecord, IntegrityFailure, verify_checksums, verify_signature};
use crate::mirror::error::MirrorError;
use crate::mirror::signature::{SignatureMaterial, SignatureTarget};
use crate::mirror::source::MirrorSource;
use crate::mirror::speed::{Speed, measure_speed};
use crate::version::Version;

/// Everything a successful [`Mirror::initialize`] learned
#[derive(Debug, Clone)]
pub struct Resolution {
    pub version: Version,
    pub checksums: Vec<ChecksumRecord>,
    pub download_link: String,
    pub speed: Speed,
    pub signature: Option<SignatureMaterial>,
    /// Raw listing the checksums were read from
    pub checksum_listing: Option<Vec<u8>>,
}

/// One source of an artifact, resolved at most once per run
pub struct Mirror {
    source: Box<dyn MirrorSource>,
    resolution: Option<Resolution>,
}

impl Mirror {
    pub fn new(source: impl MirrorSource + 'static) -> Self {
        Self::from_boxed(Box::new(source))
    }

    pub fn from_boxed(source: Box<dyn MirrorSource>) -> Self {
        Self {
            source,
            resolution: None,
        }
    }

    pub fn url(&self) -> &str {
        self.source.url()
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    pub fn version(&self) -> Option<&Version> {
        self.resolution.as_ref().map(|r| &r.version)
    }

    pub fn checksums(&self) -> &[ChecksumRecord] {
        self.resolution
            .as_ref()
            .map(|r| r.checksums.as_slice())
            .unwrap_or_default()
    }

    pub fn download_link(&self) -> Option<&str> {
        self.resolution.as_ref().map(|r| r.download_link.as_str())
    }

    pub fn speed(&self) -> Option<Speed> {
        self.resolution.as_ref().map(|r| r.speed)
    }

    /// Discover version, checksums, download link and speed.
    ///
    /// On error the mirror stays uninitialized.
    pub async fn initialize(&mut self, session: &FetchSession) -> Result<(), MirrorError> {
        let source = self.source.as_ref();
        let listing = source.load(session).await?;
        debug!("{}: {} link(s)", source.url(), listing.links.len());

        let version = source.resolve_version(&listing)?;
        debug!("{}: version {}", source.url(), version);

        let checksums = source.resolve_checksums(&listing, &version, session).await?;
        if checksums.is_empty() {
            return Err(MirrorError::ChecksumNotFound {
                url: source.url().to_string(),
                errors: Vec::new(),
            });
        }
        debug!("{}: {} checksum(s)", source.url(), checksums.records.len());

        let download_link = source.resolve_download_link(&listing, &version)?;
        debug!("{}: download link {}", source.url(), download_link);

        let signature = source
            .resolve_signature(&listing, &version, &checksums, session)
            .await?;

        let speed = measure_speed(session, &download_link, source.headers())
            .await
            .map_err(|e| MirrorError::source_unavailable(&download_link, e))?;
        debug!("{}: speed {}", source.url(), speed);

        self.resolution = Some(Resolution {
            version,
            checksums: checksums.records,
            download_link,
            speed,
            signature,
            checksum_listing: checksums.listing.map(|listing| listing.body),
        });
        Ok(())
    }

    /// Download to `target` and verify it.
    ///
    /// A file that fails verification is deleted before the error is returned.
    pub async fn download_and_verify(&self, target: &Path, session: &FetchSession) -> Result<(), MirrorError> {
        let resolution = self
            .resolution
            .as_ref()
            .ok_or_else(|| MirrorError::NotInitialized(self.url().to_string()))?;

        session
            .download(&resolution.download_link, self.source.headers(), target)
            .await
            .map_err(MirrorError::Download)?;

        if let Err(failure) = verify(resolution, target.to_path_buf()).await {
            warn!("{}: {}", resolution.download_link, failure);
            if let Err(e) = tokio::fs::remove_file(target).await {
                warn!("Failed to remove {}: {}", target.display(), e);
            }
            return Err(MirrorError::IntegrityCheck(failure));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Mirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mirror")
            .field("url", &self.url())
            .field("resolution", &self.resolution)
            .finish()
    }
}

async fn verify(resolution: &Resolution, target: PathBuf) -> Result<(), IntegrityFailure> {
    let records = resolution.checksums.clone();
    let path = target.clone();
    tokio::task::spawn_blocking(move || verify_checksums(&path, &records))
        .await
        .map_err(|e| IntegrityFailure::Io(std::io::Error::other(e)))??;

    let Some(material) = resolution.signature.clone() else {
        return Ok(());
    };
    let data = match material.target {
        SignatureTarget::Artifact => tokio::fs::read(&target).await?,
        SignatureTarget::ChecksumListing => resolution
            .checksum_listing
            .clone()
            .ok_or(IntegrityFailure::MissingSignedListing)?,
    };
    let target_name = match material.target {
        SignatureTarget::Artifact => target.display().to_string(),
        SignatureTarget::ChecksumListing => "checksum listing".to_string(),
    };

    let valid = tokio::task::spawn_blocking(move || {
        verify_signature(&data, &material.signature, &material.public_key)
    })
    .await
    .map_err(|e| IntegrityFailure::Io(std::io::Error::other(e)))??;

    if valid {
        Ok(())
    } else {
        Err(IntegrityFailure::SignatureMismatch { target: target_name })
    }
}
