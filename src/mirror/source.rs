//! The resolution strategy every kind of mirror implements

use async_trait::async_trait;

use crate::fetch::{FetchSession, Page};
use crate::mirror::checksum::{ChecksumDiscovery, discover_checksums};
use crate::mirror::error::MirrorError;
use crate::mirror::pattern::FilePattern;
use crate::mirror::signature::{SignatureMaterial, SignaturePolicy, discover_signature};
use crate::version::Version;

/// A place an artifact can be resolved from.
///
/// Only `url`, `file_pattern` and `resolve_version` are required. The
/// remaining steps default to the generic link-based discovery used by plain
/// download pages.
#[async_trait]
pub trait MirrorSource: Send + Sync {
    /// Page or API endpoint describing the source
    fn url(&self) -> &str;

    /// Pattern identifying the artifact among the source's links
    fn file_pattern(&self) -> &FilePattern;

    /// Extra request headers sent with every fetch
    fn headers(&self) -> &[(String, String)] {
        &[]
    }

    /// Signature requirements; `None` means the source is not signed
    fn signature_policy(&self) -> Option<&SignaturePolicy> {
        None
    }

    /// Fetch the source and collect its candidate links
    async fn load(&self, session: &FetchSession) -> Result<Page, MirrorError> {
        session
            .page(self.url(), self.headers())
            .await
            .map_err(|e| MirrorError::source_unavailable(self.url(), e))
    }

    fn resolve_version(&self, listing: &Page) -> Result<Version, MirrorError>;

    async fn resolve_checksums(
        &self,
        listing: &Page,
        version: &Version,
        session: &FetchSession,
    ) -> Result<ChecksumDiscovery, MirrorError> {
        discover_checksums(
            session,
            self.headers(),
            self.url(),
            &listing.links,
            self.file_pattern(),
            version,
        )
        .await
    }

    /// Link whose tail matches the file pattern and that names the version
    fn resolve_download_link(&self, listing: &Page, version: &Version) -> Result<String, MirrorError> {
        listing
            .links
            .iter()
            .find(|link| self.file_pattern().matches_end(link) && version.appears_in(link))
            .cloned()
            .ok_or_else(|| MirrorError::DownloadLinkNotFound {
                url: self.url().to_string(),
                version: version.spelling(),
            })
    }

    async fn resolve_signature(
        &self,
        listing: &Page,
        version: &Version,
        checksums: &ChecksumDiscovery,
        session: &FetchSession,
    ) -> Result<Option<SignatureMaterial>, MirrorError> {
        let Some(policy) = self.signature_policy() else {
            return Ok(None);
        };
        discover_signature(
            session,
            self.headers(),
            listing,
            self.file_pattern(),
            version,
            checksums,
            policy,
        )
        .await
        .map(Some)
    }
}
