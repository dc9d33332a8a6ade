//! Sources whose download URL is built from the discovered version

use async_trait::async_trait;

use crate::fetch::{FetchSession, Page};
use crate::integrity::{ChecksumAlgorithm, ChecksumRecord};
use crate::mirror::checksum::{
    ChecksumDiscovery, ChecksumListing, discover_checksums, parse_listing, parse_self_describing,
};
use crate::mirror::error::MirrorError;
use crate::mirror::pattern::{FilePattern, VersionRule};
use crate::mirror::signature::SignaturePolicy;
use crate::mirror::source::MirrorSource;
use crate::version::Version;

/// Placeholder replaced by the rendered version in URL templates
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// A page that mentions the version in its text rather than in links
#[derive(Debug, Clone)]
pub struct TemplateSource {
    url: String,
    file_pattern: FilePattern,
    version_rule: VersionRule,
    download_template: String,
    checksum_template: Option<String>,
    checksum_algorithm: Option<ChecksumAlgorithm>,
    headers: Vec<(String, String)>,
    signature: Option<SignaturePolicy>,
}

impl TemplateSource {
    pub fn new(
        url: impl Into<String>,
        file_pattern: FilePattern,
        version_rule: VersionRule,
        download_template: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            file_pattern,
            version_rule,
            download_template: download_template.into(),
            checksum_template: None,
            checksum_algorithm: None,
            headers: Vec::new(),
            signature: None,
        }
    }

    /// Read checksums from a listing at `template`.
    ///
    /// Without an algorithm the listing must declare it itself.
    pub fn with_checksums(mut self, template: impl Into<String>, algorithm: Option<ChecksumAlgorithm>) -> Self {
        self.checksum_template = Some(template.into());
        self.checksum_algorithm = algorithm;
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_signature(mut self, policy: SignaturePolicy) -> Self {
        self.signature = Some(policy);
        self
    }

    fn parse(&self, text: &str, version: &Version) -> Vec<ChecksumRecord> {
        match self.checksum_algorithm {
            Some(algorithm) => parse_listing(text, &self.file_pattern, version)
                .filter(|digest| algorithm.is_valid_digest(digest))
                .map(|digest| vec![ChecksumRecord::new(algorithm, digest)])
                .unwrap_or_default(),
            None => parse_self_describing(text, &self.file_pattern, version),
        }
    }
}

/// Substitute the rendered version into `template`
pub fn render_template(template: &str, version: &Version) -> String {
    template.replace(VERSION_PLACEHOLDER, &version.spelling())
}

#[async_trait]
impl MirrorSource for TemplateSource {
    fn url(&self) -> &str {
        &self.url
    }

    fn file_pattern(&self) -> &FilePattern {
        &self.file_pattern
    }

    fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn signature_policy(&self) -> Option<&SignaturePolicy> {
        self.signature.as_ref()
    }

    fn resolve_version(&self, listing: &Page) -> Result<Version, MirrorError> {
        self.version_rule
            .resolve_in_text(&listing.body)
            .ok_or_else(|| MirrorError::VersionNotFound {
                url: self.url.clone(),
                pattern: self.version_rule.describe(),
            })
    }

    /// The templated listing when configured, otherwise the page itself and
    /// then its links
    async fn resolve_checksums(
        &self,
        listing: &Page,
        version: &Version,
        session: &FetchSession,
    ) -> Result<ChecksumDiscovery, MirrorError> {
        let Some(template) = &self.checksum_template else {
            let records = parse_self_describing(&listing.body, &self.file_pattern, version);
            if !records.is_empty() {
                return Ok(ChecksumDiscovery {
                    records,
                    listing: Some(ChecksumListing {
                        url: listing.url.clone(),
                        body: listing.body.clone().into_bytes(),
                    }),
                });
            }
            return discover_checksums(
                session,
                &self.headers,
                &self.url,
                &listing.links,
                &self.file_pattern,
                version,
            )
            .await;
        };

        let url = render_template(template, version);
        let body = session
            .cached_bytes(&url, &self.headers)
            .await
            .map_err(|e| MirrorError::ChecksumNotFound {
                url: url.clone(),
                errors: vec![e.to_string()],
            })?;
        let records = self.parse(&String::from_utf8_lossy(&body), version);
        if records.is_empty() {
            return Err(MirrorError::ChecksumNotFound {
                url,
                errors: vec![format!("no digest for {}", self.file_pattern.as_str())],
            });
        }

        Ok(ChecksumDiscovery {
            records,
            listing: Some(ChecksumListing {
                url,
                body: body.to_vec(),
            }),
        })
    }

    fn resolve_download_link(&self, _listing: &Page, version: &Version) -> Result<String, MirrorError> {
        Ok(render_template(&self.download_template, version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::transport::MockTransport;
    use mockall::predicate::{always, eq};
    use std::sync::Arc;

    const SHA256: &str = "b4f3c1e2d5a6978877665544332211ffeeddccbbaa99887766554433221100aa";

    fn source() -> TemplateSource {
        TemplateSource::new(
            "https://tool.test/download",
            FilePattern::new(r"tool-.+-amd64\.iso").unwrap(),
            VersionRule::pattern(r"Latest release: (\d+(?:\.\d+)+)").unwrap(),
            "https://dl.tool.test/{version}/tool-{version}-amd64.iso",
        )
    }

    fn page(body: &str) -> Page {
        Page::new("https://tool.test/download", body.to_string())
    }

    #[test]
    fn version_is_found_in_page_text() {
        let listing = page("<p>Latest release: 4.10</p><p>Previous release: 4.9</p><p>Latest release: 4.9</p>");

        let version = source().resolve_version(&listing).unwrap();

        assert_eq!(version.render(), "4.10");
    }

    #[test]
    fn download_link_is_rendered_from_template() {
        let version = Version::new("4.10").unwrap();

        let link = source().resolve_download_link(&page(""), &version).unwrap();

        assert_eq!(link, "https://dl.tool.test/4.10/tool-4.10-amd64.iso");
    }

    #[tokio::test]
    async fn checksum_listing_is_rendered_from_template() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .with(eq("https://dl.tool.test/4.10/SHA256SUMS"), always())
            .times(1)
            .returning(|_, _| Ok(format!("{SHA256}  tool-4.10-amd64.iso\n").into_bytes()));
        let session = FetchSession::new(Arc::new(transport));
        let source = source().with_checksums(
            "https://dl.tool.test/{version}/SHA256SUMS",
            Some(ChecksumAlgorithm::Sha256),
        );

        let discovery = source
            .resolve_checksums(&page(""), &Version::new("4.10").unwrap(), &session)
            .await
            .unwrap();

        assert_eq!(
            discovery.records,
            vec![ChecksumRecord::new(ChecksumAlgorithm::Sha256, SHA256)]
        );
        assert_eq!(
            discovery.listing.unwrap().url,
            "https://dl.tool.test/4.10/SHA256SUMS"
        );
    }

    #[tokio::test]
    async fn sectioned_page_is_its_own_listing() {
        let session = FetchSession::new(Arc::new(MockTransport::new()));
        let body = format!(
            "### MD5SUMS:\n0123456789abcdef0123456789abcdef  tool-4.10-amd64.iso\n### SHA256SUMS:\n{SHA256}  tool-4.10-amd64.iso\n"
        );

        let discovery = source()
            .resolve_checksums(&page(&body), &Version::new("4.10").unwrap(), &session)
            .await
            .unwrap();

        assert_eq!(discovery.records.len(), 2);
        assert_eq!(discovery.records[1].algorithm, ChecksumAlgorithm::Sha256);
    }

    #[tokio::test]
    async fn unreachable_checksum_listing_is_checksum_not_found() {
        let mut transport = MockTransport::new();
        transport.expect_get().returning(|url, _| {
            Err(crate::fetch::FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        });
        let session = FetchSession::new(Arc::new(transport));
        let source = source().with_checksums("https://dl.tool.test/{version}/CHECKSUMS", None);

        let error = source
            .resolve_checksums(&page(""), &Version::new("4.10").unwrap(), &session)
            .await
            .unwrap_err();

        assert!(matches!(error, MirrorError::ChecksumNotFound { .. }));
    }
}
