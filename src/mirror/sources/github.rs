//! GitHub Releases API source

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::fetch::{FetchSession, Page};
use crate::mirror::checksum::{ChecksumDiscovery, discover_checksums, parse_annotated_lines};
use crate::mirror::error::MirrorError;
use crate::mirror::pattern::{FilePattern, VersionRule};
use crate::mirror::signature::SignaturePolicy;
use crate::mirror::source::MirrorSource;
use crate::version::Version;

/// Default base URL for GitHub API
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Response from GitHub Releases API
#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: String,
    browser_download_url: String,
}

/// Which release field carries the version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionField {
    #[default]
    Tag,
    Name,
    FileName,
}

/// Releases of one GitHub repository
#[derive(Debug, Clone)]
pub struct GitHubReleaseSource {
    url: String,
    file_pattern: FilePattern,
    version_rule: VersionRule,
    version_field: VersionField,
    include_prereleases: bool,
    exclude: Option<String>,
    headers: Vec<(String, String)>,
    signature: Option<SignaturePolicy>,
}

impl GitHubReleaseSource {
    /// Releases of `repository` (`owner/name`) from the public API
    pub fn new(repository: &str, file_pattern: FilePattern, version_rule: VersionRule) -> Self {
        Self::with_api_url(DEFAULT_API_URL, repository, file_pattern, version_rule)
    }

    pub fn with_api_url(
        api_url: &str,
        repository: &str,
        file_pattern: FilePattern,
        version_rule: VersionRule,
    ) -> Self {
        Self {
            url: format!("{}/repos/{}/releases", api_url.trim_end_matches('/'), repository),
            file_pattern,
            version_rule,
            version_field: VersionField::default(),
            include_prereleases: false,
            exclude: None,
            headers: vec![(
                "Accept".to_string(),
                "application/vnd.github+json".to_string(),
            )],
            signature: None,
        }
    }

    pub fn version_field(mut self, field: VersionField) -> Self {
        self.version_field = field;
        self
    }

    pub fn include_prereleases(mut self, include: bool) -> Self {
        self.include_prereleases = include;
        self
    }

    /// Skip releases whose tag contains `needle`
    pub fn exclude(mut self, needle: impl Into<String>) -> Self {
        self.exclude = Some(needle.into());
        self
    }

    /// Extra headers, e.g. `Authorization` for a higher rate limit
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_signature(mut self, policy: SignaturePolicy) -> Self {
        self.signature = Some(policy);
        self
    }

    fn releases(&self, listing: &Page) -> Result<Vec<Release>, MirrorError> {
        let releases: Vec<Release> = serde_json::from_str(&listing.body).map_err(|e| {
            warn!("Failed to parse GitHub releases response: {}", e);
            MirrorError::InvalidResponse {
                url: self.url.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(releases
            .into_iter()
            .filter(|release| self.include_prereleases || !release.prerelease)
            .filter(|release| {
                self.exclude
                    .as_deref()
                    .is_none_or(|needle| !release.tag_name.contains(needle))
            })
            .collect())
    }

    fn release_version(&self, release: &Release) -> Option<Version> {
        match self.version_field {
            VersionField::Tag => self.version_rule.resolve([release.tag_name.as_str()]),
            VersionField::Name => self.version_rule.resolve(release.name.as_deref()),
            VersionField::FileName => self.version_rule.resolve(
                release
                    .assets
                    .iter()
                    .map(|asset| asset.name.as_str())
                    .filter(|name| self.file_pattern.is_match(name)),
            ),
        }
    }

    /// The release that produced `version`
    fn release_for(&self, listing: &Page, version: &Version) -> Result<Release, MirrorError> {
        self.releases(listing)?
            .into_iter()
            .find(|release| self.release_version(release).as_ref() == Some(version))
            .ok_or_else(|| MirrorError::DownloadLinkNotFound {
                url: self.url.clone(),
                version: version.spelling(),
            })
    }
}

#[async_trait]
impl MirrorSource for GitHubReleaseSource {
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

    /// Fetch the releases and expose every asset URL as a link
    async fn load(&self, session: &FetchSession) -> Result<Page, MirrorError> {
        let body = session
            .text(&self.url, &self.headers)
            .await
            .map_err(|e| MirrorError::source_unavailable(&self.url, e))?;
        let mut listing = Page {
            url: self.url.clone(),
            body,
            links: Vec::new(),
        };
        listing.links = self
            .releases(&listing)?
            .into_iter()
            .flat_map(|release| release.assets)
            .map(|asset| asset.browser_download_url)
            .collect();
        Ok(listing)
    }

    fn resolve_version(&self, listing: &Page) -> Result<Version, MirrorError> {
        self.releases(listing)?
            .iter()
            .filter_map(|release| self.release_version(release))
            .max()
            .ok_or_else(|| MirrorError::VersionNotFound {
                url: self.url.clone(),
                pattern: self.version_rule.describe(),
            })
    }

    /// Assets of the chosen release first, then checksum lines in its notes
    async fn resolve_checksums(
        &self,
        listing: &Page,
        version: &Version,
        session: &FetchSession,
    ) -> Result<ChecksumDiscovery, MirrorError> {
        let release = self.release_for(listing, version)?;
        let assets: Vec<String> = release
            .assets
            .iter()
            .map(|asset| asset.browser_download_url.clone())
            .collect();

        let error = match discover_checksums(
            session,
            &self.headers,
            &self.url,
            &assets,
            &self.file_pattern,
            version,
        )
        .await
        {
            Ok(discovery) => return Ok(discovery),
            Err(error) => error,
        };

        let records = release
            .body
            .as_deref()
            .map(|body| parse_annotated_lines(body, &self.file_pattern))
            .unwrap_or_default();
        if records.is_empty() {
            return Err(error);
        }
        debug!("{}: checksums from release notes of {}", self.url, release.tag_name);
        Ok(ChecksumDiscovery {
            records,
            listing: None,
        })
    }

    /// Asset of the chosen release, preferring one that names the version
    fn resolve_download_link(&self, listing: &Page, version: &Version) -> Result<String, MirrorError> {
        let release = self.release_for(listing, version)?;
        let candidates: Vec<&Asset> = release
            .assets
            .iter()
            .filter(|asset| self.file_pattern.matches_end(&asset.name))
            .collect();

        candidates
            .iter()
            .find(|asset| version.appears_in(&asset.name))
            .or_else(|| candidates.first())
            .map(|asset| asset.browser_download_url.clone())
            .ok_or(MirrorError::DownloadLinkNotFound {
                url: self.url.clone(),
                version: version.spelling(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::HttpTransport;
    use crate::integrity::{ChecksumAlgorithm, ChecksumRecord};
    use mockito::Server;
    use rstest::rstest;
    use std::sync::Arc;
    use std::time::Duration;

    const SHA1: &str = "0123456789abcdef0123456789abcdef01234567";

    fn releases_json(base: &str) -> String {
        format!(
            r#"[
                {{"tag_name": "v2.6.0-rc1", "name": "Rescue 2.6 RC", "prerelease": true,
                  "assets": [{{"name": "rescue-2.6.0-rc1-64bit.iso", "browser_download_url": "{base}/dl/rescue-2.6.0-rc1-64bit.iso"}}]}},
                {{"tag_name": "v2.5.1", "name": "Rescue 2.5.1", "prerelease": false,
                  "body": "sha1 {SHA1} rescue-2.5.1-64bit.iso",
                  "assets": [{{"name": "rescue-2.5.1-64bit.iso", "browser_download_url": "{base}/dl/rescue-2.5.1-64bit.iso"}}]}},
                {{"tag_name": "v2.5.0-legacy", "name": "Rescue 2.5 legacy", "prerelease": false,
                  "assets": [{{"name": "rescue-2.5.0-32bit.iso", "browser_download_url": "{base}/dl/rescue-2.5.0-32bit.iso"}}]}},
                {{"tag_name": "v2.4.2", "name": "Rescue 2.4.2", "prerelease": false,
                  "assets": [{{"name": "rescue-2.4.2-64bit.iso", "browser_download_url": "{base}/dl/rescue-2.4.2-64bit.iso"}},
                             {{"name": "SHA256SUMS", "browser_download_url": "{base}/dl/SHA256SUMS"}}]}}
            ]"#
        )
    }

    fn source(api_url: &str) -> GitHubReleaseSource {
        GitHubReleaseSource::with_api_url(
            api_url,
            "rescue/rescue",
            FilePattern::new(r"rescue-.+-64bit\.iso").unwrap(),
            VersionRule::pattern(r"v?(\d+(?:\.\d+)+)").unwrap(),
        )
    }

    fn page(body: String) -> Page {
        Page {
            url: "https://api.test/repos/rescue/rescue/releases".to_string(),
            body,
            links: Vec::new(),
        }
    }

    fn session() -> FetchSession {
        FetchSession::new(Arc::new(HttpTransport::new(Duration::from_secs(5)).unwrap()))
    }

    #[rstest]
    #[case::tag(VersionField::Tag, false, "2.5.1")]
    #[case::name(VersionField::Name, false, "2.5.1")]
    #[case::file_name(VersionField::FileName, false, "2.5.1")]
    #[case::prerelease(VersionField::Tag, true, "2.6.0")]
    fn resolve_version_reads_configured_field(
        #[case] field: VersionField,
        #[case] prereleases: bool,
        #[case] expected: &str,
    ) {
        let source = source("https://api.test")
            .version_field(field)
            .include_prereleases(prereleases);

        let version = source
            .resolve_version(&page(releases_json("https://dl.test")))
            .unwrap();

        assert_eq!(version.render(), expected);
    }

    #[test]
    fn exclude_drops_matching_tags() {
        let source = source("https://api.test").exclude("2.5");

        let version = source
            .resolve_version(&page(releases_json("https://dl.test")))
            .unwrap();

        assert_eq!(version.render(), "2.4.2");
    }

    #[test]
    fn invalid_json_is_invalid_response() {
        let error = source("https://api.test")
            .resolve_version(&page("not json".to_string()))
            .unwrap_err();

        assert!(matches!(error, MirrorError::InvalidResponse { .. }));
    }

    #[test]
    fn download_link_comes_from_selected_release() {
        let source = source("https://api.test");
        let version = Version::new("2.5.1").unwrap();

        let link = source
            .resolve_download_link(&page(releases_json("https://dl.test")), &version)
            .unwrap();

        assert_eq!(link, "https://dl.test/dl/rescue-2.5.1-64bit.iso");
    }

    #[tokio::test]
    async fn load_fetches_releases_with_api_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/rescue/rescue/releases")
            .match_header("accept", "application/vnd.github+json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(releases_json("https://dl.test"))
            .create_async()
            .await;

        let listing = source(&server.url()).load(&session()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(listing.links.len(), 4);
        assert!(listing.links.contains(&"https://dl.test/dl/SHA256SUMS".to_string()));
    }

    #[tokio::test]
    async fn load_reports_missing_repository() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/rescue/rescue/releases")
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        let error = source(&server.url()).load(&session()).await.unwrap_err();

        assert!(matches!(error, MirrorError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn checksums_fall_back_to_release_notes() {
        let source = source("https://api.test");
        let version = Version::new("2.5.1").unwrap();

        let discovery = source
            .resolve_checksums(&page(releases_json("https://dl.test")), &version, &session())
            .await
            .unwrap();

        assert_eq!(
            discovery.records,
            vec![ChecksumRecord::new(ChecksumAlgorithm::Sha1, SHA1)]
        );
        assert!(discovery.listing.is_none());
    }

    #[tokio::test]
    async fn checksums_prefer_release_assets() {
        let mut server = Server::new_async().await;
        let digest = "a".repeat(64);
        server
            .mock("GET", "/dl/SHA256SUMS")
            .with_status(200)
            .with_body(format!("{digest}  rescue-2.4.2-64bit.iso\n"))
            .create_async()
            .await;
        let source = source("https://api.test");
        let version = Version::new("2.4.2").unwrap();

        let discovery = source
            .resolve_checksums(&page(releases_json(&server.url())), &version, &session())
            .await
            .unwrap();

        assert_eq!(
            discovery.records,
            vec![ChecksumRecord::new(ChecksumAlgorithm::Sha256, digest)]
        );
    }
}
