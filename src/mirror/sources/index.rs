//! Directory listings and plain download pages

use async_trait::async_trait;

use crate::fetch::Page;
use crate::mirror::error::MirrorError;
use crate::mirror::pattern::{FilePattern, VersionRule};
use crate::mirror::signature::SignaturePolicy;
use crate::mirror::source::MirrorSource;
use crate::version::Version;

/// A page whose hyperlinks include the artifact and its checksum files
#[derive(Debug, Clone)]
pub struct IndexSource {
    url: String,
    file_pattern: FilePattern,
    version_rule: VersionRule,
    headers: Vec<(String, String)>,
    signature: Option<SignaturePolicy>,
}

impl IndexSource {
    pub fn new(url: impl Into<String>, file_pattern: FilePattern, version_rule: VersionRule) -> Self {
        Self {
            url: url.into(),
            file_pattern,
            version_rule,
            headers: Vec::new(),
            signature: None,
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_signature(mut self, policy: SignaturePolicy) -> Self {
        self.signature = Some(policy);
        self
    }
}

#[async_trait]
impl MirrorSource for IndexSource {
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
        let candidates = listing
            .links
            .iter()
            .filter(|link| self.file_pattern.is_match(link))
            .map(String::as_str);

        self.version_rule
            .resolve(candidates)
            .ok_or_else(|| MirrorError::VersionNotFound {
                url: self.url.clone(),
                pattern: self.version_rule.describe(),
            })
    }
}
