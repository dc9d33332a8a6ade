//! Signature discovery
//!
//! Locates the detached signature and the public key a source publishes for
//! its artifact or for its checksum listing.

use serde::Deserialize;
use tracing::debug;

use crate::fetch::{FetchSession, Page};
use crate::fetch::links::file_name;
use crate::integrity::is_cleartext_signed;
use crate::mirror::checksum::ChecksumDiscovery;
use crate::mirror::error::MirrorError;
use crate::mirror::pattern::FilePattern;
use crate::version::Version;

pub const SIGNATURE_EXTENSIONS: [&str; 4] = [".sig", ".asc", ".sign", ".gpg"];
pub const KEY_EXTENSIONS: [&str; 3] = [".pgp", ".key", ".pub"];

/// What the published signature covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureTarget {
    /// The downloaded file itself
    #[default]
    Artifact,
    /// The checksum listing the digests came from
    ChecksumListing,
}

/// Where the public key comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// A key link published next to the artifact
    Link,
    Url(String),
    /// HKP lookup by key id
    Keyserver { key_id: String, keyserver: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePolicy {
    pub target: SignatureTarget,
    pub key: KeySource,
}

/// Signature bytes and key, ready for verification.
///
/// `signature` is empty when the checksum listing is cleartext-signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMaterial {
    pub signature: Vec<u8>,
    pub public_key: Vec<u8>,
    pub target: SignatureTarget,
}

pub fn is_signature_link(link: &str) -> bool {
    let name = file_name(link).to_ascii_lowercase();
    SIGNATURE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

pub fn is_key_link(link: &str) -> bool {
    let name = file_name(link);
    name == "KEYS" || {
        let lower = name.to_ascii_lowercase();
        KEY_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    }
}

/// HKP machine-readable lookup URL for `key_id`
pub fn keyserver_url(keyserver: &str, key_id: &str) -> String {
    let id = key_id.trim_start_matches("0x").trim_start_matches("0X");
    format!(
        "{}/pks/lookup?op=get&options=mr&search=0x{}",
        keyserver.trim_end_matches('/'),
        id
    )
}

/// Signature link for the artifact, preferring one naming the version
pub fn artifact_signature_link<'a>(
    links: &'a [String],
    file_pattern: &FilePattern,
    version: &Version,
) -> Option<&'a String> {
    let signatures: Vec<&String> = links.iter().filter(|link| is_signature_link(link)).collect();

    signatures
        .iter()
        .find(|link| file_pattern.is_match(link) && version.appears_in(link))
        .or_else(|| signatures.iter().find(|link| file_pattern.is_match(link)))
        .or_else(|| signatures.first())
        .copied()
}

/// Signature link named after the checksum listing (`SHA256SUMS.gpg`)
pub fn listing_signature_link<'a>(links: &'a [String], listing_url: &str) -> Option<&'a String> {
    links.iter().find(|link| {
        link.strip_prefix(listing_url)
            .is_some_and(|ext| SIGNATURE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    })
}

/// Fetch the signature and key required by `policy`
pub async fn discover_signature(
    session: &FetchSession,
    headers: &[(String, String)],
    listing: &Page,
    file_pattern: &FilePattern,
    version: &Version,
    checksums: &ChecksumDiscovery,
    policy: &SignaturePolicy,
) -> Result<SignatureMaterial, MirrorError> {
    let source_url = listing.url.as_str();
    let links = listing.links.as_slice();
    let not_found = |reason: &str| MirrorError::SignatureNotFound {
        url: source_url.to_string(),
        reason: reason.to_string(),
    };

    let signature = match policy.target {
        SignatureTarget::Artifact => {
            let link = artifact_signature_link(links, file_pattern, version)
                .ok_or_else(|| not_found("no signature link for the artifact"))?;
            fetch(session, headers, link).await?
        }
        SignatureTarget::ChecksumListing => {
            let checksum_listing = checksums
                .listing
                .as_ref()
                .ok_or_else(|| not_found("no checksum listing to verify"))?;
            match listing_signature_link(links, &checksum_listing.url) {
                Some(link) => fetch(session, headers, link).await?,
                None if is_cleartext_signed(&checksum_listing.body) => Vec::new(),
                None => return Err(not_found("no signature for the checksum listing")),
            }
        }
    };

    let key_url = match &policy.key {
        KeySource::Link => links
            .iter()
            .find(|link| is_key_link(link))
            .cloned()
            .ok_or_else(|| not_found("no public key link"))?,
        KeySource::Url(url) => url.clone(),
        KeySource::Keyserver { key_id, keyserver } => keyserver_url(keyserver, key_id),
    };
    debug!("{}: public key from {}", source_url, key_url);
    let public_key = fetch(session, headers, &key_url).await?;

    Ok(SignatureMaterial {
        signature,
        public_key,
        target: policy.target,
    })
}

async fn fetch(
    session: &FetchSession,
    headers: &[(String, String)],
    url: &str,
) -> Result<Vec<u8>, MirrorError> {
    session
        .bytes(url, headers)
        .await
        .map_err(|e| MirrorError::source_unavailable(url, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::transport::MockTransport;
    use crate::mirror::checksum::ChecksumListing;
    use mockall::predicate::{always, eq};
    use rstest::rstest;
    use std::sync::Arc;

    fn links(names: &[&str]) -> Vec<String> {
        names
            .iter()
            .map(|name| format!("https://m.test/{}", name))
            .collect()
    }

    fn page(names: &[&str]) -> Page {
        Page {
            url: "https://m.test/".to_string(),
            body: String::new(),
            links: links(names),
        }
    }

    #[rstest]
    #[case("https://m.test/a.iso.sig", true)]
    #[case("https://m.test/a.iso.ASC", true)]
    #[case("https://m.test/SHA256SUMS.gpg", true)]
    #[case("https://m.test/a.iso.sign", true)]
    #[case("https://m.test/a.iso", false)]
    #[case("https://m.test/signing.key", false)]
    fn signature_link_detection(#[case] link: &str, #[case] expected: bool) {
        assert_eq!(is_signature_link(link), expected);
    }

    #[rstest]
    #[case("https://m.test/KEYS", true)]
    #[case("https://m.test/release.pgp", true)]
    #[case("https://m.test/signing.key", true)]
    #[case("https://m.test/id.pub", true)]
    #[case("https://m.test/keys.html", false)]
    fn key_link_detection(#[case] link: &str, #[case] expected: bool) {
        assert_eq!(is_key_link(link), expected);
    }

    #[test]
    fn keyserver_url_uses_hkp_lookup() {
        assert_eq!(
            keyserver_url("https://keys.openpgp.org/", "0xDEADBEEF"),
            "https://keys.openpgp.org/pks/lookup?op=get&options=mr&search=0xDEADBEEF"
        );
    }

    #[test]
    fn artifact_signature_prefers_versioned_link() {
        let links = links(&[
            "SHA256SUMS.sig",
            "tool-1.1-amd64.iso.sig",
            "tool-1.2-amd64.iso.sig",
        ]);
        let pattern = FilePattern::new(r"tool-.+-amd64\.iso").unwrap();

        let link = artifact_signature_link(&links, &pattern, &Version::new("1.2").unwrap()).unwrap();

        assert_eq!(link, "https://m.test/tool-1.2-amd64.iso.sig");
    }

    #[test]
    fn artifact_signature_falls_back_to_any_signature() {
        let links = links(&["tool.iso", "release.asc"]);
        let pattern = FilePattern::new(r"tool-.+-amd64\.iso").unwrap();

        let link = artifact_signature_link(&links, &pattern, &Version::new("1.2").unwrap()).unwrap();

        assert_eq!(link, "https://m.test/release.asc");
    }

    #[test]
    fn listing_signature_is_named_after_listing() {
        let links = links(&["SHA256SUMS", "SHA256SUMS.gpg", "tool-1.2-amd64.iso.sig"]);

        let link = listing_signature_link(&links, "https://m.test/SHA256SUMS").unwrap();

        assert_eq!(link, "https://m.test/SHA256SUMS.gpg");
    }

    #[tokio::test]
    async fn cleartext_listing_needs_no_detached_signature() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .with(eq("https://keys.test/key.asc"), always())
            .times(1)
            .returning(|_, _| Ok(b"KEY".to_vec()));
        let session = FetchSession::new(Arc::new(transport));
        let checksums = ChecksumDiscovery {
            records: vec![],
            listing: Some(ChecksumListing {
                url: "https://m.test/CHECKSUM".to_string(),
                body: b"-----BEGIN PGP SIGNED MESSAGE-----\nHash: SHA256\n\nbody\n".to_vec(),
            }),
        };
        let policy = SignaturePolicy {
            target: SignatureTarget::ChecksumListing,
            key: KeySource::Url("https://keys.test/key.asc".to_string()),
        };

        let material = discover_signature(
            &session,
            &[],
            &page(&["CHECKSUM"]),
            &FilePattern::new("tool").unwrap(),
            &Version::new("1").unwrap(),
            &checksums,
            &policy,
        )
        .await
        .unwrap();

        assert!(material.signature.is_empty());
        assert_eq!(material.public_key, b"KEY");
        assert_eq!(material.target, SignatureTarget::ChecksumListing);
    }

    #[tokio::test]
    async fn missing_key_link_is_reported() {
        let mut transport = MockTransport::new();
        transport.expect_get().returning(|_, _| Ok(b"SIG".to_vec()));
        let session = FetchSession::new(Arc::new(transport));
        let policy = SignaturePolicy {
            target: SignatureTarget::Artifact,
            key: KeySource::Link,
        };

        let result = discover_signature(
            &session,
            &[],
            &page(&["tool-1-amd64.iso", "tool-1-amd64.iso.sig"]),
            &FilePattern::new(r"tool-.+-amd64\.iso").unwrap(),
            &Version::new("1").unwrap(),
            &ChecksumDiscovery::default(),
            &policy,
        )
        .await;

        assert!(matches!(result, Err(MirrorError::SignatureNotFound { .. })));
    }
}
