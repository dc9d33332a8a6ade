//! Index mirrors served by a [`FakeTransport`]

use std::time::Duration;

use isofetch::mirror::{FilePattern, IndexSource, Mirror, VersionRule};

use super::transport::{FakeTransport, sha256};

pub const FILE_PATTERN: &str = r"tool-.+-amd64\.iso";
pub const VERSION_PATTERN: &str = r"tool-(.+)-amd64\.iso";

/// Contents every honest mirror serves
pub const GOOD_CONTENT: &[u8] = b"tool image contents";

/// One fake index mirror
pub struct FakeMirror {
    pub base: String,
    pub version: &'static str,
    pub content: Vec<u8>,
    pub probe_elapsed: Duration,
}

impl FakeMirror {
    pub fn new(host: &str, version: &'static str, probe_ms: u64) -> Self {
        Self {
            base: format!("https://{}/iso/", host),
            version,
            content: GOOD_CONTENT.to_vec(),
            probe_elapsed: Duration::from_millis(probe_ms),
        }
    }

    /// Publish the honest digest but serve other bytes
    pub fn corrupted(mut self) -> Self {
        self.content = b"tampered image".to_vec();
        self
    }

    pub fn file_url(&self) -> String {
        format!("{}tool-{}-amd64.iso", self.base, self.version)
    }

    /// Add page, checksum listing and file routes to `transport`
    pub fn serve(&self, transport: FakeTransport) -> FakeTransport {
        let page = format!(
            r#"<a href="tool-{v}-amd64.iso">iso</a> <a href="SHA256SUMS">sums</a>"#,
            v = self.version
        );
        let sums = format!("{}  tool-{}-amd64.iso\n", sha256(GOOD_CONTENT), self.version);

        transport
            .route(&self.base, page)
            .route(&format!("{}SHA256SUMS", self.base), sums)
            .file(&self.file_url(), self.content.clone(), self.probe_elapsed)
    }

    pub fn mirror(&self) -> Mirror {
        Mirror::new(IndexSource::new(
            self.base.clone(),
            FilePattern::new(FILE_PATTERN).unwrap(),
            VersionRule::pattern(VERSION_PATTERN).unwrap(),
        ))
    }
}

/// Transport serving every mirror in `mirrors`
pub fn serve_all(mirrors: &[FakeMirror]) -> FakeTransport {
    mirrors
        .iter()
        .fold(FakeTransport::new(), |transport, mirror| mirror.serve(transport))
}
