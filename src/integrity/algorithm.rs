//! Supported digest algorithms

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of digest algorithms a mirror may publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Blake3,
    Blake2b,
    Sha512,
    Sha256,
    Sha1,
    Md5,
}

impl ChecksumAlgorithm {
    /// All algorithms, strongest first
    pub const ALL: [ChecksumAlgorithm; 6] = [
        ChecksumAlgorithm::Blake3,
        ChecksumAlgorithm::Blake2b,
        ChecksumAlgorithm::Sha512,
        ChecksumAlgorithm::Sha256,
        ChecksumAlgorithm::Sha1,
        ChecksumAlgorithm::Md5,
    ];

    /// Lowercase name as it appears in sum file names (`sha256sums.txt`)
    pub fn keyword(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Blake3 => "blake3",
            ChecksumAlgorithm::Blake2b => "blake2b",
            ChecksumAlgorithm::Sha512 => "sha512",
            ChecksumAlgorithm::Sha256 => "sha256",
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Md5 => "md5",
        }
    }

    /// Length of the hex-encoded digest
    pub fn hex_len(&self) -> usize {
        match self {
            ChecksumAlgorithm::Blake3 => 64,
            ChecksumAlgorithm::Blake2b => 128,
            ChecksumAlgorithm::Sha512 => 128,
            ChecksumAlgorithm::Sha256 => 64,
            ChecksumAlgorithm::Sha1 => 40,
            ChecksumAlgorithm::Md5 => 32,
        }
    }

    /// Whether `digest` looks like a hex digest produced by this algorithm
    pub fn is_valid_digest(&self, digest: &str) -> bool {
        digest.len() == self.hex_len() && digest.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// Conventional listing names for this algorithm
    pub fn listing_names(&self) -> &'static [&'static str] {
        match self {
            ChecksumAlgorithm::Blake3 => &["B3SUMS", "b3sums.txt", "BLAKE3SUMS", "blake3sums.txt"],
            ChecksumAlgorithm::Blake2b => &["B2SUMS", "b2sums.txt", "BLAKE2BSUMS"],
            ChecksumAlgorithm::Sha512 => &["SHA512SUMS", "sha512sums.txt", "sha512sum.txt"],
            ChecksumAlgorithm::Sha256 => &["SHA256SUMS", "sha256sums.txt", "sha256sum.txt"],
            ChecksumAlgorithm::Sha1 => &["SHA1SUMS", "sha1sums.txt", "sha1sum.txt"],
            ChecksumAlgorithm::Md5 => &["MD5SUMS", "md5sums.txt", "md5sum.txt"],
        }
    }

    /// Find the algorithm named in `text`, case-insensitively.
    ///
    /// Longer names are checked first so `sha512` never matches as `sha1`.
    pub fn detect(text: &str) -> Option<Self> {
        let lower = text.to_ascii_lowercase().replace('-', "");
        Self::ALL
            .into_iter()
            .find(|algorithm| lower.contains(algorithm.keyword()))
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChecksumAlgorithm::Blake3 => "BLAKE3",
            ChecksumAlgorithm::Blake2b => "BLAKE2b",
            ChecksumAlgorithm::Sha512 => "SHA-512",
            ChecksumAlgorithm::Sha256 => "SHA-256",
            ChecksumAlgorithm::Sha1 => "SHA-1",
            ChecksumAlgorithm::Md5 => "MD5",
        };
        f.write_str(name)
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "");
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.keyword() == normalized)
            .ok_or_else(|| format!("Unknown checksum algorithm: {}", s))
    }
}
