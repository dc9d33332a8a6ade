//! Expected digests and their verification

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::integrity::algorithm::ChecksumAlgorithm;
use crate::integrity::error::IntegrityFailure;
use crate::integrity::hashing::digest_file;

/// An (algorithm, expected digest) pair for the artifact file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumRecord {
    pub algorithm: ChecksumAlgorithm,
    /// Hex digest, stored lowercase
    pub digest: String,
}

impl ChecksumRecord {
    pub fn new(algorithm: ChecksumAlgorithm, digest: impl Into<String>) -> Self {
        Self {
            algorithm,
            digest: digest.into().trim().to_ascii_lowercase(),
        }
    }

    /// Case-insensitive comparison against a computed digest
    pub fn matches(&self, actual: &str) -> bool {
        self.digest.eq_ignore_ascii_case(actual.trim())
    }
}

/// Check every record against the file at `path`.
///
/// Returns the first mismatch. Blocking: hashes the whole file once per record.
pub fn verify_checksums(path: &Path, records: &[ChecksumRecord]) -> Result<(), IntegrityFailure> {
    for record in records {
        let actual = digest_file(path, record.algorithm)?;
        let matched = record.matches(&actual);
        debug!(
            "{} of {:?}: expected {} got {} ({})",
            record.algorithm,
            path,
            record.digest,
            actual,
            if matched { "ok" } else { "mismatch" }
        );
        if !matched {
            return Err(IntegrityFailure::ChecksumMismatch {
                algorithm: record.algorithm,
                expected: record.digest.clone(),
                actual,
            });
        }
    }
    Ok(())
}
