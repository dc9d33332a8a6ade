use thiserror::Error;

use crate::integrity::algorithm::ChecksumAlgorithm;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}

/// Why a downloaded file was rejected
#[derive(Debug, Error)]
pub enum IntegrityFailure {
    #[error("{algorithm} mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        algorithm: ChecksumAlgorithm,
        expected: String,
        actual: String,
    },

    #[error("Signature does not match {target}")]
    SignatureMismatch { target: String },

    #[error("Signature could not be checked: {0}")]
    Signature(#[from] SignatureError),

    #[error("Signed checksum listing is missing")]
    MissingSignedListing,

    #[error("Failed to read downloaded file: {0}")]
    Io(#[from] std::io::Error),
}
