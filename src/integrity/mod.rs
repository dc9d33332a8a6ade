//! Integrity primitives
//!
//! Digest algorithms, expected checksum records and OpenPGP signature
//! verification used to accept or reject a downloaded image.
//!
//! # Modules
//!
//! - [`algorithm`]: Closed set of supported digest algorithms
//! - [`hashing`]: Chunked file hashing
//! - [`checksum`]: Expected digests and their verification
//! - [`signature`]: Detached and cleartext OpenPGP signatures
//! - [`error`]: Failure reasons preserved for diagnostics

pub mod algorithm;
pub mod checksum;
pub mod error;
pub mod hashing;
pub mod signature;

pub use algorithm::ChecksumAlgorithm;
pub use checksum::{ChecksumRecord, verify_checksums};
pub use error::{IntegrityFailure, SignatureError};
pub use hashing::{digest_file, digest_reader};
pub use signature::{is_cleartext_signed, verify_signature};
