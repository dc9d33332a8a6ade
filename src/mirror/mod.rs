//! Mirrors of a downloadable artifact
//!
//! A [`Mirror`] wraps a [`MirrorSource`] and, once initialized, knows the
//! latest version it serves, the expected checksums, the download link and
//! how fast it answered.
//!
//! # Modules
//!
//! - [`source`]: `MirrorSource` trait implemented by every kind of mirror
//! - [`sources`]: Index pages, GitHub releases and templated URLs
//! - [`pattern`]: File patterns and version discovery rules
//! - [`checksum`]: Ordered checksum discovery strategies and listing parsers
//! - [`signature`]: Signature and public key discovery
//! - [`resolved`]: `Mirror` and its resolved state
//! - [`speed`]: Speed probe
//! - [`error`]: Mirror errors

pub mod checksum;
pub mod error;
pub mod pattern;
pub mod resolved;
pub mod signature;
pub mod source;
pub mod sources;
pub mod speed;

pub use checksum::{ChecksumDiscovery, ChecksumListing};
pub use error::MirrorError;
pub use pattern::{FilePattern, VersionRule};
pub use resolved::{Mirror, Resolution};
pub use signature::{KeySource, SignatureMaterial, SignaturePolicy, SignatureTarget};
pub use source::MirrorSource;
pub use sources::{GitHubReleaseSource, IndexSource, TemplateSource, VersionField};
pub use speed::Speed;
