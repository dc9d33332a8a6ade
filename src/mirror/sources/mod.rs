//! Concrete mirror sources
//!
//! - [`index`]: Directory listings and download pages
//! - [`github`]: GitHub Releases API
//! - [`template`]: Version in page text, URLs built from templates

pub mod github;
pub mod index;
pub mod template;

pub use github::{GitHubReleaseSource, VersionField};
pub use index::IndexSource;
pub use template::TemplateSource;
