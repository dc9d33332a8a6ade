use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::integrity::ChecksumAlgorithm;
use crate::mirror::{
    FilePattern, GitHubReleaseSource, IndexSource, KeySource, Mirror, SignaturePolicy,
    SignatureTarget, TemplateSource, VersionField, VersionRule,
};
use crate::version::{DEFAULT_SEPARATOR, Version};

// =============================================================================
// Network-related constants
// =============================================================================

/// Bytes streamed by the speed probe
pub const PROBE_BYTES: u64 = 2048;

/// Timeout for the speed probe in milliseconds (10 seconds)
pub const SPEED_PROBE_TIMEOUT_MS: u64 = 10_000;

/// Timeout for page fetches in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

/// Delay between starting each mirror initialization to avoid rate limiting (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

/// Idle time after which a full download is abandoned, in milliseconds (60 seconds)
pub const DOWNLOAD_STALL_TIMEOUT_MS: u64 = 60_000;

pub const USER_AGENT: &str = concat!("isofetch/", env!("CARGO_PKG_VERSION"));

/// Keyserver used when a signature config names a key id only
pub const DEFAULT_KEYSERVER: &str = "https://keyserver.ubuntu.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalogue: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid mirror for {artifact}: {reason}")]
    InvalidMirror { artifact: String, reason: String },
}

/// Catalogue of artifacts and their mirrors
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Catalogue {
    #[serde(default, rename = "artifact")]
    pub artifacts: Vec<ArtifactConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ArtifactConfig {
    pub name: String,
    /// Local path, may contain `[[VER]]`
    pub path: PathBuf,
    #[serde(default, rename = "mirror")]
    pub mirrors: Vec<MirrorConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MirrorKind {
    Index,
    Github,
    Template,
}

/// One `[[artifact.mirror]]` table
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MirrorConfig {
    pub kind: MirrorKind,
    /// Page URL (index, template) or API base URL (github)
    #[serde(default)]
    pub url: Option<String>,
    /// `owner/name` (github)
    #[serde(default)]
    pub repository: Option<String>,
    pub file_pattern: String,
    #[serde(default)]
    pub version_pattern: Option<String>,
    /// Fixed version; skips discovery
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default = "default_separator")]
    pub version_separator: String,
    #[serde(default)]
    pub version_padding: usize,
    #[serde(default)]
    pub version_field: VersionField,
    #[serde(default)]
    pub include_prereleases: bool,
    #[serde(default)]
    pub exclude: Option<String>,
    #[serde(default)]
    pub download_template: Option<String>,
    #[serde(default)]
    pub checksum_template: Option<String>,
    #[serde(default)]
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub signature: Option<SignatureConfig>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct SignatureConfig {
    #[serde(default)]
    pub target: SignatureTarget,
    #[serde(default)]
    pub key_url: Option<String>,
    #[serde(default)]
    pub key_id: Option<String>,
    #[serde(default)]
    pub keyserver: Option<String>,
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

impl Catalogue {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Artifacts named in `names`, or every artifact when `names` is empty
    pub fn select<'a>(&'a self, names: &'a [String]) -> impl Iterator<Item = &'a ArtifactConfig> {
        self.artifacts
            .iter()
            .filter(move |artifact| names.is_empty() || names.contains(&artifact.name))
    }
}

impl ArtifactConfig {
    /// Build a fresh set of mirrors for one run
    pub fn build_mirrors(&self) -> Result<Vec<Mirror>, ConfigError> {
        self.mirrors
            .iter()
            .map(|mirror| mirror.build(&self.name))
            .collect()
    }
}

impl SignatureConfig {
    pub fn policy(&self) -> SignaturePolicy {
        let key = match (&self.key_url, &self.key_id) {
            (Some(url), _) => KeySource::Url(url.clone()),
            (None, Some(key_id)) => KeySource::Keyserver {
                key_id: key_id.clone(),
                keyserver: self
                    .keyserver
                    .clone()
                    .unwrap_or_else(|| DEFAULT_KEYSERVER.to_string()),
            },
            (None, None) => KeySource::Link,
        };
        SignaturePolicy {
            target: self.target,
            key,
        }
    }
}

impl MirrorConfig {
    pub fn build(&self, artifact: &str) -> Result<Mirror, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidMirror {
            artifact: artifact.to_string(),
            reason: reason.to_string(),
        };
        let file_pattern = FilePattern::new(&self.file_pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: self.file_pattern.clone(),
            source,
        })?;
        let version_rule = self.version_rule(artifact)?;
        let headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let policy = self.signature.as_ref().map(SignatureConfig::policy);

        let mirror = match self.kind {
            MirrorKind::Index => {
                let url = self.url.as_ref().ok_or_else(|| invalid("index mirror needs url"))?;
                let mut source = IndexSource::new(url, file_pattern, version_rule).with_headers(headers);
                if let Some(policy) = policy {
                    source = source.with_signature(policy);
                }
                Mirror::new(source)
            }
            MirrorKind::Github => {
                let repository = self
                    .repository
                    .as_ref()
                    .ok_or_else(|| invalid("github mirror needs repository"))?;
                let api_url = self
                    .url
                    .as_deref()
                    .unwrap_or(crate::mirror::sources::github::DEFAULT_API_URL);
                let mut source =
                    GitHubReleaseSource::with_api_url(api_url, repository, file_pattern, version_rule)
                        .version_field(self.version_field)
                        .include_prereleases(self.include_prereleases)
                        .with_headers(headers);
                if let Some(exclude) = &self.exclude {
                    source = source.exclude(exclude.clone());
                }
                if let Some(policy) = policy {
                    source = source.with_signature(policy);
                }
                Mirror::new(source)
            }
            MirrorKind::Template => {
                let url = self.url.as_ref().ok_or_else(|| invalid("template mirror needs url"))?;
                let download = self
                    .download_template
                    .as_ref()
                    .ok_or_else(|| invalid("template mirror needs download_template"))?;
                let mut source =
                    TemplateSource::new(url, file_pattern, version_rule, download).with_headers(headers);
                if let Some(checksums) = &self.checksum_template {
                    source = source.with_checksums(checksums, self.checksum_algorithm);
                }
                if let Some(policy) = policy {
                    source = source.with_signature(policy);
                }
                Mirror::new(source)
            }
        };
        Ok(mirror)
    }

    fn version_rule(&self, artifact: &str) -> Result<VersionRule, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidMirror {
            artifact: artifact.to_string(),
            reason: reason.to_string(),
        };
        if let Some(version) = &self.version {
            return Version::parse(version, &self.version_separator, self.version_padding)
                .map(VersionRule::Fixed)
                .map_err(|e| invalid(&e.to_string()));
        }
        let pattern = self
            .version_pattern
            .as_ref()
            .ok_or_else(|| invalid("either version_pattern or version is required"))?;
        VersionRule::pattern_with(pattern, &self.version_separator, self.version_padding).map_err(|source| {
            ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            }
        })
    }
}

/// Returns the path to the data directory for isofetch.
/// Uses $XDG_DATA_HOME/isofetch if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/isofetch,
/// or ./isofetch if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("isofetch.log")
}

/// Default catalogue location under the XDG config directory
pub fn catalogue_path() -> PathBuf {
    config_dir_with_env(std::env::var("XDG_CONFIG_HOME").ok(), dirs::home_dir()).join("catalogue.toml")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("isofetch")
}

fn config_dir_with_env(xdg_config_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    xdg_config_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("isofetch")
}
