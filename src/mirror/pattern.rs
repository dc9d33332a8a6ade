//! File-identification patterns and version discovery rules

use regex::Regex;
use tracing::debug;

use crate::version::{DEFAULT_SEPARATOR, Version};

/// Regex identifying the artifact file among a source's links
#[derive(Debug, Clone)]
pub struct FilePattern {
    regex: Regex,
    anchored: Regex,
}

impl FilePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            anchored: Regex::new(&format!("(?:{})$", pattern))?,
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Pattern occurs anywhere in `text`
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// First stretch of `text` the pattern matches
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex.find(text).map(|m| m.as_str())
    }

    /// Pattern matches at the very end of `text` (the link names the file itself)
    pub fn matches_end(&self, text: &str) -> bool {
        self.anchored.is_match(text)
    }
}

/// How a mirror determines the version it serves
#[derive(Debug, Clone)]
pub enum VersionRule {
    /// Search candidates with `regex`; capture group 1 (or the whole match) is the version
    Pattern {
        regex: Regex,
        separator: String,
        zero_pad: usize,
    },
    /// The version is known up front; discovery is skipped
    Fixed(Version),
}

impl VersionRule {
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Self::pattern_with(pattern, DEFAULT_SEPARATOR, 0)
    }

    pub fn pattern_with(pattern: &str, separator: &str, zero_pad: usize) -> Result<Self, regex::Error> {
        Ok(VersionRule::Pattern {
            regex: Regex::new(pattern)?,
            separator: separator.to_string(),
            zero_pad,
        })
    }

    /// Human-readable form for error messages
    pub fn describe(&self) -> String {
        match self {
            VersionRule::Pattern { regex, .. } => regex.as_str().to_string(),
            VersionRule::Fixed(version) => format!("fixed {}", version),
        }
    }

    /// Highest version found in `candidates`, one match per candidate.
    ///
    /// `None` means nothing matched; it sorts below every real version.
    pub fn resolve<'a>(&self, candidates: impl IntoIterator<Item = &'a str>) -> Option<Version> {
        match self {
            VersionRule::Fixed(version) => Some(version.clone()),
            VersionRule::Pattern {
                regex,
                separator,
                zero_pad,
            } => candidates
                .into_iter()
                .filter_map(|candidate| {
                    let captures = regex.captures(candidate)?;
                    let raw = captures.get(1).or_else(|| captures.get(0))?.as_str();
                    debug!("Candidate {} yields version '{}'", candidate, raw);
                    Version::parse(raw, separator, *zero_pad).ok()
                })
                .max(),
        }
    }

    /// Highest version among every match of the pattern inside `text`
    pub fn resolve_in_text(&self, text: &str) -> Option<Version> {
        match self {
            VersionRule::Fixed(version) => Some(version.clone()),
            VersionRule::Pattern {
                regex,
                separator,
                zero_pad,
            } => regex
                .captures_iter(text)
                .filter_map(|captures| {
                    let raw = captures.get(1).or_else(|| captures.get(0))?.as_str();
                    Version::parse(raw, separator, *zero_pad).ok()
                })
                .max(),
        }
    }
}
