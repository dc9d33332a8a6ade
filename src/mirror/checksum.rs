//! Checksum discovery
//!
//! Expected digests are located by an ordered list of pure strategies. Each
//! strategy maps the source's links to candidate listing URLs; the first
//! strategy whose candidates yield at least one valid digest wins.

use tracing::debug;

use crate::fetch::FetchSession;
use crate::fetch::links::file_name;
use crate::integrity::{ChecksumAlgorithm, ChecksumRecord};
use crate::mirror::error::MirrorError;
use crate::mirror::pattern::FilePattern;
use crate::mirror::signature::is_signature_link;
use crate::version::Version;

/// A listing URL worth fetching, with its algorithm when the URL names one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingCandidate {
    pub url: String,
    /// `None` when the listing declares its algorithm inside its text
    pub algorithm: Option<ChecksumAlgorithm>,
}

/// What a strategy gets to look at
pub struct StrategyInput<'a> {
    pub links: &'a [String],
    pub file_pattern: &'a FilePattern,
    pub version: &'a Version,
}

pub type ChecksumStrategy = fn(&StrategyInput<'_>) -> Vec<ListingCandidate>;

/// Strategies in the order they are tried
pub const STRATEGIES: [(&str, ChecksumStrategy); 3] = [
    ("sibling sum files", sibling_sum_files),
    ("well-known listings", well_known_listings),
    ("self-describing listings", self_describing_listings),
];

/// The digests found for a version, plus the listing they were read from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumDiscovery {
    pub records: Vec<ChecksumRecord>,
    pub listing: Option<ChecksumListing>,
}

/// Raw checksum listing, kept for signatures that cover it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumListing {
    pub url: String,
    pub body: Vec<u8>,
}

impl ChecksumDiscovery {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn push(&mut self, record: ChecksumRecord) {
        if !self.records.contains(&record) {
            self.records.push(record);
        }
    }
}

/// Links next to the artifact such as `image-1.2.iso.sha256`
pub fn sibling_sum_files(input: &StrategyInput<'_>) -> Vec<ListingCandidate> {
    input
        .links
        .iter()
        .filter(|link| input.file_pattern.is_match(link) && input.version.appears_in(link))
        .filter(|link| !is_signature_link(link))
        .filter_map(|link| {
            ChecksumAlgorithm::detect(file_name(link)).map(|algorithm| ListingCandidate {
                url: link.clone(),
                algorithm: Some(algorithm),
            })
        })
        .collect()
}

/// Conventional listing names such as `SHA256SUMS`, strongest algorithm first
pub fn well_known_listings(input: &StrategyInput<'_>) -> Vec<ListingCandidate> {
    ChecksumAlgorithm::ALL
        .into_iter()
        .flat_map(|algorithm| {
            input
                .links
                .iter()
                .filter(move |link| {
                    let name = file_name(link);
                    algorithm
                        .listing_names()
                        .iter()
                        .any(|known| known.eq_ignore_ascii_case(name))
                })
                .map(move |link| ListingCandidate {
                    url: link.clone(),
                    algorithm: Some(algorithm),
                })
        })
        .collect()
}

/// `CHECKSUM` style listings that name their algorithm inside the text
pub fn self_describing_listings(input: &StrategyInput<'_>) -> Vec<ListingCandidate> {
    input
        .links
        .iter()
        .filter(|link| !is_signature_link(link))
        .filter(|link| file_name(link).to_ascii_uppercase().contains("CHECKSUM"))
        .map(|link| ListingCandidate {
            url: link.clone(),
            algorithm: None,
        })
        .collect()
}

/// Run the strategies over `links` and fetch the winning listings
pub async fn discover_checksums(
    session: &FetchSession,
    headers: &[(String, String)],
    source_url: &str,
    links: &[String],
    file_pattern: &FilePattern,
    version: &Version,
) -> Result<ChecksumDiscovery, MirrorError> {
    let input = StrategyInput {
        links,
        file_pattern,
        version,
    };
    let mut errors = Vec::new();

    for (name, strategy) in STRATEGIES {
        let candidates = strategy(&input);
        if candidates.is_empty() {
            continue;
        }
        debug!("{}: {} candidate(s) from {}", source_url, candidates.len(), name);

        let mut discovery = ChecksumDiscovery::default();
        for candidate in candidates {
            let body = match session.cached_bytes(&candidate.url, headers).await {
                Ok(body) => body,
                Err(e) => {
                    errors.push(format!("{}: {}", candidate.url, e));
                    continue;
                }
            };
            let text = String::from_utf8_lossy(&body);
            let records = match candidate.algorithm {
                Some(algorithm) => parse_listing(&text, file_pattern, version)
                    .filter(|digest| algorithm.is_valid_digest(digest))
                    .map(|digest| vec![ChecksumRecord::new(algorithm, digest)])
                    .unwrap_or_default(),
                None => parse_self_describing(&text, file_pattern, version),
            };

            if records.is_empty() {
                errors.push(format!("{}: no digest for {}", candidate.url, file_pattern.as_str()));
                continue;
            }
            if discovery.listing.is_none() {
                discovery.listing = Some(ChecksumListing {
                    url: candidate.url.clone(),
                    body: body.to_vec(),
                });
            }
            records.into_iter().for_each(|record| discovery.push(record));
        }

        if !discovery.is_empty() {
            return Ok(discovery);
        }
    }

    Err(MirrorError::ChecksumNotFound {
        url: source_url.to_string(),
        errors,
    })
}

/// Digest for the artifact in a single-algorithm listing.
///
/// A body without any whitespace is taken as the digest itself. Otherwise the
/// first line naming the artifact at `version` is used; see [`select_lines`].
pub fn parse_listing(text: &str, file_pattern: &FilePattern, version: &Version) -> Option<String> {
    let trimmed = text.trim();
    if !trimmed.is_empty() && !trimmed.contains(char::is_whitespace) {
        return Some(trimmed.to_ascii_lowercase());
    }

    let lines: Vec<&str> = trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#') && file_pattern.is_match(line))
        .collect();
    select_lines(lines, |line| *line, file_pattern, version)
        .into_iter()
        .find_map(|line| digest_from_line(line, file_pattern))
}

/// Digests in a listing that declares algorithms itself, either through
/// `Hash: SHA256` / `# SHA256` headers or BSD `SHA256 (file) = digest` lines.
pub fn parse_self_describing(text: &str, file_pattern: &FilePattern, version: &Version) -> Vec<ChecksumRecord> {
    let mut section = None;
    let mut entries: Vec<(Option<ChecksumAlgorithm>, &str)> = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') || line.to_ascii_lowercase().starts_with("hash:") {
            if let Some(algorithm) = ChecksumAlgorithm::detect(line) {
                section = Some(algorithm);
            }
            continue;
        }
        if !file_pattern.is_match(line) {
            continue;
        }

        entries.push((bsd_algorithm(line).or(section), line));
    }

    let mut records: Vec<ChecksumRecord> = Vec::new();
    for (algorithm, line) in select_lines(entries, |entry| entry.1, file_pattern, version) {
        let record = algorithm.and_then(|algorithm| {
            digest_from_line(line, file_pattern)
                .filter(|digest| algorithm.is_valid_digest(digest))
                .map(|digest| ChecksumRecord::new(algorithm, digest))
        });
        if let Some(record) = record {
            if !records.contains(&record) {
                records.push(record);
            }
        }
    }
    records
}

/// Lines of the form `<algorithm> <digest> <file>`, as seen in release notes
pub fn parse_annotated_lines(text: &str, file_pattern: &FilePattern) -> Vec<ChecksumRecord> {
    text.lines()
        .filter(|line| file_pattern.is_match(line))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let algorithm = ChecksumAlgorithm::detect(tokens.next()?)?;
            tokens
                .find(|token| algorithm.is_valid_digest(token))
                .map(|digest| ChecksumRecord::new(algorithm, digest))
        })
        .collect()
}

/// Listing lines that belong to the artifact at `version`.
///
/// Lines naming the version win. When none does, the lines are only trusted
/// if they all name the same file, as in a listing for a single artifact.
fn select_lines<'t, T>(
    entries: Vec<T>,
    line: impl Fn(&T) -> &'t str,
    file_pattern: &FilePattern,
    version: &Version,
) -> Vec<T> {
    if entries.iter().any(|entry| version.appears_in(line(entry))) {
        return entries
            .into_iter()
            .filter(|entry| version.appears_in(line(entry)))
            .collect();
    }

    let mut files = entries.iter().filter_map(|entry| file_pattern.find(line(entry)));
    let single_file = match files.next() {
        Some(first) => files.all(|file| file == first),
        None => false,
    };
    if single_file {
        entries
    } else {
        debug!("No listing line names version {}", version.spelling());
        Vec::new()
    }
}

fn bsd_algorithm(line: &str) -> Option<ChecksumAlgorithm> {
    let (head, _) = line.split_once('(')?;
    line.contains(") = ")
        .then(|| ChecksumAlgorithm::detect(head))
        .flatten()
}

fn digest_from_line(line: &str, file_pattern: &FilePattern) -> Option<String> {
    if let Some((_, digest)) = line.rsplit_once(") = ") {
        return Some(digest.trim().to_ascii_lowercase());
    }

    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;
    let digest = if file_pattern.is_match(first) {
        tokens.next()?
    } else {
        first
    };
    Some(digest.to_ascii_lowercase())
}
