//! Parsed version strings with a total ordering

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::version::error::InvalidVersionError;
use crate::version::token::{Token, tokenize};

/// Default component separator
pub const DEFAULT_SEPARATOR: &str = ".";

/// A version split into components, each component split into tokens.
///
/// Comparison walks components and tokens left to right. Numbers compare
/// numerically, words lexically, a number sorts before a word, and a strict
/// prefix sorts first. Equality follows the ordering, so `1.02.0 == 1.2.0`.
///
/// The published spelling (`2024.01.01`) is kept next to the canonical
/// rendering (`2024.1.1`), since links and file names use the former.
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<Vec<Token>>,
    separator: String,
    zero_pad: usize,
    /// Raw input, dropped once padding or a new separator changes the rendering
    published: Option<String>,
}

impl Version {
    /// Parse with the default `.` separator and no padding
    pub fn new(raw: &str) -> Result<Self, InvalidVersionError> {
        Self::parse(raw, DEFAULT_SEPARATOR, 0)
    }

    /// Parse `raw` using `separator` between components.
    ///
    /// An empty separator makes every character its own component. Only an
    /// empty `raw` string is rejected.
    pub fn parse(raw: &str, separator: &str, zero_pad: usize) -> Result<Self, InvalidVersionError> {
        if raw.is_empty() {
            return Err(InvalidVersionError::Empty);
        }

        let components = if separator.is_empty() {
            raw.chars().map(|c| tokenize(&c.to_string())).collect()
        } else {
            raw.split(separator).map(tokenize).collect()
        };

        Ok(Self {
            components,
            separator: separator.to_string(),
            zero_pad,
            published: (zero_pad == 0).then(|| raw.to_string()),
        })
    }

    pub fn components(&self) -> &[Vec<Token>] {
        &self.components
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn zero_pad(&self) -> usize {
        self.zero_pad
    }

    /// Same version rendered with another separator
    pub fn with_separator(&self, separator: &str) -> Self {
        Self {
            separator: separator.to_string(),
            published: None,
            ..self.clone()
        }
    }

    /// Same version rendered with another zero-pad width
    pub fn with_zero_pad(&self, zero_pad: usize) -> Self {
        Self {
            zero_pad,
            published: None,
            ..self.clone()
        }
    }

    /// How the version is written in links, file names and URL templates.
    ///
    /// This is the raw input unless padding or a separator change asked for
    /// a re-rendering, in which case it is [`Version::render`].
    pub fn spelling(&self) -> String {
        match &self.published {
            Some(raw) => raw.clone(),
            None => self.render(),
        }
    }

    /// Whether `text` names this version, in its published or its canonical
    /// spelling.
    ///
    /// An occurrence must not run into a neighbouring number: `1.1` is not
    /// found in `tool-1.12.iso`, `tool-11.1.iso` or `tool-1.1.1.iso`.
    pub fn appears_in(&self, text: &str) -> bool {
        let rendered = self.render();
        self.published
            .iter()
            .map(String::as_str)
            .chain([rendered.as_str()])
            .filter(|spelling| !spelling.is_empty())
            .any(|spelling| {
                text.match_indices(spelling).any(|(start, _)| {
                    let before = &text[..start];
                    let after = &text[start + spelling.len()..];
                    !self.number_ends(before) && !self.number_starts(after)
                })
            })
    }

    /// `text` ends with a digit, or with a digit and the separator
    fn number_ends(&self, text: &str) -> bool {
        let ends_with_digit = |s: &str| s.chars().next_back().is_some_and(|c| c.is_ascii_digit());
        ends_with_digit(text)
            || (!self.separator.is_empty()
                && text.strip_suffix(self.separator.as_str()).is_some_and(ends_with_digit))
    }

    /// `text` starts with a digit, or with the separator and a digit
    fn number_starts(&self, text: &str) -> bool {
        let starts_with_digit = |s: &str| s.chars().next().is_some_and(|c| c.is_ascii_digit());
        starts_with_digit(text)
            || (!self.separator.is_empty()
                && text.strip_prefix(self.separator.as_str()).is_some_and(starts_with_digit))
    }

    /// Canonical rendering used for filenames and URLs.
    ///
    /// Characters outside token runs are not preserved.
    pub fn render(&self) -> String {
        self.components
            .iter()
            .map(|component| {
                component
                    .iter()
                    .map(|token| token.render(self.zero_pad))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Vec ordering is lexicographic with the shorter prefix first,
        // at both the token and the component level.
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl FromStr for Version {
    type Err = InvalidVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn v(raw: &str) -> Version {
        Version::new(raw).unwrap()
    }

    #[test]
    fn parse_rejects_empty_string() {
        assert_eq!(Version::new(""), Err(InvalidVersionError::Empty));
    }

    #[rstest]
    #[case("1.02.0", "1.2.0", Ordering::Equal)]
    #[case("1.2", "1.2.1", Ordering::Less)]
    #[case("1.10", "1.9", Ordering::Greater)]
    #[case("1.2-alpha", "1.2.0", Ordering::Greater)]
    #[case("1.2.0", "1.2-alpha", Ordering::Less)]
    #[case("1.2rc1", "1.2", Ordering::Greater)]
    #[case("2024.01.01", "2023.12.01", Ordering::Greater)]
    #[case("1..2", "1.0.2", Ordering::Less)]
    #[case("v2", "1", Ordering::Greater)]
    fn compare_orders_versions(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(v(a).cmp(&v(b)), expected);
        assert_eq!(v(b).cmp(&v(a)), expected.reverse());
    }

    #[test]
    fn component_without_tokens_sorts_before_any_content() {
        // "1.-" has an empty second component
        assert!(v("1.-") < v("1.0"));
        assert_eq!(v("1.-"), v("1.+"));
    }

    #[test]
    fn ordering_is_transitive_over_mixed_inputs() {
        let mut versions: Vec<Version> = ["1.2", "1.10", "1.2.1", "1.2a", "0.9", "1.2-rc", "10"]
            .into_iter()
            .map(v)
            .collect();
        versions.sort();

        for window in versions.windows(2) {
            assert!(window[0] <= window[1]);
        }
        for a in &versions {
            for b in &versions {
                for c in &versions {
                    if a < b && b < c {
                        assert!(a < c);
                    }
                }
            }
        }
    }

    #[test]
    fn exactly_one_relation_holds() {
        let samples = ["1", "1.0", "1.a", "a.1", "1.2.3", "01.2.3"];
        for a in samples {
            for b in samples {
                let (a, b) = (v(a), v(b));
                let relations = [a < b, a == b, a > b];
                assert_eq!(relations.iter().filter(|r| **r).count(), 1);
            }
        }
    }

    #[test]
    fn empty_separator_splits_into_characters() {
        let version = Version::parse("124", "", 0).unwrap();
        assert_eq!(version.components().len(), 3);
        assert_eq!(version.render(), "124");
        assert!(version > Version::parse("123", "", 0).unwrap());
    }

    #[test]
    fn custom_separator_is_used_for_parsing_and_rendering() {
        let version = Version::parse("23H2", "H", 0).unwrap();
        assert_eq!(version.components().len(), 2);
        assert_eq!(version.render(), "23H2");
        assert!(version > Version::parse("22H2", "H", 0).unwrap());
    }

    #[rstest]
    #[case("9", 3, "009")]
    // Every integer token is padded, including those of a dotted version
    #[case("1.2", 2, "01.02")]
    #[case("2024.1.1", 2, "2024.01.01")]
    #[case("1.2-beta3", 2, "01.02beta03")]
    #[case("1.2", 0, "1.2")]
    fn render_pads_integer_tokens(#[case] raw: &str, #[case] pad: usize, #[case] expected: &str) {
        let version = Version::parse(raw, ".", pad).unwrap();
        assert_eq!(version.render(), expected);
    }

    #[test]
    fn render_drops_characters_outside_tokens() {
        assert_eq!(v(" 1 . 2-rc ").render(), "1.2rc");
    }

    #[test]
    fn with_separator_keeps_ordering_and_changes_rendering() {
        let compact = Version::parse("12", "", 0).unwrap();
        let dotted = compact.with_separator(".");
        assert_eq!(dotted.render(), "1.2");
        assert_eq!(compact, dotted);
    }

    #[test]
    fn spelling_keeps_the_published_form() {
        let version = v("2024.01.01");

        assert_eq!(version.render(), "2024.1.1");
        assert_eq!(version.spelling(), "2024.01.01");
        assert_eq!(v("3.1.2-22").spelling(), "3.1.2-22");
    }

    #[test]
    fn spelling_follows_requested_rendering() {
        assert_eq!(Version::parse("2024.1.1", ".", 2).unwrap().spelling(), "2024.01.01");
        assert_eq!(Version::parse("12", "", 0).unwrap().with_separator(".").spelling(), "1.2");
        assert_eq!(v("1.02").with_zero_pad(3).spelling(), "001.002");
    }

    #[rstest]
    #[case("2024.01.01", "https://m.test/archlinux-2024.01.01-x86_64.iso", true)]
    #[case("2024.01.01", "https://m.test/archlinux-2024.1.1-x86_64.iso", true)]
    #[case("3.1.2-22", "clonezilla-live-3.1.2-22-amd64.iso", true)]
    #[case("1.1", "tool-1.1-amd64.iso", true)]
    #[case("1.1", "tool-1.12-amd64.iso", false)]
    #[case("1.1", "tool-11.1-amd64.iso", false)]
    #[case("1.1", "tool-1.1.1-amd64.iso", false)]
    #[case("1.1", "tool-2.1.1-amd64.iso", false)]
    #[case("39", "Fedora-Workstation-Live-x86_64-39-1.5.iso", true)]
    fn appears_in_respects_number_boundaries(#[case] raw: &str, #[case] text: &str, #[case] expected: bool) {
        assert_eq!(v(raw).appears_in(text), expected);
    }
}
