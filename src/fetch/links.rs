//! Hyperlink extraction from fetched pages

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static HREF_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:href|src)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+))"#)
        .expect("href regex is valid")
});

/// Collect every `href`/`src` target in `body`, resolved against `base`.
///
/// Fragments-only links and targets that cannot be resolved are skipped.
/// Order of first appearance is kept and duplicates are removed.
pub fn extract_links(body: &str, base: &str) -> Vec<String> {
    let base_url = Url::parse(base).ok();
    let mut links: Vec<String> = Vec::new();

    for captures in HREF_REGEX.captures_iter(body) {
        let Some(raw) = captures
            .get(1)
            .or_else(|| captures.get(2))
            .or_else(|| captures.get(3))
        else {
            continue;
        };

        let target = decode_entities(raw.as_str().trim());
        if target.is_empty() || target.starts_with('#') {
            continue;
        }

        let Some(resolved) = resolve(&target, base_url.as_ref()) else {
            continue;
        };

        if !links.contains(&resolved) {
            links.push(resolved);
        }
    }

    links
}

/// Resolve `target` against `base`, keeping absolute URLs untouched
pub fn resolve(target: &str, base: Option<&Url>) -> Option<String> {
    if let Ok(absolute) = Url::parse(target) {
        return Some(absolute.to_string());
    }
    base?.join(target).ok().map(|url| url.to_string())
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&amp;", "&")
        .replace("&#38;", "&")
        .replace("&quot;", "\"")
        .replace("&#x2F;", "/")
}

/// Last path segment of a URL, without query or fragment
pub fn file_name(link: &str) -> &str {
    let without_query = link.split(['?', '#']).next().unwrap_or(link);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(without_query)
}
