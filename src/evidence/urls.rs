//! Direct and embedded URL evidence.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Node};
use url::Url;

use super::TargetSignature;

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)https?://[^\s"'<>`\\|^{}]+"#).unwrap());

static CSS_URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).unwrap());

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '\'', '"'];

/// Path fragments that name site infrastructure, never a profile.
const ASSET_KEYWORDS: &[&str] = &[
    "static", "images", "img", "api", "css", "js", "files", "public", "assets", "media", "fonts",
    "cdn",
];

const ASSET_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".css", ".js", ".json",
];

const MIN_USERNAME_LEN: usize = 2;
const MAX_USERNAME_LEN: usize = 30;

/// Find absolute URLs on the target domain, skipping asset paths.
///
/// Matching is case-insensitive; returned URLs have a lowercased host and no
/// fragment.
pub fn extract_direct_urls(text: &str, signature: &TargetSignature) -> BTreeSet<String> {
    let text = unescape_slashes(text);
    URL_PATTERN
        .find_iter(&text)
        .filter_map(|m| normalize_evidence(m.as_str(), signature))
        .collect()
}

/// Scan markup attributes, scripts, styles and text for target references.
///
/// Full URLs are taken as-is. When only a `domain/<username>` fragment is
/// present, a profile URL is rebuilt from it.
pub fn extract_embedded_references(markup: &str, signature: &TargetSignature) -> BTreeSet<String> {
    collect_candidates(markup)
        .iter()
        .flat_map(|candidate| references_in_text(candidate, signature))
        .collect()
}

/// Apply the embedded-reference heuristic to a single block of plain text.
pub fn references_in_text(text: &str, signature: &TargetSignature) -> BTreeSet<String> {
    if !text.to_lowercase().contains(signature.domain()) {
        return BTreeSet::new();
    }

    let direct = extract_direct_urls(text, signature);
    if !direct.is_empty() {
        return direct;
    }

    let text = unescape_slashes(text);
    let mut found = BTreeSet::new();
    for caps in signature.fragment_pattern().captures_iter(&text) {
        let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if !prefix.is_empty() && !prefix.ends_with('.') {
            continue;
        }
        let Some(username) = caps.get(2).map(|m| m.as_str().trim_matches('.')) else {
            continue;
        };
        if is_plausible_username(username, signature) {
            found.insert(format!("https://{}/{}", signature.domain(), username));
        }
    }
    found
}

fn is_plausible_username(username: &str, signature: &TargetSignature) -> bool {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return false;
    }
    let lower = username.to_lowercase();
    if ASSET_KEYWORDS.contains(&lower.as_str())
        || signature.excluded_segments().iter().any(|s| *s == lower)
    {
        return false;
    }
    !ASSET_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

pub(crate) fn normalize_evidence(raw: &str, signature: &TargetSignature) -> Option<String> {
    let trimmed = raw.trim_end_matches(TRAILING_PUNCTUATION);
    let mut url = Url::parse(trimmed).ok()?;
    let host = url.host_str()?;
    if !signature.matches_host(host) || signature.is_excluded_path(url.path()) {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

/// JSON embedded in scripts often escapes slashes.
fn unescape_slashes(text: &str) -> Cow<'_, str> {
    if text.contains("\\/") || text.contains("\\u002F") || text.contains("\\u002f") {
        Cow::Owned(
            text.replace("\\/", "/")
                .replace("\\u002F", "/")
                .replace("\\u002f", "/"),
        )
    } else {
        Cow::Borrowed(text)
    }
}

fn is_scanned_attribute(name: &str) -> bool {
    matches!(
        name,
        "href" | "src" | "alt" | "title" | "content" | "action" | "srcset"
    ) || name.starts_with("data-")
}

fn css_urls(css: &str) -> impl Iterator<Item = String> + '_ {
    CSS_URL_PATTERN
        .captures_iter(css)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
}

fn collect_candidates(markup: &str) -> Vec<String> {
    let document = Html::parse_document(markup);
    let mut candidates = Vec::new();

    for node in document.tree.root().descendants() {
        match node.value() {
            Node::Element(element) => {
                for (name, value) in element.attrs() {
                    if is_scanned_attribute(name) {
                        candidates.push(value.to_string());
                    } else if name == "style" {
                        candidates.extend(css_urls(value));
                    }
                }
            }
            Node::Text(text) => {
                let parent = node
                    .parent()
                    .and_then(|p| p.value().as_element().map(|e| e.name().to_string()));
                let body: &str = text;
                match parent.as_deref() {
                    Some("style") => candidates.extend(css_urls(body)),
                    _ => candidates.push(body.to_string()),
                }
            }
            _ => {}
        }
    }

    candidates
}
