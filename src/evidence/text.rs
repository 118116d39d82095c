//! Text flattening, brand mentions and candidate link sampling.

use std::collections::HashSet;

use scraper::{Html, Node};
use url::Url;

use super::TargetSignature;

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Attributes that can carry an outbound link, in priority order.
const LINK_ATTRIBUTES: &[&str] = &["href", "data-url", "data-href", "data-link"];

const SKIPPED_SCHEMES: &[&str] = &["mailto:", "tel:", "sms:", "javascript:", "data:"];

/// Strip markup down to visible text, whitespace-collapsed.
pub fn flatten_text(markup: &str) -> String {
    let document = Html::parse_document(markup);
    let mut parts: Vec<&str> = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map(|e| HIDDEN_ELEMENTS.contains(&e.name()))
                .unwrap_or(false)
        });
        if !hidden {
            parts.push(text);
        }
    }

    parts
        .iter()
        .flat_map(|p| p.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whole-word, case-insensitive mention of the target brand name.
pub fn mentions_brand(text: &str, signature: &TargetSignature) -> bool {
    signature.brand_pattern().is_match(text)
}

/// Outbound links worth following through the redirect resolver.
///
/// Relative links are resolved against `base`. Fragment-only, `mailto:`,
/// `tel:` and `javascript:` links are skipped, as is the page itself. Order
/// follows the document and duplicates are dropped.
pub fn extract_candidate_links(markup: &str, base: &Url, limit: usize) -> Vec<String> {
    let document = Html::parse_document(markup);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let mut page = base.clone();
    page.set_fragment(None);
    seen.insert(page.to_string());

    for node in document.tree.root().descendants() {
        if links.len() >= limit {
            break;
        }
        let Some(element) = node.value().as_element() else {
            continue;
        };
        for attr in LINK_ATTRIBUTES {
            if *attr == "href" && !matches!(element.name(), "a" | "area") {
                continue;
            }
            let Some(raw) = element.attr(attr).map(str::trim) else {
                continue;
            };
            if raw.is_empty() || raw.starts_with('#') {
                continue;
            }
            let lower = raw.to_lowercase();
            if SKIPPED_SCHEMES.iter().any(|s| lower.starts_with(s)) {
                continue;
            }
            let Ok(mut resolved) = base.join(raw) else {
                continue;
            };
            if !matches!(resolved.scheme(), "http" | "https") {
                continue;
            }
            resolved.set_fragment(None);
            let resolved = resolved.to_string();
            if seen.insert(resolved.clone()) {
                links.push(resolved);
            }
            if links.len() >= limit {
                break;
            }
        }
    }

    links
}
