//! Evidence extraction.
//!
//! Pure functions over page text and markup. Nothing here performs I/O, and
//! an empty result is a valid negative, never an error.

mod age_gate;
mod signature;
mod text;
mod urls;

pub use age_gate::{age_gate_indicators, has_age_gate_signal, AGE_GATE_PHRASES};
pub use signature::{TargetSignature, DEFAULT_EXCLUDED_SEGMENTS};
pub use text::{extract_candidate_links, flatten_text, mentions_brand};
pub use urls::{extract_direct_urls, extract_embedded_references, references_in_text};

use std::collections::BTreeSet;

/// Normalized form of `url` when it is usable evidence.
pub fn evidence_url(url: &str, signature: &TargetSignature) -> Option<String> {
    urls::normalize_evidence(url, signature)
}

/// Direct URLs plus embedded references found in a page body.
pub fn scan_page(markup: &str, signature: &TargetSignature) -> BTreeSet<String> {
    let mut found = extract_direct_urls(markup, signature);
    found.extend(extract_embedded_references(markup, signature));
    found
}
