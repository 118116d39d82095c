//! The five detection strategies, cheapest first.

mod alternate_paths;
mod direct;
mod identity;
mod interactive;
mod text_mining;

pub use alternate_paths::AlternatePathsPhase;
pub use direct::DirectScanPhase;
pub use identity::IdentityVariationPhase;
pub use interactive::InteractivePhase;
pub use text_mining::TextMiningPhase;

use std::collections::BTreeSet;

use tracing::debug;
use url::Url;

use super::{Phase, PhaseContext};
use crate::config::LinkSample;
use crate::evidence::{
    evidence_url, extract_candidate_links, flatten_text, has_age_gate_signal, scan_page,
};
use crate::http_client::{ClientIdentity, PageResponse};
use crate::models::ChainStop;

/// The standard phase line-up.
pub fn default_phases() -> Vec<Box<dyn Phase>> {
    vec![
        Box::new(DirectScanPhase),
        Box::new(IdentityVariationPhase),
        Box::new(AlternatePathsPhase),
        Box::new(InteractivePhase),
        Box::new(TextMiningPhase),
    ]
}

/// Evidence found in one fetched page.
#[derive(Debug, Default)]
pub(crate) struct PageScan {
    pub evidence: BTreeSet<String>,
    pub via_redirect: bool,
    pub age_gate: bool,
    pub notes: Vec<String>,
}

/// Scan a page body and, if it names no target URL, follow a sample of its
/// outbound links through the redirect resolver.
pub(crate) async fn scan_with_redirects(
    ctx: &PhaseContext<'_>,
    page: &PageResponse,
    identity: &ClientIdentity,
    sample: LinkSample,
) -> PageScan {
    let signature = ctx.signature();
    ctx.remember_page(&page.final_url, &page.body);

    let mut scan = PageScan {
        evidence: scan_page(&page.body, signature),
        age_gate: has_age_gate_signal(&flatten_text(&page.body)),
        ..PageScan::default()
    };
    if let Some(url) = evidence_url(&page.final_url, signature) {
        scan.evidence.insert(url);
    }
    if !scan.evidence.is_empty() || sample.links == 0 {
        return scan;
    }

    let Ok(base) = Url::parse(&page.final_url) else {
        return scan;
    };
    let links = extract_candidate_links(&page.body, &base, sample.links);
    scan.notes.push(format!(
        "following {} candidate link(s) up to {} hop(s)",
        links.len(),
        sample.hops
    ));

    for link in links {
        let chain = ctx
            .resolver
            .resolve_as(&link, identity, sample.hops, sample.hop_timeout, |u| {
                signature.is_evidence(u)
            })
            .await;
        debug!(link = %link, hops = chain.hops(), stop = ?chain.stop(), "Resolved candidate link");

        match chain.stop() {
            ChainStop::Timeout => scan.notes.push(format!("{}: hop timed out", link)),
            ChainStop::Transport { message } => {
                scan.notes.push(format!("{}: {}", link, message))
            }
            _ => {}
        }
        if let Some(url) = evidence_url(chain.terminal(), signature) {
            scan.evidence.insert(url);
        }
    }

    scan.via_redirect = !scan.evidence.is_empty();
    scan
}

/// Tag phase-internal notes with the phase name.
pub(crate) fn prefixed(name: &str, notes: Vec<String>) -> Vec<String> {
    notes
        .into_iter()
        .map(|note| format!("{}: {}", name, note))
        .collect()
}
