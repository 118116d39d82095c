//! Phase 5: mine the plain text of every page seen so far.
//!
//! Accepts weaker signals than the other phases. Brand mentions and age
//! gates produce low-confidence matches with no evidence URL.

use std::collections::BTreeSet;

use async_trait::async_trait;

use super::prefixed;
use crate::error::{ProbeError, Result};
use crate::evidence::{age_gate_indicators, flatten_text, mentions_brand, references_in_text};
use crate::http_client::identity_rotation;
use crate::pipeline::{Phase, PhaseContext, PhaseId, PhaseOutcome, SeenPage};

pub struct TextMiningPhase;

impl TextMiningPhase {
    /// Pages from earlier phases, or a fresh fetch when none succeeded.
    async fn pages(&self, ctx: &PhaseContext<'_>, notes: &mut Vec<String>) -> Result<Vec<SeenPage>> {
        let seen = ctx.seen_pages();
        if !seen.is_empty() {
            return Ok(seen);
        }

        let mut last_error = None;
        for identity in identity_rotation() {
            match ctx
                .http
                .fetch_page(
                    ctx.target.normalized(),
                    &identity,
                    ctx.settings.http.request_timeout,
                )
                .await
            {
                Ok(page) => {
                    if !page.is_success() {
                        notes.push(format!("{}: HTTP {}", identity.name, page.status.as_u16()));
                    }
                    // Error pages still carry text worth mining.
                    ctx.remember_page(&page.final_url, &page.body);
                    return Ok(ctx.seen_pages());
                }
                Err(e @ (ProbeError::Transport(_) | ProbeError::Timeout(_))) => return Err(e),
                Err(e) => last_error = Some(e),
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl Phase for TextMiningPhase {
    fn id(&self) -> PhaseId {
        PhaseId::TextMining
    }

    async fn run(&self, ctx: &PhaseContext<'_>) -> Result<PhaseOutcome> {
        let name = self.id().name();
        let signature = ctx.signature();
        let mining = &ctx.settings.text_mining;
        let mut notes = Vec::new();

        let pages = self.pages(ctx, &mut notes).await?;
        let texts: Vec<String> = pages.iter().map(|p| flatten_text(&p.body)).collect();
        notes.push(format!("mining text of {} page(s)", texts.len()));

        let mut references = BTreeSet::new();
        for text in &texts {
            references.extend(references_in_text(text, signature));
        }

        let mut indicators: Vec<&'static str> = Vec::new();
        for text in &texts {
            for phrase in age_gate_indicators(text) {
                if !indicators.contains(&phrase) {
                    indicators.push(phrase);
                }
            }
        }
        let age_gate = !indicators.is_empty();
        if age_gate {
            notes.push(format!("age-gate phrases: {}", indicators.join(", ")));
        }

        if !references.is_empty() {
            return Ok(PhaseOutcome::hit(
                references,
                format!("{}: target reference in page text", name),
            )
            .with_detail("text_reference")
            .with_notes(prefixed(name, notes))
            .with_age_gate(age_gate));
        }

        if mining.accept_brand_mentions && texts.iter().any(|t| mentions_brand(t, signature)) {
            return Ok(PhaseOutcome::inferred(format!(
                "{}: '{}' mentioned without a link (low confidence)",
                name,
                signature.brand()
            ))
            .with_detail("brand_mention")
            .with_notes(prefixed(name, notes))
            .with_age_gate(age_gate));
        }

        let threshold = mining.age_gate_min_indicators;
        if threshold > 0 && indicators.len() >= threshold {
            return Ok(PhaseOutcome::inferred(format!(
                "{}: {} age-gate phrase(s) without a link (low confidence)",
                name,
                indicators.len()
            ))
            .with_detail("age_gate")
            .with_notes(prefixed(name, notes))
            .with_age_gate(age_gate));
        }

        Ok(
            PhaseOutcome::miss(format!("{}: no textual signal", name))
                .with_notes(prefixed(name, notes))
                .with_age_gate(age_gate),
        )
    }
}
