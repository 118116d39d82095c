//! Phase 2: repeat the direct scan under rotating client identities.

use async_trait::async_trait;
use tracing::debug;

use super::{prefixed, scan_with_redirects};
use crate::error::{ProbeError, Result};
use crate::http_client::identity_rotation;
use crate::pipeline::{Phase, PhaseContext, PhaseId, PhaseOutcome};

pub struct IdentityVariationPhase;

#[async_trait]
impl Phase for IdentityVariationPhase {
    fn id(&self) -> PhaseId {
        PhaseId::IdentityVariation
    }

    async fn run(&self, ctx: &PhaseContext<'_>) -> Result<PhaseOutcome> {
        let name = self.id().name();
        let sample = ctx.settings.pipeline.rotation_sample;
        let mut notes = Vec::new();
        let mut age_gate = false;

        for identity in identity_rotation() {
            let page = match ctx
                .http
                .fetch_page(
                    ctx.target.normalized(),
                    &identity,
                    ctx.settings.http.request_timeout,
                )
                .await
            {
                Ok(page) => page,
                // A different user agent will not fix an unreachable host.
                Err(e @ (ProbeError::Transport(_) | ProbeError::Timeout(_))) => return Err(e),
                Err(e) => {
                    notes.push(format!("{}: {}", identity.name, e));
                    continue;
                }
            };

            if !page.is_success() {
                notes.push(format!("{}: HTTP {}", identity.name, page.status.as_u16()));
                continue;
            }

            let scan = scan_with_redirects(ctx, &page, &identity, sample).await;
            age_gate |= scan.age_gate;
            notes.extend(
                scan.notes
                    .into_iter()
                    .map(|n| format!("{}: {}", identity.name, n)),
            );

            if !scan.evidence.is_empty() {
                debug!(identity = %identity.name, "Identity variation found evidence");
                let detail = if scan.via_redirect {
                    format!("{}+redirect", identity.name)
                } else {
                    identity.name.clone()
                };
                return Ok(PhaseOutcome::hit(
                    scan.evidence,
                    format!("{}: evidence as {}", name, identity.name),
                )
                .with_detail(detail)
                .with_notes(prefixed(name, notes))
                .with_age_gate(age_gate));
            }
            notes.push(format!("{}: no evidence", identity.name));
        }

        Ok(PhaseOutcome::miss(format!(
            "{}: no evidence under any rotated identity",
            name
        ))
        .with_notes(prefixed(name, notes))
        .with_age_gate(age_gate))
    }
}
