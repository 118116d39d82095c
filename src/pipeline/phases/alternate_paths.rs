//! Phase 3: common sub-paths that some aggregators serve link lists from.

use async_trait::async_trait;

use super::prefixed;
use crate::error::{ProbeError, Result};
use crate::evidence::{flatten_text, has_age_gate_signal, scan_page};
use crate::http_client::identity_rotation;
use crate::pipeline::{Availability, Phase, PhaseContext, PhaseId, PhaseOutcome};

pub struct AlternatePathsPhase;

#[async_trait]
impl Phase for AlternatePathsPhase {
    fn id(&self) -> PhaseId {
        PhaseId::AlternatePaths
    }

    fn availability(&self, ctx: &PhaseContext<'_>) -> Availability {
        if ctx.settings.pipeline.alternate_paths.is_empty() {
            Availability::Skip("no alternate paths configured".to_string())
        } else {
            Availability::Ready
        }
    }

    async fn run(&self, ctx: &PhaseContext<'_>) -> Result<PhaseOutcome> {
        let name = self.id().name();
        let signature = ctx.signature();
        let identity = identity_rotation()
            .into_iter()
            .next()
            .unwrap_or_else(|| ctx.http.default_identity().clone());
        let mut notes = Vec::new();
        let mut age_gate = false;

        for path in &ctx.settings.pipeline.alternate_paths {
            let Some(url) = ctx.target.join_path(path) else {
                continue;
            };
            if url == ctx.target.normalized() {
                continue;
            }

            let page = match ctx
                .http
                .fetch_page(&url, &identity, ctx.settings.http.request_timeout)
                .await
            {
                Ok(page) => page,
                // The host is unreachable, no other path will fare better.
                Err(e @ ProbeError::Transport(_)) => return Err(e),
                Err(e) => {
                    notes.push(format!("{}: {}", path, e));
                    continue;
                }
            };
            if !page.is_success() {
                notes.push(format!("{}: HTTP {}", path, page.status.as_u16()));
                continue;
            }

            ctx.remember_page(&page.final_url, &page.body);
            age_gate |= has_age_gate_signal(&flatten_text(&page.body));
            let evidence = scan_page(&page.body, signature);
            if !evidence.is_empty() {
                return Ok(PhaseOutcome::hit(
                    evidence,
                    format!("{}: evidence at {}", name, path),
                )
                .with_detail(path.trim_start_matches('/'))
                .with_notes(prefixed(name, notes))
                .with_age_gate(age_gate));
            }
            notes.push(format!("{}: no evidence", path));
        }

        Ok(PhaseOutcome::miss(format!(
            "{}: {} path(s) tried without evidence",
            name,
            ctx.settings.pipeline.alternate_paths.len()
        ))
        .with_notes(prefixed(name, notes))
        .with_age_gate(age_gate))
    }
}
