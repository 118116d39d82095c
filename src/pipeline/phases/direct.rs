//! Phase 1: one plain fetch of the target page.

use async_trait::async_trait;
use tracing::debug;

use super::{prefixed, scan_with_redirects};
use crate::error::Result;
use crate::pipeline::{Phase, PhaseContext, PhaseId, PhaseOutcome};

pub struct DirectScanPhase;

#[async_trait]
impl Phase for DirectScanPhase {
    fn id(&self) -> PhaseId {
        PhaseId::DirectScan
    }

    async fn run(&self, ctx: &PhaseContext<'_>) -> Result<PhaseOutcome> {
        let name = self.id().name();
        let identity = ctx.http.default_identity();
        let page = ctx
            .http
            .fetch_page(
                ctx.target.normalized(),
                identity,
                ctx.settings.http.request_timeout,
            )
            .await?;

        if !page.is_success() {
            debug!(status = page.status.as_u16(), "Target refused default identity");
            return Ok(PhaseOutcome::miss(format!(
                "{}: HTTP {} for default identity",
                name,
                page.status.as_u16()
            )));
        }

        let scan =
            scan_with_redirects(ctx, &page, identity, ctx.settings.pipeline.direct_sample).await;

        let outcome = if scan.evidence.is_empty() {
            PhaseOutcome::miss(format!("{}: no evidence in page or sampled links", name))
        } else if scan.via_redirect {
            PhaseOutcome::hit(
                scan.evidence,
                format!("{}: evidence behind redirect chain", name),
            )
            .with_detail("redirect")
        } else {
            PhaseOutcome::hit(scan.evidence, format!("{}: evidence in page body", name))
        };

        Ok(outcome.with_notes(prefixed(name, scan.notes)).with_age_gate(scan.age_gate))
    }
}
