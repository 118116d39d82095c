//! Phase 4: render the page, interact with it, and read the settled DOM.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::prefixed;
use crate::browser::{launch_with_fallback, BrowserSession, SessionGuard, HUMAN_SCROLL_SCRIPT};
use crate::error::Result;
use crate::evidence::{evidence_url, flatten_text, has_age_gate_signal, scan_page};
use crate::pipeline::{Availability, Phase, PhaseContext, PhaseId, PhaseOutcome};
use crate::platforms::PlatformProfile;

/// Buttons that dismiss cookie banners and age interstitials.
const OVERLAY_TEXTS: &[&str] = &[
    "Accept all",
    "Accept",
    "I agree",
    "Agree",
    "Got it",
    "I am 18",
    "I'm 18",
    "I am over 18",
];

const CLICKABLE: &str = "button, a, [role='button'], input[type='button'], input[type='submit']";

pub struct InteractivePhase;

#[async_trait]
impl Phase for InteractivePhase {
    fn id(&self) -> PhaseId {
        PhaseId::Interactive
    }

    fn availability(&self, ctx: &PhaseContext<'_>) -> Availability {
        match ctx.browser {
            None => Availability::Skip("no rendering engine available".to_string()),
            Some(launcher) => match launcher.unavailable_reason() {
                Some(reason) => Availability::Skip(reason),
                None => Availability::Ready,
            },
        }
    }

    async fn run(&self, ctx: &PhaseContext<'_>) -> Result<PhaseOutcome> {
        let name = self.id().name();
        let Some(launcher) = ctx.browser else {
            return Ok(PhaseOutcome::miss(format!(
                "{}: no rendering engine available",
                name
            )));
        };

        let profile = ctx.platforms.select(ctx.target.host()).clone();
        info!(platform = profile.name, "Starting interactive probe");

        let (session, launch_failures) = launch_with_fallback(launcher).await;
        let mut errors = prefixed(name, launch_failures);
        let mut guard = match session {
            Ok(session) => SessionGuard::new(session),
            Err(e) => {
                return Ok(PhaseOutcome::miss(format!(
                    "{}: rendering engine could not start ({})",
                    name, e
                ))
                .with_errors(errors));
            }
        };

        let mut probe = Probe::new(ctx, &profile);
        let result = match guard.session() {
            Ok(session) => probe.run(session).await,
            Err(e) => Err(e),
        };
        guard.close().await;

        let mut notes = vec![format!("platform profile '{}'", profile.name)];
        notes.append(&mut probe.notes);
        let notes = prefixed(name, notes);

        if let Err(e) = &result {
            debug!(error = %e, "Interactive probe failed");
            errors.push(format!("{}: {}", name, e));
        }

        let outcome = if !probe.evidence.is_empty() {
            PhaseOutcome::hit(
                std::mem::take(&mut probe.evidence),
                format!("{}: evidence via {} profile", name, profile.name),
            )
            .with_detail(probe.detail.unwrap_or(profile.name).to_string())
        } else if result.is_err() {
            PhaseOutcome::miss(format!("{}: rendering failed", name))
        } else {
            PhaseOutcome::miss(format!("{}: no evidence after rendering", name))
        };

        Ok(outcome
            .with_notes(notes)
            .with_errors(errors)
            .with_age_gate(probe.age_gate))
    }
}

/// State for one rendering session.
struct Probe<'a, 'c> {
    ctx: &'a PhaseContext<'c>,
    profile: &'a PlatformProfile,
    evidence: BTreeSet<String>,
    detail: Option<&'static str>,
    notes: Vec<String>,
    age_gate: bool,
}

impl<'a, 'c> Probe<'a, 'c> {
    fn new(ctx: &'a PhaseContext<'c>, profile: &'a PlatformProfile) -> Self {
        Self {
            ctx,
            profile,
            evidence: BTreeSet::new(),
            detail: None,
            notes: Vec::new(),
            age_gate: false,
        }
    }

    fn capped(&self, wait: Duration) -> Duration {
        wait.min(self.ctx.settings.pipeline.max_settle)
    }

    async fn settle(&self, wait: Duration) {
        let wait = self.capped(wait);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    async fn run(&mut self, session: &mut dyn BrowserSession) -> Result<()> {
        let nav_timeout = Duration::from_secs(self.ctx.settings.browser.timeout);

        if let Some(warmup) = self.profile.warmup_url {
            match session.navigate(warmup, nav_timeout).await {
                Ok(()) => self.settle(Duration::from_secs(2)).await,
                Err(e) => self.notes.push(format!("warm-up visit failed: {}", e)),
            }
        }

        session
            .navigate(self.ctx.target.normalized(), nav_timeout)
            .await?;
        session.wait_until_ready(nav_timeout).await;
        self.settle(self.profile.settle).await;

        self.dismiss_overlays(session).await;

        if self.profile.human_interaction {
            if let Err(e) = session.evaluate(HUMAN_SCROLL_SCRIPT).await {
                self.notes.push(format!("scroll simulation failed: {}", e));
            }
        }

        self.expand_collapsed(session).await;

        if self.collect(session, "rendered").await? {
            return Ok(());
        }

        self.click_brand_card(session).await?;
        Ok(())
    }

    async fn dismiss_overlays(&mut self, session: &mut dyn BrowserSession) {
        match session.click_by_text(CLICKABLE, OVERLAY_TEXTS).await {
            Ok(true) => {
                self.notes.push("dismissed an overlay".to_string());
                self.settle(Duration::from_secs(1)).await;
            }
            Ok(false) => {}
            Err(e) => self.notes.push(format!("overlay probe failed: {}", e)),
        }
    }

    async fn expand_collapsed(&mut self, session: &mut dyn BrowserSession) {
        let mut rounds = 0;
        while rounds < self.profile.max_expand_rounds {
            match session
                .click_by_text(CLICKABLE, &self.profile.expand_texts)
                .await
            {
                Ok(true) => {
                    rounds += 1;
                    self.settle(Duration::from_secs(1)).await;
                }
                _ => break,
            }
        }
        if rounds > 0 {
            self.notes.push(format!("expanded collapsed links {} time(s)", rounds));
        }
    }

    /// Read the DOM, current URL and observed redirects. True when evidence
    /// was found.
    async fn collect(
        &mut self,
        session: &mut dyn BrowserSession,
        stage: &'static str,
    ) -> Result<bool> {
        let ctx = self.ctx;
        let signature = ctx.signature();

        let content = session.content().await?;
        ctx.remember_page(ctx.target.normalized(), &content);
        self.age_gate |= has_age_gate_signal(&flatten_text(&content));
        self.evidence.extend(scan_page(&content, signature));

        if let Ok(Some(url)) = session.current_url().await {
            if let Some(url) = evidence_url(&url, signature) {
                self.notes.push(format!("navigated to {}", url));
                self.evidence.insert(url);
            }
        }

        for url in session.observed_redirects().await {
            if let Some(url) = evidence_url(&url, signature) {
                self.notes.push(format!("redirect observed to {}", url));
                self.evidence.insert(url);
            }
        }

        if !self.evidence.is_empty() && self.detail.is_none() {
            self.detail = Some(stage);
        }
        Ok(!self.evidence.is_empty())
    }

    /// Click a link card naming the brand, confirm any interstitial, and see
    /// where that leads.
    async fn click_brand_card(&mut self, session: &mut dyn BrowserSession) -> Result<()> {
        let profile = self.profile;
        let brand = self.ctx.signature().brand().to_string();
        let selector = profile.link_selector_group();

        let clicked = match session.click_by_text(&selector, &[brand.as_str()]).await {
            Ok(clicked) => clicked,
            Err(e) => {
                self.notes.push(format!("card click failed: {}", e));
                false
            }
        };
        if !clicked {
            self.notes.push("no link card names the brand".to_string());
            return Ok(());
        }
        self.notes.push("clicked brand link card".to_string());
        self.settle(profile.post_click_wait).await;

        if let Ok(true) = session
            .click_by_text(CLICKABLE, &profile.consent_texts)
            .await
        {
            self.notes.push("confirmed interstitial".to_string());
            self.settle(profile.post_click_wait).await;
        }

        self.collect(session, "card_click").await?;
        Ok(())
    }
}
