//! The contract every detection phase implements.

use std::collections::BTreeSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::browser::BrowserLauncher;
use crate::config::{PhaseBudgets, Settings};
use crate::error::Result;
use crate::evidence::TargetSignature;
use crate::http_client::HttpClient;
use crate::models::{Confidence, ProbeTarget};
use crate::platforms::PlatformDispatcher;
use crate::redirect::RedirectResolver;

/// Phases in the order the scheduler runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseId {
    DirectScan,
    IdentityVariation,
    AlternatePaths,
    Interactive,
    TextMining,
}

impl PhaseId {
    pub const ALL: [PhaseId; 5] = [
        PhaseId::DirectScan,
        PhaseId::IdentityVariation,
        PhaseId::AlternatePaths,
        PhaseId::Interactive,
        PhaseId::TextMining,
    ];

    /// Name used in `method`, `phase_reached` and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            PhaseId::DirectScan => "phase1_direct_scan",
            PhaseId::IdentityVariation => "phase2_identity_variation",
            PhaseId::AlternatePaths => "phase3_alternate_paths",
            PhaseId::Interactive => "phase4_interactive",
            PhaseId::TextMining => "phase5_text_mining",
        }
    }

    pub fn budget(&self, budgets: &PhaseBudgets) -> Duration {
        match self {
            PhaseId::DirectScan => budgets.direct,
            PhaseId::IdentityVariation => budgets.identity,
            PhaseId::AlternatePaths => budgets.alternate_paths,
            PhaseId::Interactive => budgets.interactive,
            PhaseId::TextMining => budgets.text_mining,
        }
    }
}

impl std::fmt::Display for PhaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a phase hands back to the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseOutcome {
    pub success: bool,
    pub evidence_urls: BTreeSet<String>,
    /// Summary line appended to the result's diagnostics.
    pub diagnostic_note: String,
    /// Extra diagnostics recorded before the summary line.
    pub notes: Vec<String>,
    /// Non-fatal failures met along the way.
    pub errors: Vec<String>,
    /// Appended to the phase name in `method` (e.g. `redirect`).
    pub detail: Option<String>,
    pub confidence: Confidence,
    pub age_gate_detected: bool,
}

impl PhaseOutcome {
    pub fn miss(note: impl Into<String>) -> Self {
        Self {
            success: false,
            evidence_urls: BTreeSet::new(),
            diagnostic_note: note.into(),
            notes: Vec::new(),
            errors: Vec::new(),
            detail: None,
            confidence: Confidence::High,
            age_gate_detected: false,
        }
    }

    pub fn hit(urls: BTreeSet<String>, note: impl Into<String>) -> Self {
        Self {
            success: true,
            evidence_urls: urls,
            ..Self::miss(note)
        }
    }

    /// A match that rests on text alone and carries no URL.
    pub fn inferred(note: impl Into<String>) -> Self {
        Self {
            success: true,
            confidence: Confidence::Low,
            ..Self::miss(note)
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_age_gate(mut self, detected: bool) -> Self {
        self.age_gate_detected = detected;
        self
    }
}

/// Whether a phase can run in this environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Ready,
    Skip(String),
}

/// A page body fetched by some phase during the current call.
#[derive(Debug, Clone)]
pub struct SeenPage {
    pub url: String,
    pub body: String,
}

/// Everything a phase may use. Built fresh for each detection call.
pub struct PhaseContext<'a> {
    pub target: &'a ProbeTarget,
    pub settings: &'a Settings,
    pub http: &'a HttpClient,
    pub resolver: &'a RedirectResolver,
    pub browser: Option<&'a dyn BrowserLauncher>,
    pub platforms: PlatformDispatcher,
    pages: Mutex<Vec<SeenPage>>,
}

impl<'a> PhaseContext<'a> {
    pub fn new(
        target: &'a ProbeTarget,
        settings: &'a Settings,
        http: &'a HttpClient,
        resolver: &'a RedirectResolver,
        browser: Option<&'a dyn BrowserLauncher>,
    ) -> Self {
        Self {
            target,
            settings,
            http,
            resolver,
            browser,
            platforms: PlatformDispatcher::default(),
            pages: Mutex::new(Vec::new()),
        }
    }

    pub fn signature(&self) -> &TargetSignature {
        &self.settings.signature
    }

    /// Keep a fetched body for later text mining.
    pub fn remember_page(&self, url: &str, body: &str) {
        if let Ok(mut pages) = self.pages.lock() {
            if !pages.iter().any(|p| p.url == url && p.body == body) {
                pages.push(SeenPage {
                    url: url.to_string(),
                    body: body.to_string(),
                });
            }
        }
    }

    pub fn seen_pages(&self) -> Vec<SeenPage> {
        self.pages.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

/// One detection strategy.
#[async_trait]
pub trait Phase: Send + Sync {
    fn id(&self) -> PhaseId;

    fn availability(&self, _ctx: &PhaseContext<'_>) -> Availability {
        Availability::Ready
    }

    /// Run the phase. Errors are recorded by the scheduler, never
    /// propagated further.
    async fn run(&self, ctx: &PhaseContext<'_>) -> Result<PhaseOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_names_are_ordered() {
        let names: Vec<&str> = PhaseId::ALL.iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            vec![
                "phase1_direct_scan",
                "phase2_identity_variation",
                "phase3_alternate_paths",
                "phase4_interactive",
                "phase5_text_mining"
            ]
        );
    }

    #[test]
    fn test_inferred_outcome_is_low_confidence_without_urls() {
        let outcome = PhaseOutcome::inferred("brand mentioned").with_detail("brand_mention");
        assert!(outcome.success);
        assert!(outcome.evidence_urls.is_empty());
        assert_eq!(outcome.confidence, Confidence::Low);
        assert_eq!(outcome.detail.as_deref(), Some("brand_mention"));
    }
}
