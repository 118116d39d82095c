//! Phase scheduler: runs phases in order until one matches.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{FutureExt, StreamExt};
use tracing::{debug, info, info_span, warn, Instrument};

use super::phases::default_phases;
use super::{Availability, Phase, PhaseContext, PhaseOutcome};
use crate::browser::BrowserLauncher;
use crate::config::Settings;
use crate::error::{ProbeError, Result};
use crate::http_client::HttpClient;
use crate::models::{Confidence, DetectionResult, ProbeTarget};
use crate::redirect::RedirectResolver;

/// Runs the detection pipeline.
///
/// Holds only immutable state, so one detector can serve many concurrent
/// calls. Nothing learned during one call is visible to another.
pub struct Detector {
    settings: Arc<Settings>,
    http: HttpClient,
    resolver: RedirectResolver,
    browser: Option<Arc<dyn BrowserLauncher>>,
    phases: Vec<Box<dyn Phase>>,
}

enum PhaseEnd {
    Matched,
    Continue,
    BudgetExhausted,
}

impl Detector {
    /// Build a detector with the standard phases and, when enabled, the
    /// chromiumoxide rendering engine.
    pub fn new(settings: Settings) -> Result<Self> {
        let http = HttpClient::from_settings(&settings.http)?;
        let browser = default_launcher(&settings);
        Ok(Self {
            resolver: RedirectResolver::new(http.clone()),
            http,
            browser,
            phases: default_phases(),
            settings: Arc::new(settings),
        })
    }

    /// Replace the rendering engine (or remove it with `None`).
    pub fn with_browser(mut self, browser: Option<Arc<dyn BrowserLauncher>>) -> Self {
        self.browser = browser;
        self
    }

    /// Replace the phase line-up.
    pub fn with_phases(mut self, phases: Vec<Box<dyn Phase>>) -> Self {
        self.phases = phases;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Whether phase 4 can open a rendering session at all.
    pub fn has_browser(&self) -> bool {
        self.browser
            .as_ref()
            .is_some_and(|launcher| launcher.unavailable_reason().is_none())
    }

    /// Probe one URL. Never fails: an invalid URL yields an unmatched result
    /// carrying the parse error.
    pub async fn detect(&self, url: &str) -> DetectionResult {
        match ProbeTarget::parse(url) {
            Ok(target) => self.detect_target(&target).await,
            Err(e) => DetectionResult::rejected(url.trim(), e.to_string()),
        }
    }

    /// Probe a parsed target, retrying the whole pipeline up to
    /// `pipeline.retries` times after an unmatched run with errors.
    pub async fn detect_target(&self, target: &ProbeTarget) -> DetectionResult {
        let mut result = DetectionResult::new(target.normalized());
        let span = info_span!("detect", probe_id = %result.probe_id, target = %target);

        async {
            let started = Instant::now();
            let deadline = started + self.settings.pipeline.global_budget;
            let attempts = self.settings.pipeline.retries + 1;

            for attempt in 1..=attempts {
                if attempt > 1 {
                    result.note(format!(
                        "attempt {} of {}: retrying after errors",
                        attempt, attempts
                    ));
                }
                let errors_before = result.errors.len();
                self.run_pipeline(target, &mut result, deadline).await;

                let retryable = !result.matched
                    && !result.budget_exhausted
                    && result.errors.len() > errors_before;
                if !retryable {
                    break;
                }
            }

            if !result.matched {
                result.note("done: unmatched");
            }
            result.elapsed_ms = started.elapsed().as_millis() as u64;
            info!(
                matched = result.matched,
                method = ?result.method,
                elapsed_ms = result.elapsed_ms,
                "Detection finished"
            );
        }
        .instrument(span)
        .await;

        result
    }

    /// Probe many URLs, at most `concurrency` at a time.
    ///
    /// Results come back in input order, one per input. Fails only when the
    /// batch exceeds `server.max_batch`.
    pub async fn detect_batch(
        &self,
        urls: &[String],
        concurrency: usize,
    ) -> Result<Vec<DetectionResult>> {
        let max = self.settings.server.max_batch;
        if urls.len() > max {
            return Err(ProbeError::BatchTooLarge {
                got: urls.len(),
                max,
            });
        }

        let results = futures::stream::iter(urls.to_vec())
            .map(|url| async move { self.detect(&url).await })
            .buffered(concurrency.max(1))
            .collect()
            .await;
        Ok(results)
    }

    async fn run_pipeline(
        &self,
        target: &ProbeTarget,
        result: &mut DetectionResult,
        deadline: Instant,
    ) {
        let ctx = PhaseContext::new(
            target,
            &self.settings,
            &self.http,
            &self.resolver,
            self.browser.as_deref(),
        );

        for phase in &self.phases {
            match self.run_phase(phase.as_ref(), &ctx, result, deadline).await {
                PhaseEnd::Matched => return,
                PhaseEnd::Continue => {}
                PhaseEnd::BudgetExhausted => {
                    result.budget_exhausted = true;
                    result.note(format!(
                        "global budget of {}s exhausted, stopping early",
                        self.settings.pipeline.global_budget.as_secs()
                    ));
                    return;
                }
            }
        }
    }

    async fn run_phase(
        &self,
        phase: &dyn Phase,
        ctx: &PhaseContext<'_>,
        result: &mut DetectionResult,
        deadline: Instant,
    ) -> PhaseEnd {
        let id = phase.id();
        let name = id.name();

        let now = Instant::now();
        if now >= deadline {
            result.note(format!("{}: not started, no budget left", name));
            return PhaseEnd::BudgetExhausted;
        }

        if let Availability::Skip(reason) = phase.availability(ctx) {
            debug!(phase = name, reason = %reason, "Skipping phase");
            result.note(format!("{}: skipped ({})", name, reason));
            return PhaseEnd::Continue;
        }

        result.phase_reached = name.to_string();
        let budget = id.budget(&self.settings.pipeline.budgets).min(deadline - now);
        debug!(phase = name, budget_ms = budget.as_millis() as u64, "Running phase");

        let run = AssertUnwindSafe(phase.run(ctx)).catch_unwind();
        let outcome = match tokio::time::timeout(budget, run).await {
            Ok(Ok(Ok(outcome))) => outcome,
            Ok(Ok(Err(e))) => {
                warn!(phase = name, error = %e, "Phase failed");
                result.record_error(format!("{}: {}", name, e));
                result.note(format!("{}: failed", name));
                return PhaseEnd::Continue;
            }
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                warn!(phase = name, "Phase panicked: {}", message);
                result.record_error(format!("{}: panicked: {}", name, message));
                result.note(format!("{}: failed", name));
                return PhaseEnd::Continue;
            }
            Err(_) => {
                warn!(phase = name, "Phase timed out");
                result.record_error(format!(
                    "{}: timed out after {}",
                    name,
                    format_duration(budget)
                ));
                result.note(format!("{}: abandoned at time limit", name));
                return if Instant::now() >= deadline {
                    PhaseEnd::BudgetExhausted
                } else {
                    PhaseEnd::Continue
                };
            }
        };

        self.merge(name, outcome, result)
    }

    fn merge(&self, name: &str, outcome: PhaseOutcome, result: &mut DetectionResult) -> PhaseEnd {
        result.diagnostics.extend(outcome.notes);
        result.errors.extend(outcome.errors);
        result.age_gate_detected |= outcome.age_gate_detected;

        if outcome.success
            && outcome.evidence_urls.is_empty()
            && outcome.confidence == Confidence::High
        {
            result.note(outcome.diagnostic_note);
            result.record_error(format!("{}: reported a match without evidence", name));
            return PhaseEnd::Continue;
        }

        result.note(outcome.diagnostic_note);
        if !outcome.success {
            return PhaseEnd::Continue;
        }

        let method = match outcome.detail {
            Some(detail) => format!("{}:{}", name, detail),
            None => name.to_string(),
        };
        info!(method = %method, urls = outcome.evidence_urls.len(), "Phase matched");
        result.record_match(method, outcome.evidence_urls, outcome.confidence);
        PhaseEnd::Matched
    }
}

#[cfg(feature = "browser")]
fn default_launcher(settings: &Settings) -> Option<Arc<dyn BrowserLauncher>> {
    if !settings.browser.enabled {
        return None;
    }
    let launcher: Arc<dyn BrowserLauncher> =
        Arc::new(crate::browser::ChromiumLauncher::new(settings.browser.clone()));
    Some(launcher)
}

#[cfg(not(feature = "browser"))]
fn default_launcher(_settings: &Settings) -> Option<Arc<dyn BrowserLauncher>> {
    None
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn format_duration(d: Duration) -> String {
    if d.as_secs() > 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}
