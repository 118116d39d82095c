//! Rendering engine collaborator.
//!
//! The interactive phase only talks to [`BrowserLauncher`] and
//! [`BrowserSession`]. The chromiumoxide implementation lives behind the
//! `browser` feature; without it no launcher is available and the phase is
//! skipped.

#[cfg(feature = "browser")]
mod chromium;
mod config;
mod scripts;

#[cfg(feature = "browser")]
pub use chromium::ChromiumLauncher;
pub use config::BrowserEngineConfig;
pub use scripts::{
    click_by_text_script, HUMAN_SCROLL_SCRIPT, STEALTH_SCRIPTS, WAIT_FOR_READY_SCRIPT,
};

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{ProbeError, Result};

/// Chrome argument sets, tried in order until one launches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchProfile {
    Optimized,
    Basic,
}

impl LaunchProfile {
    pub const FALLBACK_ORDER: [LaunchProfile; 2] = [LaunchProfile::Optimized, LaunchProfile::Basic];

    pub fn args(&self) -> &'static [&'static str] {
        match self {
            LaunchProfile::Optimized => &[
                "--no-sandbox",
                "--disable-setuid-sandbox",
                "--disable-dev-shm-usage",
                "--disable-accelerated-2d-canvas",
                "--no-first-run",
                "--no-zygote",
                "--disable-gpu",
                "--disable-blink-features=AutomationControlled",
            ],
            LaunchProfile::Basic => &["--no-sandbox", "--disable-dev-shm-usage"],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LaunchProfile::Optimized => "optimized",
            LaunchProfile::Basic => "basic",
        }
    }
}

/// One rendered tab. Closed by the phase that opened it.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value>;

    /// Current serialized DOM.
    async fn content(&mut self) -> Result<String>;

    async fn current_url(&mut self) -> Result<Option<String>>;

    /// Redirect targets seen by the network layer since the session opened.
    async fn observed_redirects(&mut self) -> Vec<String>;

    async fn close(self: Box<Self>) -> Result<()>;

    /// Click the first matching element whose text contains any of `texts`.
    async fn click_by_text(&mut self, selector: &str, texts: &[&str]) -> Result<bool> {
        let value = self
            .evaluate(&click_by_text_script(selector, texts))
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Best-effort wait for the document to become interactive.
    async fn wait_until_ready(&mut self, timeout: Duration) {
        match tokio::time::timeout(timeout, self.evaluate(WAIT_FOR_READY_SCRIPT)).await {
            Ok(Ok(state)) => debug!("Page ready state: {}", state),
            Ok(Err(e)) => debug!("Could not check ready state: {}", e),
            Err(_) => warn!("Timeout waiting for page ready state"),
        }
    }
}

/// Opens rendering sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Why no session can be opened in this environment, if that is known
    /// up front.
    fn unavailable_reason(&self) -> Option<String> {
        None
    }

    async fn launch(&self, profile: LaunchProfile) -> Result<Box<dyn BrowserSession>>;
}

/// Owns an open session and makes sure it is closed.
///
/// Call [`close`](Self::close) on the normal path. If the guard is dropped
/// with the session still open, for instance because the phase future was
/// cancelled at its time limit, closing is handed to a background task.
pub struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn session(&mut self) -> Result<&mut (dyn BrowserSession + 'static)> {
        match self.session.as_deref_mut() {
            Some(session) => Ok(session),
            None => Err(ProbeError::Render("session already closed".to_string())),
        }
    }

    pub async fn close(mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.close().await {
                debug!("Closing rendering session failed: {}", e);
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Rendering session abandoned, closing in background");
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        debug!("Closing abandoned rendering session failed: {}", e);
                    }
                });
            }
            Err(_) => warn!("Rendering session dropped outside a runtime, not closed"),
        }
    }
}

/// Launch with each profile in [`LaunchProfile::FALLBACK_ORDER`] until one
/// succeeds. Failed attempts are returned so callers can record them.
pub async fn launch_with_fallback(
    launcher: &dyn BrowserLauncher,
) -> (Result<Box<dyn BrowserSession>>, Vec<String>) {
    let mut failures = Vec::new();

    for profile in LaunchProfile::FALLBACK_ORDER {
        match launcher.launch(profile).await {
            Ok(session) => {
                debug!(profile = profile.name(), "Rendering engine launched");
                return (Ok(session), failures);
            }
            Err(e @ ProbeError::BrowserUnavailable(_)) => {
                return (Err(e), failures);
            }
            Err(e) => {
                warn!(profile = profile.name(), error = %e, "Rendering engine launch failed");
                failures.push(format!("{} launch failed: {}", profile.name(), e));
            }
        }
    }

    (
        Err(ProbeError::Render(
            "all launch profiles failed".to_string(),
        )),
        failures,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct NullSession;

    #[async_trait]
    impl BrowserSession for NullSession {
        async fn navigate(&mut self, _url: &str, _timeout: Duration) -> Result<()> {
            Ok(())
        }
        async fn evaluate(&mut self, _script: &str) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Bool(true))
        }
        async fn content(&mut self) -> Result<String> {
            Ok(String::new())
        }
        async fn current_url(&mut self) -> Result<Option<String>> {
            Ok(None)
        }
        async fn observed_redirects(&mut self) -> Vec<String> {
            Vec::new()
        }
        async fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    /// Fails the optimized profile, succeeds on basic.
    struct PickyLauncher {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl BrowserLauncher for PickyLauncher {
        async fn launch(&self, profile: LaunchProfile) -> Result<Box<dyn BrowserSession>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            match profile {
                LaunchProfile::Optimized => Err(ProbeError::Render("zygote crashed".into())),
                LaunchProfile::Basic => Ok(Box::new(NullSession)),
            }
        }
    }

    struct MissingLauncher;

    #[async_trait]
    impl BrowserLauncher for MissingLauncher {
        async fn launch(&self, _profile: LaunchProfile) -> Result<Box<dyn BrowserSession>> {
            Err(ProbeError::BrowserUnavailable("chrome not found".into()))
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_basic_profile() {
        let launcher = PickyLauncher {
            attempts: AtomicUsize::new(0),
        };
        let (session, failures) = launch_with_fallback(&launcher).await;
        assert!(session.is_ok());
        assert_eq!(launcher.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with("optimized launch failed"));
    }

    #[tokio::test]
    async fn test_unavailable_engine_stops_immediately() {
        let (session, failures) = launch_with_fallback(&MissingLauncher).await;
        assert!(matches!(session, Err(ProbeError::BrowserUnavailable(_))));
        assert!(failures.is_empty());
    }

    struct CountedSession {
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BrowserSession for CountedSession {
        async fn navigate(&mut self, _url: &str, _timeout: Duration) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
        async fn evaluate(&mut self, _script: &str) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
        async fn content(&mut self) -> Result<String> {
            Ok(String::new())
        }
        async fn current_url(&mut self) -> Result<Option<String>> {
            Ok(None)
        }
        async fn observed_redirects(&mut self) -> Vec<String> {
            Vec::new()
        }
        async fn close(self: Box<Self>) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_guard_closes_once() {
        let closed = Arc::new(AtomicUsize::new(0));
        let guard = SessionGuard::new(Box::new(CountedSession {
            closed: Arc::clone(&closed),
        }));
        guard.close().await;
        tokio::task::yield_now().await;
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_guard_closes_in_background() {
        let closed = Arc::new(AtomicUsize::new(0));
        let mut guard = SessionGuard::new(Box::new(CountedSession {
            closed: Arc::clone(&closed),
        }));

        let navigation = async move {
            let session = guard.session()?;
            session.navigate("https://agg.example/", Duration::from_secs(60)).await
        };
        let outcome = tokio::time::timeout(Duration::from_millis(50), navigation).await;
        assert!(outcome.is_err());

        for _ in 0..50 {
            if closed.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_click_by_text_reads_boolean() {
        let mut session = NullSession;
        assert!(session.click_by_text("button", &["Continue"]).await.unwrap());
    }

    #[test]
    fn test_basic_profile_is_minimal() {
        assert_eq!(
            LaunchProfile::Basic.args(),
            &["--no-sandbox", "--disable-dev-shm-usage"]
        );
        assert!(LaunchProfile::Optimized.args().contains(&"--no-zygote"));
    }
}
