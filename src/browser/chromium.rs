//! chromiumoxide-backed rendering sessions.
//!
//! Every session gets its own browser process, or its own browser context
//! on a remote browser, so cookies and storage never carry over between
//! probes.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    EventRequestWillBeSent, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{BrowserEngineConfig, BrowserLauncher, BrowserSession, LaunchProfile, STEALTH_SCRIPTS};
use crate::error::{ProbeError, Result};

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Common install locations
    "/opt/google/chrome/google-chrome",
];

const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// Find Chrome executable.
fn find_chrome() -> Option<PathBuf> {
    for path in CHROME_PATHS {
        let p = std::path::Path::new(path);
        if p.exists() {
            return Some(p.to_path_buf());
        }
    }
    CHROME_COMMANDS.iter().find_map(|cmd| which::which(cmd).ok())
}

pub struct ChromiumLauncher {
    config: BrowserEngineConfig,
}

impl ChromiumLauncher {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self { config }
    }

    async fn launch_local(&self, profile: LaunchProfile) -> Result<Browser> {
        let chrome_path = find_chrome().ok_or_else(|| {
            ProbeError::BrowserUnavailable("Chrome/Chromium not found".to_string())
        })?;
        info!(
            "Launching browser (headless={}, profile={}) from {}",
            self.config.headless,
            profile.name(),
            chrome_path.display()
        );

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless
        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(ref proxy) = self.config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }
        for arg in profile.args() {
            builder = builder.arg(*arg);
        }
        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| ProbeError::Render(format!("failed to build browser config: {}", e)))?;

        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| ProbeError::Render(format!("failed to launch browser: {}", e)))?;
        Ok(self.attach(browser, handler))
    }

    /// Connect to a remote Chrome instance.
    async fn connect_remote(&self, url: &str) -> Result<Browser> {
        info!("Connecting to remote browser at {}", url);

        // Get WebSocket URL from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .timeout(Duration::from_secs(self.config.timeout))
            .send()
            .await
            .map_err(|e| ProbeError::BrowserUnavailable(format!("remote browser: {}", e)))?
            .json()
            .await
            .map_err(|e| ProbeError::Render(format!("bad browser version info: {}", e)))?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProbeError::Render("no webSocketDebuggerUrl in response".into()))?;

        let (browser, handler) = Browser::connect(ws_url)
            .await
            .map_err(|e| ProbeError::Render(format!("failed to connect to browser: {}", e)))?;
        Ok(self.attach(browser, handler))
    }

    fn attach(&self, browser: Browser, mut handler: chromiumoxide::Handler) -> Browser {
        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });
        browser
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    fn unavailable_reason(&self) -> Option<String> {
        if !self.config.enabled {
            return Some("rendering engine disabled in configuration".to_string());
        }
        if self.config.remote_url.is_none() && find_chrome().is_none() {
            return Some("no Chrome/Chromium executable found".to_string());
        }
        None
    }

    async fn launch(&self, profile: LaunchProfile) -> Result<Box<dyn BrowserSession>> {
        let (browser, context) = match self.config.remote_url.as_deref() {
            Some(url) => {
                let browser = self.connect_remote(url).await?;
                let context = browser
                    .execute(CreateBrowserContextParams::default())
                    .await
                    .map_err(|e| ProbeError::Render(format!("failed to create context: {}", e)))?
                    .result
                    .browser_context_id;
                (browser, Some(context))
            }
            None => (self.launch_local(profile).await?, None),
        };

        let page = match browser.new_page(blank_target(context.as_ref())?).await {
            Ok(page) => page,
            Err(e) => {
                if let Some(context) = context {
                    dispose_context(&browser, context).await;
                }
                return Err(ProbeError::Render(format!("failed to open tab: {}", e)));
            }
        };

        let mut session = ChromiumSession {
            browser,
            page: Some(page),
            context,
            redirects: Arc::new(Mutex::new(Vec::new())),
            listener: None,
        };
        if let Err(e) = session.prepare(&self.config.user_agent).await {
            let _ = Box::new(session).close().await;
            return Err(e);
        }
        Ok(Box::new(session))
    }
}

/// A blank tab, placed in `context` when one is given.
fn blank_target(context: Option<&BrowserContextId>) -> Result<CreateTargetParams> {
    let mut target = CreateTargetParams::builder().url("about:blank");
    if let Some(context) = context {
        target = target.browser_context_id(context.clone());
    }
    target.build().map_err(ProbeError::Render)
}

async fn dispose_context(browser: &Browser, context: BrowserContextId) {
    if let Err(e) = browser
        .execute(DisposeBrowserContextParams::new(context))
        .await
    {
        debug!("Disposing browser context failed: {}", e);
    }
}

struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    /// Isolated context on a remote browser. `None` for a local launch,
    /// where the whole process belongs to this session.
    context: Option<BrowserContextId>,
    redirects: Arc<Mutex<Vec<String>>>,
    listener: Option<JoinHandle<()>>,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| ProbeError::Render("tab already closed".to_string()))
    }

    /// Apply the user agent and start recording redirects.
    async fn prepare(&mut self, user_agent: &str) -> Result<()> {
        let page = self.page()?;
        page.execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
            .await
            .map_err(|e| ProbeError::Render(e.to_string()))?;

        let mut events = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| ProbeError::Render(e.to_string()))?;
        let sink = Arc::clone(&self.redirects);
        self.listener = Some(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.redirect_response.is_some() {
                    if let Ok(mut seen) = sink.lock() {
                        seen.push(event.request.url.clone());
                    }
                }
            }
        }));
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        debug!("Navigating to {}", url);
        let page = self.page()?;
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| ProbeError::Render(format!("invalid URL: {}", e)))?;

        tokio::time::timeout(timeout, page.execute(nav_params))
            .await
            .map_err(|_| {
                ProbeError::Timeout(format!(
                    "navigation timed out after {}s for {}",
                    timeout.as_secs(),
                    url
                ))
            })?
            .map_err(|e| ProbeError::Render(format!("navigation failed for {}: {}", url, e)))?;

        for script in STEALTH_SCRIPTS {
            if let Err(e) = page.evaluate(script.to_string()).await {
                debug!("Stealth script injection skipped: {}", e);
            }
        }
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page()?
            .evaluate(script.to_string())
            .await
            .map_err(|e| ProbeError::Render(format!("script failed: {}", e)))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn content(&mut self) -> Result<String> {
        self.page()?
            .content()
            .await
            .map_err(|e| ProbeError::Render(e.to_string()))
    }

    async fn current_url(&mut self) -> Result<Option<String>> {
        self.page()?
            .url()
            .await
            .map(|u| u.map(|u| u.to_string()))
            .map_err(|e| ProbeError::Render(e.to_string()))
    }

    async fn observed_redirects(&mut self) -> Vec<String> {
        self.redirects
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        match self.context.take() {
            Some(context) => dispose_context(&self.browser, context).await,
            None => {
                self.browser
                    .close()
                    .await
                    .map_err(|e| ProbeError::Render(format!("failed to close browser: {}", e)))?;
                let _ = self.browser.wait().await;
            }
        }
        Ok(())
    }
}
