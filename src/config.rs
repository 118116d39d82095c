//! Configuration file model and resolved runtime settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::browser::BrowserEngineConfig;
use crate::error::{ProbeError, Result};
use crate::evidence::{TargetSignature, DEFAULT_EXCLUDED_SEGMENTS};

/// Config file looked for in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "linkprobe.toml";

/// Upper bound on whole-pipeline retries, whatever the config says.
pub const MAX_RETRIES: u32 = 3;

/// Sub-paths tried by the alternate path phase.
pub const DEFAULT_ALTERNATE_PATHS: &[&str] = &[
    "/links",
    "/social",
    "/socials",
    "/connect",
    "/bio",
    "/profile",
    "/about",
    "/contact",
    "/links.html",
    "/social.html",
];

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub text_mining: TextMiningConfig,

    #[serde(default)]
    pub browser: BrowserEngineConfig,

    #[serde(default)]
    pub server: ServerConfig,

    /// Path the config was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Brand name for text mentions; defaults to the domain's first label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[serde(default = "default_excluded_segments")]
    pub excluded_segments: Vec<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            brand: None,
            excluded_segments: default_excluded_segments(),
        }
    }
}

fn default_domain() -> String {
    "onlyfans.com".to_string()
}

fn default_excluded_segments() -> Vec<String> {
    DEFAULT_EXCLUDED_SEGMENTS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// None for the linkprobe agent, "impersonate" for a real browser agent,
    /// anything else is sent verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Honour HTTP_PROXY / HTTPS_PROXY from the environment.
    #[serde(default = "default_true")]
    pub system_proxy: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            user_agent: None,
            proxy: None,
            system_proxy: true,
        }
    }
}

fn default_request_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

/// Per-phase wall-clock budgets in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseBudgetConfig {
    #[serde(default = "default_direct_budget")]
    pub direct: u64,
    #[serde(default = "default_identity_budget")]
    pub identity: u64,
    #[serde(default = "default_alternate_budget")]
    pub alternate_paths: u64,
    #[serde(default = "default_interactive_budget")]
    pub interactive: u64,
    #[serde(default = "default_text_mining_budget")]
    pub text_mining: u64,
}

impl Default for PhaseBudgetConfig {
    fn default() -> Self {
        Self {
            direct: default_direct_budget(),
            identity: default_identity_budget(),
            alternate_paths: default_alternate_budget(),
            interactive: default_interactive_budget(),
            text_mining: default_text_mining_budget(),
        }
    }
}

fn default_direct_budget() -> u64 {
    30
}
fn default_identity_budget() -> u64 {
    60
}
fn default_alternate_budget() -> u64 {
    45
}
fn default_interactive_budget() -> u64 {
    90
}
fn default_text_mining_budget() -> u64 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Wall-clock ceiling for one detection call, in seconds.
    #[serde(default = "default_global_budget")]
    pub global_budget_secs: u64,

    #[serde(default)]
    pub phase_budgets: PhaseBudgetConfig,

    /// Whole-pipeline retries after an unmatched run with transport errors.
    #[serde(default)]
    pub retries: u32,

    #[serde(default = "default_direct_links")]
    pub direct_links: usize,
    #[serde(default = "default_direct_hops")]
    pub direct_hops: usize,
    #[serde(default = "default_direct_hop_timeout")]
    pub direct_hop_timeout_secs: u64,

    #[serde(default = "default_rotation_links")]
    pub rotation_links: usize,
    #[serde(default = "default_rotation_hops")]
    pub rotation_hops: usize,
    #[serde(default = "default_rotation_hop_timeout")]
    pub rotation_hop_timeout_secs: u64,

    #[serde(default = "default_alternate_paths")]
    pub alternate_paths: Vec<String>,

    /// Cap on any rendering settle or post-click wait, in milliseconds.
    #[serde(default = "default_max_settle_ms")]
    pub max_settle_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            global_budget_secs: default_global_budget(),
            phase_budgets: PhaseBudgetConfig::default(),
            retries: 0,
            direct_links: default_direct_links(),
            direct_hops: default_direct_hops(),
            direct_hop_timeout_secs: default_direct_hop_timeout(),
            rotation_links: default_rotation_links(),
            rotation_hops: default_rotation_hops(),
            rotation_hop_timeout_secs: default_rotation_hop_timeout(),
            alternate_paths: default_alternate_paths(),
            max_settle_ms: default_max_settle_ms(),
        }
    }
}

fn default_global_budget() -> u64 {
    180
}
fn default_direct_links() -> usize {
    8
}
fn default_direct_hops() -> usize {
    3
}
fn default_direct_hop_timeout() -> u64 {
    5
}
fn default_rotation_links() -> usize {
    20
}
fn default_rotation_hops() -> usize {
    5
}
fn default_rotation_hop_timeout() -> u64 {
    8
}
fn default_alternate_paths() -> Vec<String> {
    DEFAULT_ALTERNATE_PATHS
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_max_settle_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextMiningConfig {
    /// Distinct age-gate phrases needed for an age-gate-only match.
    /// 0 disables age-gate-only matches.
    #[serde(default = "default_age_gate_min_indicators")]
    pub age_gate_min_indicators: usize,

    #[serde(default = "default_true")]
    pub accept_brand_mentions: bool,
}

impl Default for TextMiningConfig {
    fn default() -> Self {
        Self {
            age_gate_min_indicators: default_age_gate_min_indicators(),
            accept_brand_mentions: true,
        }
    }
}

fn default_age_gate_min_indicators() -> usize {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_max_batch")]
    pub max_batch: usize,

    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_batch: default_max_batch(),
            batch_concurrency: default_batch_concurrency(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_max_batch() -> usize {
    100
}
fn default_batch_concurrency() -> usize {
    4
}

impl Config {
    /// Load configuration, then apply environment overrides.
    ///
    /// An explicit path must exist. Otherwise `./linkprobe.toml` and
    /// `<config dir>/linkprobe/config.toml` are tried before defaults.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_path(path).await?,
            None => match Self::discover() {
                Some(path) => Self::load_from_path(&path).await?,
                None => Self::default(),
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("linkprobe").join("config.toml"))
            .filter(|path| path.is_file())
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            ProbeError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

        let mut config: Config = match ext {
            "json" => serde_json::from_str(&contents)
                .map_err(|e| ProbeError::Config(format!("failed to parse JSON config: {}", e)))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| ProbeError::Config(format!("failed to parse YAML config: {}", e)))?,
            _ => toml::from_str(&contents)
                .map_err(|e| ProbeError::Config(format!("failed to parse TOML config: {}", e)))?,
        };

        debug!("Loaded config from {}", path.display());
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Apply `LINKPROBE_*` overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(domain) = lookup("LINKPROBE_TARGET_DOMAIN").filter(|v| !v.is_empty()) {
            self.target.domain = domain;
            self.target.brand = None;
        }
        if let Some(url) = lookup("LINKPROBE_BROWSER_URL").filter(|v| !v.is_empty()) {
            self.browser.remote_url = Some(url);
        }
        if let Some(flag) = lookup("LINKPROBE_NO_BROWSER") {
            if matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes") {
                self.browser.enabled = false;
            }
        }
        if let Some(secs) = lookup("LINKPROBE_GLOBAL_BUDGET_SECS").and_then(|v| v.parse().ok()) {
            self.pipeline.global_budget_secs = secs;
        }
    }

    /// Resolve into the immutable settings used by the detector.
    pub fn into_settings(self) -> Result<Settings> {
        let signature = TargetSignature::new(
            &self.target.domain,
            self.target.brand.as_deref(),
            self.target.excluded_segments,
        )?;

        if self.server.max_batch == 0 {
            return Err(ProbeError::Config("server.max_batch must be at least 1".into()));
        }

        let p = self.pipeline;
        let b = p.phase_budgets;
        Ok(Settings {
            signature,
            http: HttpSettings {
                request_timeout: Duration::from_secs(self.http.request_timeout.max(1)),
                user_agent: self.http.user_agent,
                proxy: self.http.proxy,
                system_proxy: self.http.system_proxy,
            },
            pipeline: PipelineSettings {
                global_budget: Duration::from_secs(p.global_budget_secs),
                budgets: PhaseBudgets {
                    direct: Duration::from_secs(b.direct),
                    identity: Duration::from_secs(b.identity),
                    alternate_paths: Duration::from_secs(b.alternate_paths),
                    interactive: Duration::from_secs(b.interactive),
                    text_mining: Duration::from_secs(b.text_mining),
                },
                retries: p.retries.min(MAX_RETRIES),
                direct_sample: LinkSample {
                    links: p.direct_links,
                    hops: p.direct_hops,
                    hop_timeout: Duration::from_secs(p.direct_hop_timeout_secs),
                },
                rotation_sample: LinkSample {
                    links: p.rotation_links,
                    hops: p.rotation_hops,
                    hop_timeout: Duration::from_secs(p.rotation_hop_timeout_secs),
                },
                alternate_paths: p
                    .alternate_paths
                    .into_iter()
                    .map(|path| {
                        if path.starts_with('/') {
                            path
                        } else {
                            format!("/{}", path)
                        }
                    })
                    .collect(),
                max_settle: Duration::from_millis(p.max_settle_ms),
            },
            text_mining: self.text_mining,
            browser: self.browser,
            server: ServerSettings {
                bind: self.server.bind,
                max_batch: self.server.max_batch,
                batch_concurrency: self.server.batch_concurrency.max(1),
            },
        })
    }
}

/// Resolved HTTP transport settings.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    pub user_agent: Option<String>,
    pub proxy: Option<String>,
    pub system_proxy: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(default_request_timeout()),
            user_agent: None,
            proxy: None,
            system_proxy: true,
        }
    }
}

/// How many in-page links to follow, how far, and how patiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSample {
    pub links: usize,
    pub hops: usize,
    pub hop_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseBudgets {
    pub direct: Duration,
    pub identity: Duration,
    pub alternate_paths: Duration,
    pub interactive: Duration,
    pub text_mining: Duration,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub global_budget: Duration,
    pub budgets: PhaseBudgets,
    pub retries: u32,
    pub direct_sample: LinkSample,
    pub rotation_sample: LinkSample,
    pub alternate_paths: Vec<String>,
    pub max_settle: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind: String,
    pub max_batch: usize,
    pub batch_concurrency: usize,
}

/// Application settings, resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub signature: TargetSignature,
    pub http: HttpSettings,
    pub pipeline: PipelineSettings,
    pub text_mining: TextMiningConfig,
    pub browser: BrowserEngineConfig,
    pub server: ServerSettings,
}

impl Settings {
    /// Default settings aimed at `domain`.
    pub fn for_domain(domain: &str) -> Result<Self> {
        let mut config = Config::default();
        config.target.domain = domain.to_string();
        config.into_settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_resolve() {
        let settings = Config::default().into_settings().unwrap();
        assert_eq!(settings.signature.domain(), "onlyfans.com");
        assert_eq!(settings.pipeline.direct_sample.links, 8);
        assert_eq!(settings.pipeline.direct_sample.hops, 3);
        assert_eq!(settings.pipeline.rotation_sample.links, 20);
        assert_eq!(settings.pipeline.rotation_sample.hop_timeout, Duration::from_secs(8));
        assert_eq!(settings.pipeline.alternate_paths.len(), 10);
        assert_eq!(settings.server.max_batch, 100);
        assert_eq!(settings.text_mining.age_gate_min_indicators, 2);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LINKPROBE_TARGET_DOMAIN", "target.example"),
            ("LINKPROBE_NO_BROWSER", "true"),
            ("LINKPROBE_GLOBAL_BUDGET_SECS", "42"),
            ("LINKPROBE_BROWSER_URL", "ws://localhost:9222"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.target.domain, "target.example");
        assert!(!config.browser.enabled);
        assert_eq!(config.pipeline.global_budget_secs, 42);
        assert_eq!(config.browser.remote_url.as_deref(), Some("ws://localhost:9222"));
    }

    #[test]
    fn test_retries_capped_and_paths_rooted() {
        let mut config = Config::default();
        config.pipeline.retries = 50;
        config.pipeline.alternate_paths = vec!["links".to_string(), "/bio".to_string()];
        let settings = config.into_settings().unwrap();
        assert_eq!(settings.pipeline.retries, MAX_RETRIES);
        assert_eq!(settings.pipeline.alternate_paths, vec!["/links", "/bio"]);
    }

    #[test]
    fn test_zero_batch_rejected() {
        let mut config = Config::default();
        config.server.max_batch = 0;
        assert!(matches!(config.into_settings(), Err(ProbeError::Config(_))));
    }

    #[tokio::test]
    async fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("probe.toml");
        std::fs::write(
            &toml_path,
            "[target]\ndomain = \"target.example\"\n\n[pipeline]\nretries = 1\n",
        )
        .unwrap();
        let config = Config::load_from_path(&toml_path).await.unwrap();
        assert_eq!(config.target.domain, "target.example");
        assert_eq!(config.pipeline.retries, 1);
        assert_eq!(config.source_path.as_deref(), Some(toml_path.as_path()));

        let yaml_path = dir.path().join("probe.yaml");
        std::fs::write(&yaml_path, "server:\n  max_batch: 10\n").unwrap();
        let config = Config::load_from_path(&yaml_path).await.unwrap();
        assert_eq!(config.server.max_batch, 10);
        assert_eq!(config.target.domain, "onlyfans.com");

        let json_path = dir.path().join("probe.json");
        std::fs::write(&json_path, r#"{"text_mining": {"accept_brand_mentions": false}}"#)
            .unwrap();
        let config = Config::load_from_path(&json_path).await.unwrap();
        assert!(!config.text_mining.accept_brand_mentions);
    }

    #[tokio::test]
    async fn test_explicit_missing_path_is_error() {
        let result = Config::load(Some(Path::new("/nonexistent/linkprobe.toml"))).await;
        assert!(matches!(result, Err(ProbeError::Config(_))));
    }
}
