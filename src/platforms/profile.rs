//! Per-platform interaction parameters.

use std::time::Duration;

/// Default wait after navigation for client-side rendering.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(3);

/// How the interactive phase should treat one aggregator platform.
///
/// Every platform runs the same interaction strategy; a profile only tunes
/// selectors and wait budgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    pub name: &'static str,
    /// Hosts served by this platform; subdomains match too.
    pub hosts: Vec<&'static str>,
    /// Elements holding outbound link cards.
    pub link_selectors: Vec<&'static str>,
    /// Button texts that confirm an interstitial after a card click.
    pub consent_texts: Vec<&'static str>,
    /// Button texts that reveal collapsed links.
    pub expand_texts: Vec<&'static str>,
    pub max_expand_rounds: u32,
    pub settle: Duration,
    pub post_click_wait: Duration,
    /// Page visited first so the platform sees an ordinary session.
    pub warmup_url: Option<&'static str>,
    pub human_interaction: bool,
}

impl PlatformProfile {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            hosts: Vec::new(),
            link_selectors: vec!["a[href]", "[data-url]", "[data-href]", "[data-link]"],
            consent_texts: vec!["Continue", "Proceed", "Enter", "Yes"],
            expand_texts: Vec::new(),
            max_expand_rounds: 0,
            settle: DEFAULT_SETTLE,
            post_click_wait: Duration::from_secs(2),
            warmup_url: None,
            human_interaction: false,
        }
    }

    pub fn hosts(mut self, hosts: &[&'static str]) -> Self {
        self.hosts = hosts.to_vec();
        self
    }

    pub fn link_selectors(mut self, selectors: &[&'static str]) -> Self {
        self.link_selectors = selectors.to_vec();
        self
    }

    pub fn consent_texts(mut self, texts: &[&'static str]) -> Self {
        self.consent_texts = texts.to_vec();
        self
    }

    pub fn expand(mut self, texts: &[&'static str], max_rounds: u32) -> Self {
        self.expand_texts = texts.to_vec();
        self.max_expand_rounds = max_rounds;
        self
    }

    pub fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn post_click_wait(mut self, wait: Duration) -> Self {
        self.post_click_wait = wait;
        self
    }

    pub fn warmup(mut self, url: &'static str) -> Self {
        self.warmup_url = Some(url);
        self
    }

    pub fn human_interaction(mut self) -> Self {
        self.human_interaction = true;
        self
    }

    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        self.hosts.iter().any(|h| {
            host == *h
                || host
                    .strip_suffix(h)
                    .map(|prefix| prefix.ends_with('.'))
                    .unwrap_or(false)
        })
    }

    /// Selector list for the link cards, as one CSS selector group.
    pub fn link_selector_group(&self) -> String {
        self.link_selectors.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let profile = PlatformProfile::new("demo")
            .hosts(&["demo.example"])
            .settle(Duration::from_secs(8))
            .expand(&["Show more"], 3);
        assert_eq!(profile.settle, Duration::from_secs(8));
        assert_eq!(profile.max_expand_rounds, 3);
        assert_eq!(profile.consent_texts, vec!["Continue", "Proceed", "Enter", "Yes"]);
    }

    #[test]
    fn test_host_matching() {
        let profile = PlatformProfile::new("demo").hosts(&["demo.example"]);
        assert!(profile.matches_host("demo.example"));
        assert!(profile.matches_host("www.demo.example"));
        assert!(profile.matches_host("eu.demo.example"));
        assert!(!profile.matches_host("notdemo.example"));
    }

    #[test]
    fn test_selector_group() {
        let profile = PlatformProfile::new("demo").link_selectors(&[".a", ".b a"]);
        assert_eq!(profile.link_selector_group(), ".a, .b a");
    }
}
