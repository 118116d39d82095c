//! Aggregator platform dispatch.
//!
//! Picks the interaction profile for a target host. Unknown hosts get the
//! generic profile, so selection can never fail.

mod profile;

pub use profile::{PlatformProfile, DEFAULT_SETTLE};

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PlatformDispatcher {
    profiles: Vec<PlatformProfile>,
    generic: PlatformProfile,
}

impl Default for PlatformDispatcher {
    fn default() -> Self {
        let profiles = vec![
            PlatformProfile::new("linktree")
                .hosts(&["linktr.ee", "linktree.com"])
                .link_selectors(&["[data-testid*='LinkButton']", ".link-button", ".social-link"])
                .expand(&["Show more", "See more", "More"], 3),
            PlatformProfile::new("allmylinks")
                .hosts(&["allmylinks.com"])
                .link_selectors(&[".link-item a", ".social-link a"]),
            PlatformProfile::new("beacons")
                .hosts(&["beacons.ai", "beacons.page"])
                .warmup("https://beacons.ai/")
                .human_interaction()
                .settle(Duration::from_secs(6))
                .post_click_wait(Duration::from_secs(4)),
            PlatformProfile::new("linkme")
                .hosts(&["link.me"])
                .link_selectors(&[".singlealbum.singlebigitem.socialmedialink"])
                .consent_texts(&["Continue", "CONTINUE", "Proceed", "Enter", "Yes"])
                .post_click_wait(Duration::from_secs(3)),
            PlatformProfile::new("xlink")
                .hosts(&["xli.ink"])
                .settle(Duration::from_secs(8)),
        ];

        Self {
            profiles,
            generic: PlatformProfile::new("generic"),
        }
    }
}

impl PlatformDispatcher {
    /// Profile for `host`, falling back to the generic profile.
    pub fn select(&self, host: &str) -> &PlatformProfile {
        self.profiles
            .iter()
            .find(|p| p.matches_host(host))
            .unwrap_or(&self.generic)
    }

    /// All specialized profiles followed by the generic one.
    pub fn profiles(&self) -> impl Iterator<Item = &PlatformProfile> {
        self.profiles.iter().chain(std::iter::once(&self.generic))
    }
}
