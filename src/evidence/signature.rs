//! Target platform signature.

use regex::Regex;
use url::Url;

use crate::error::{ProbeError, Result};

/// Path segments that point at assets rather than profiles.
pub const DEFAULT_EXCLUDED_SEGMENTS: &[&str] = &["files", "public"];

/// What a profile link on the target platform looks like.
#[derive(Debug, Clone)]
pub struct TargetSignature {
    domain: String,
    brand: String,
    excluded_segments: Vec<String>,
    brand_pattern: Regex,
    fragment_pattern: Regex,
}

impl TargetSignature {
    /// Build a signature for `domain`, deriving the brand name from its
    /// first label (`onlyfans.com` -> `onlyfans`).
    pub fn for_domain(domain: &str) -> Result<Self> {
        let excluded = DEFAULT_EXCLUDED_SEGMENTS
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self::new(domain, None, excluded)
    }

    pub fn new(domain: &str, brand: Option<&str>, excluded_segments: Vec<String>) -> Result<Self> {
        let domain = domain
            .trim()
            .trim_start_matches("www.")
            .trim_end_matches('.')
            .to_lowercase();
        if domain.is_empty()
            || !domain.contains('.')
            || domain
                .chars()
                .any(|c| !(c.is_ascii_alphanumeric() || c == '.' || c == '-'))
        {
            return Err(ProbeError::Config(format!(
                "target domain '{}' is not a bare host name",
                domain
            )));
        }

        let brand = match brand {
            Some(b) if !b.trim().is_empty() => b.trim().to_lowercase(),
            _ => domain.split('.').next().unwrap_or_default().to_string(),
        };

        let brand_pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&brand)))
            .map_err(|e| ProbeError::Config(e.to_string()))?;
        let fragment_pattern = Regex::new(&format!(
            r"(?i)([a-z0-9.-]*){}/([a-z0-9_.-]+)",
            regex::escape(&domain)
        ))
        .map_err(|e| ProbeError::Config(e.to_string()))?;

        Ok(Self {
            domain,
            brand,
            excluded_segments: excluded_segments
                .into_iter()
                .map(|s| s.trim_matches('/').to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            brand_pattern,
            fragment_pattern,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn excluded_segments(&self) -> &[String] {
        &self.excluded_segments
    }

    pub(crate) fn brand_pattern(&self) -> &Regex {
        &self.brand_pattern
    }

    pub(crate) fn fragment_pattern(&self) -> &Regex {
        &self.fragment_pattern
    }

    /// True for the target domain itself and any of its subdomains.
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_lowercase();
        host == self.domain
            || host
                .strip_suffix(&self.domain)
                .map(|prefix| prefix.ends_with('.'))
                .unwrap_or(false)
    }

    /// True when any path segment is an excluded asset segment.
    pub fn is_excluded_path(&self, path: &str) -> bool {
        path.split('/')
            .filter(|s| !s.is_empty())
            .any(|segment| {
                let segment = segment.to_lowercase();
                self.excluded_segments.iter().any(|ex| *ex == segment)
            })
    }

    /// Whether a URL string is usable evidence: on the target domain and not
    /// an asset path.
    pub fn is_evidence(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .map(|u| {
                u.host_str().map(|h| self.matches_host(h)).unwrap_or(false)
                    && !self.is_excluded_path(u.path())
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brand_derived_from_first_label() {
        let sig = TargetSignature::for_domain("OnlyFans.com").unwrap();
        assert_eq!(sig.domain(), "onlyfans.com");
        assert_eq!(sig.brand(), "onlyfans");
    }

    #[test]
    fn test_matches_host_and_subdomains_only() {
        let sig = TargetSignature::for_domain("target.example").unwrap();
        assert!(sig.matches_host("target.example"));
        assert!(sig.matches_host("www.target.example"));
        assert!(sig.matches_host("TARGET.example"));
        assert!(!sig.matches_host("nottarget.example"));
        assert!(!sig.matches_host("target.example.evil.net"));
    }

    #[test]
    fn test_evidence_excludes_asset_segments() {
        let sig = TargetSignature::for_domain("target.example").unwrap();
        assert!(sig.is_evidence("https://target.example/alice"));
        assert!(sig.is_evidence("https://target.example/"));
        assert!(!sig.is_evidence("https://target.example/files/x.jpg"));
        assert!(!sig.is_evidence("https://cdn.target.example/Public/a.png"));
        assert!(!sig.is_evidence("mailto:alice@target.example"));
    }

    #[test]
    fn test_rejects_non_host_domain() {
        assert!(TargetSignature::for_domain("").is_err());
        assert!(TargetSignature::for_domain("localhost").is_err());
        assert!(TargetSignature::for_domain("target.example/path").is_err());
    }
}
