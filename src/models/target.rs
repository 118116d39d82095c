//! Probe target URL handling.

use serde::Serialize;
use url::Url;

use crate::error::{ProbeError, Result};

/// A bio link page to probe, in both its raw and normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeTarget {
    input: String,
    normalized: String,
    #[serde(skip)]
    url: Url,
}

impl ProbeTarget {
    /// Parse and normalize a target URL.
    ///
    /// Bare hosts get an `https://` scheme, fragments are dropped and a
    /// trailing slash is removed from any non-root path.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ProbeError::invalid_target(input, "empty URL"));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let mut url = Url::parse(&with_scheme)
            .map_err(|e| ProbeError::invalid_target(input, e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProbeError::invalid_target(
                input,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        if url.host_str().map(str::is_empty).unwrap_or(true) {
            return Err(ProbeError::invalid_target(input, "missing host"));
        }

        url.set_fragment(None);
        let path = url.path().to_string();
        if path.len() > 1 && path.ends_with('/') {
            let trimmed_path = path.trim_end_matches('/');
            let trimmed_path = if trimmed_path.is_empty() {
                "/"
            } else {
                trimmed_path
            };
            url.set_path(trimmed_path);
        }

        Ok(Self {
            input: input.to_string(),
            normalized: url.to_string(),
            url,
        })
    }

    /// The URL exactly as the caller supplied it.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Scheme-qualified, slash-normalized URL.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Lowercased host name.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Resolve an absolute path (e.g. `/links`) against the target host.
    pub fn join_path(&self, path: &str) -> Option<String> {
        self.url.join(path).ok().map(|u| u.to_string())
    }
}

impl std::fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.normalized)
    }
}
