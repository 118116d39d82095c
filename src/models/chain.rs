//! Redirect chain produced by the resolver.

use serde::Serialize;

/// Why resolution stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum ChainStop {
    /// A non-redirect status was received.
    Terminal { status: u16 },
    /// The hop limit was reached.
    HopLimit,
    /// A redirect arrived without a usable `Location` header.
    MissingLocation { status: u16 },
    /// The last hop did not answer within its allowance.
    Timeout,
    /// The last hop failed at the network level.
    Transport { message: String },
    /// The caller's stop condition matched the last URL.
    Matched,
}

/// Ordered list of URLs visited while following redirects.
///
/// The first entry is always the origin URL. The last entry is the terminal
/// URL: either the final non-redirect URL or the last one reached before a
/// limit or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectChain {
    urls: Vec<String>,
    stop: ChainStop,
}

impl RedirectChain {
    pub(crate) fn start(origin: &str) -> Self {
        Self {
            urls: vec![origin.to_string()],
            stop: ChainStop::HopLimit,
        }
    }

    pub(crate) fn push(&mut self, url: String) {
        self.urls.push(url);
    }

    pub(crate) fn finish(mut self, stop: ChainStop) -> Self {
        self.stop = stop;
        self
    }

    pub fn origin(&self) -> &str {
        &self.urls[0]
    }

    pub fn terminal(&self) -> &str {
        self.urls.last().map(String::as_str).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Number of redirects followed.
    pub fn hops(&self) -> usize {
        self.urls.len() - 1
    }

    pub fn stop(&self) -> &ChainStop {
        &self.stop
    }
}
