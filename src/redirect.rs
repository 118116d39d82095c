//! Hop-by-hop redirect resolution.
//!
//! Each hop is a HEAD request, retried as a body-less GET when the server
//! does not give HEAD a meaningful answer. Resolution never fails: network
//! errors and timeouts end the chain at the failing hop.

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::{ProbeError, Result};
use crate::http_client::{ClientIdentity, HopResponse, HttpClient};
use crate::models::{ChainStop, RedirectChain};

/// Hard cap on hops regardless of what the caller asks for.
pub const MAX_HOPS_CAP: usize = 7;

#[derive(Clone)]
pub struct RedirectResolver {
    http: HttpClient,
}

impl RedirectResolver {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Follow redirects from `url` until a non-redirect answer, `max_hops`
    /// redirects, a timeout, a transport failure or a missing `Location`.
    pub async fn resolve(&self, url: &str, max_hops: usize, per_hop_timeout: Duration) -> RedirectChain {
        self.resolve_until(url, max_hops, per_hop_timeout, |_| false)
            .await
    }

    /// Like [`resolve`](Self::resolve), but also stop as soon as a visited
    /// URL satisfies `stop_at`. The matching URL is not requested.
    pub async fn resolve_until<F>(
        &self,
        url: &str,
        max_hops: usize,
        per_hop_timeout: Duration,
        stop_at: F,
    ) -> RedirectChain
    where
        F: Fn(&str) -> bool,
    {
        self.resolve_as(
            url,
            self.http.default_identity(),
            max_hops,
            per_hop_timeout,
            stop_at,
        )
        .await
    }

    /// Resolve while presenting a specific client identity.
    pub async fn resolve_as<F>(
        &self,
        url: &str,
        identity: &ClientIdentity,
        max_hops: usize,
        per_hop_timeout: Duration,
        stop_at: F,
    ) -> RedirectChain
    where
        F: Fn(&str) -> bool,
    {
        let max_hops = max_hops.min(MAX_HOPS_CAP);
        let mut chain = RedirectChain::start(url);
        if stop_at(url) {
            return chain.finish(ChainStop::Matched);
        }

        let mut current = url.to_string();
        let mut hops = 0;

        loop {
            if hops >= max_hops {
                return chain.finish(ChainStop::HopLimit);
            }

            let response = match self.hop(&current, identity, per_hop_timeout).await {
                Ok(response) => response,
                Err(ProbeError::Timeout(_)) => {
                    debug!(url = %current, "Redirect hop timed out");
                    return chain.finish(ChainStop::Timeout);
                }
                Err(e) => {
                    debug!(url = %current, error = %e, "Redirect hop failed");
                    return chain.finish(ChainStop::Transport {
                        message: e.to_string(),
                    });
                }
            };

            let status = response.status.as_u16();
            if !response.is_redirect() {
                return chain.finish(ChainStop::Terminal { status });
            }

            let next = response
                .location()
                .and_then(|location| resolve_location(&current, location));
            let Some(next) = next else {
                return chain.finish(ChainStop::MissingLocation { status });
            };

            debug!(from = %current, to = %next, status, "Following redirect");
            chain.push(next.clone());
            hops += 1;

            if stop_at(&next) {
                return chain.finish(ChainStop::Matched);
            }
            current = next;
        }
    }

    async fn hop(
        &self,
        url: &str,
        identity: &ClientIdentity,
        timeout: Duration,
    ) -> Result<HopResponse> {
        let attempt = async {
            let head = self.http.head(url, identity, timeout).await?;
            if head.head_was_meaningful() {
                return Ok(head);
            }
            debug!(url, status = head.status.as_u16(), "HEAD not usable, retrying with GET");
            self.http.get_headers(url, identity, timeout).await
        };

        tokio::time::timeout(timeout, attempt)
            .await
            .map_err(|_| ProbeError::Timeout(format!("redirect hop {}", url)))?
    }
}

/// Resolve a `Location` value against the URL of the hop that sent it.
fn resolve_location(current: &str, location: &str) -> Option<String> {
    let base = Url::parse(current).ok()?;
    let next = base.join(location).ok()?;
    matches!(next.scheme(), "http" | "https").then(|| next.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_resolved_against_current_hop() {
        assert_eq!(
            resolve_location("https://a.example/x/y", "z").as_deref(),
            Some("https://a.example/x/z")
        );
        assert_eq!(
            resolve_location("https://a.example/x/y", "/root").as_deref(),
            Some("https://a.example/root")
        );
        assert_eq!(
            resolve_location("https://a.example/x", "https://b.example/q").as_deref(),
            Some("https://b.example/q")
        );
        assert_eq!(
            resolve_location("https://a.example/x", "//c.example/p").as_deref(),
            Some("https://c.example/p")
        );
        assert_eq!(resolve_location("https://a.example/x", "mailto:a@b"), None);
    }

    #[tokio::test]
    async fn test_zero_hops_never_contacts_server() {
        let resolver = RedirectResolver::new(HttpClient::new(Duration::from_secs(1)).unwrap());
        // Port 9 on a TEST-NET address would hang or fail if contacted.
        let chain = resolver
            .resolve("http://192.0.2.1:9/start", 0, Duration::from_secs(5))
            .await;
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.terminal(), "http://192.0.2.1:9/start");
        assert_eq!(chain.stop(), &ChainStop::HopLimit);
    }

    #[tokio::test]
    async fn test_stop_condition_on_origin() {
        let resolver = RedirectResolver::new(HttpClient::new(Duration::from_secs(1)).unwrap());
        let chain = resolver
            .resolve_until("http://192.0.2.1:9/start", 3, Duration::from_secs(5), |u| {
                u.contains("192.0.2.1")
            })
            .await;
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.stop(), &ChainStop::Matched);
    }
}
