//! HTTP transport used by the HTTP-only phases and the redirect resolver.

mod identity;
mod response;

pub use identity::{
    identity_rotation, random_user_agent, resolve_user_agent, ClientIdentity,
    IMPERSONATE_USER_AGENTS, USER_AGENT,
};
pub use response::{HopResponse, PageResponse};

use std::time::Duration;

use reqwest::{header, redirect, Client, RequestBuilder};
use tracing::debug;

use crate::config::HttpSettings;
use crate::error::{ProbeError, Result};

/// Maximum redirects followed automatically when fetching a page body.
const PAGE_REDIRECT_LIMIT: usize = 10;

/// HTTP client holding two connection pools: one that follows redirects for
/// page fetches and one that never does, for hop-by-hop resolution.
///
/// No cookie store is attached, so nothing leaks between probes that share
/// the client.
#[derive(Clone)]
pub struct HttpClient {
    pages: Client,
    hops: Client,
    default_identity: ClientIdentity,
}

impl HttpClient {
    /// Create a new HTTP client with default settings.
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::from_settings(&HttpSettings {
            request_timeout: timeout,
            ..HttpSettings::default()
        })
    }

    /// Create a new HTTP client with custom user agent and proxy configuration.
    /// - user_agent None: linkprobe user agent
    /// - user_agent Some("impersonate"): random real browser user agent
    /// - user_agent Some(custom): custom user agent string
    pub fn from_settings(settings: &HttpSettings) -> Result<Self> {
        let user_agent = resolve_user_agent(settings.user_agent.as_deref());
        let pages = build_client(
            settings,
            &user_agent,
            redirect::Policy::limited(PAGE_REDIRECT_LIMIT),
        )?;
        let hops = build_client(settings, &user_agent, redirect::Policy::none())?;

        Ok(Self {
            pages,
            hops,
            default_identity: ClientIdentity::plain(&user_agent),
        })
    }

    /// The identity used when a phase has no reason to disguise itself.
    pub fn default_identity(&self) -> &ClientIdentity {
        &self.default_identity
    }

    /// GET a page and read its body, following redirects.
    pub async fn fetch_page(
        &self,
        url: &str,
        identity: &ClientIdentity,
        timeout: Duration,
    ) -> Result<PageResponse> {
        let response = apply_identity(self.pages.get(url), identity)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        let final_url = response.url().to_string();
        let body = response.text().await?;

        debug!(
            url,
            identity = %identity.name,
            status = status.as_u16(),
            bytes = body.len(),
            "Fetched page"
        );

        Ok(PageResponse {
            status,
            final_url,
            body,
        })
    }

    /// Make a HEAD request without following redirects.
    pub async fn head(
        &self,
        url: &str,
        identity: &ClientIdentity,
        timeout: Duration,
    ) -> Result<HopResponse> {
        let response = apply_identity(self.hops.head(url), identity)
            .timeout(timeout)
            .send()
            .await?;
        Ok(HopResponse::from_response(&response))
    }

    /// Make a GET request without following redirects, discarding the body.
    pub async fn get_headers(
        &self,
        url: &str,
        identity: &ClientIdentity,
        timeout: Duration,
    ) -> Result<HopResponse> {
        let response = apply_identity(self.hops.get(url), identity)
            .timeout(timeout)
            .send()
            .await?;
        Ok(HopResponse::from_response(&response))
    }
}

fn apply_identity(mut request: RequestBuilder, identity: &ClientIdentity) -> RequestBuilder {
    request = request.header(header::USER_AGENT, identity.user_agent.as_str());
    for (name, value) in &identity.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request
}

fn build_client(
    settings: &HttpSettings,
    user_agent: &str,
    policy: redirect::Policy,
) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(settings.request_timeout)
        .gzip(true)
        .brotli(true)
        .redirect(policy);

    if !settings.system_proxy {
        builder = builder.no_proxy();
    }
    if let Some(proxy) = &settings.proxy {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| ProbeError::Config(format!("invalid proxy '{}': {}", proxy, e)))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ProbeError::Config(format!("failed to create HTTP client: {}", e)))
}
