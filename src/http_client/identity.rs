//! Client identities: user agent strings and the headers sent with them.

pub const USER_AGENT: &str = "linkprobe/0.3 (bio link detection; +https://github.com/linkprobe/linkprobe)";

/// Real browser user agents for impersonate mode.
pub const IMPERSONATE_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Chrome on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Safari on iPhone
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Mobile/15E148 Safari/604.1",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

const CRAWLER_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

/// Referers rotated across identities.
const REFERERS: &[&str] = &[
    "https://www.google.com/",
    "https://www.bing.com/",
    "https://www.facebook.com/",
];

/// A user agent plus the extra headers a client of that kind would send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub name: String,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
}

impl ClientIdentity {
    /// The plain identity used for first contact.
    pub fn plain(user_agent: &str) -> Self {
        Self {
            name: "default".to_string(),
            user_agent: user_agent.to_string(),
            headers: vec![("Accept".to_string(), "*/*".to_string())],
        }
    }

    fn browser(name: &str, user_agent: &str, referer: &str) -> Self {
        let headers = [
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
            ("Accept-Language", "en-US,en;q=0.9"),
            ("DNT", "1"),
            ("Upgrade-Insecure-Requests", "1"),
            ("Sec-Fetch-Dest", "document"),
            ("Sec-Fetch-Mode", "navigate"),
            ("Sec-Fetch-Site", "cross-site"),
            ("Sec-Fetch-User", "?1"),
            ("Cache-Control", "max-age=0"),
            ("Referer", referer),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            name: name.to_string(),
            user_agent: user_agent.to_string(),
            headers,
        }
    }

    fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Identities tried in turn when the plain identity gets nothing back.
///
/// Desktop browsers first, then a mobile browser, then a crawler, each with
/// a different referer.
pub fn identity_rotation() -> Vec<ClientIdentity> {
    vec![
        ClientIdentity::browser("desktop-chrome-windows", IMPERSONATE_USER_AGENTS[0], REFERERS[0]),
        ClientIdentity::browser("desktop-chrome-macos", IMPERSONATE_USER_AGENTS[1], REFERERS[1]),
        ClientIdentity::browser("mobile-safari-iphone", IMPERSONATE_USER_AGENTS[2], REFERERS[2])
            .with_header("X-Requested-With", "XMLHttpRequest"),
        ClientIdentity::browser("crawler-googlebot", CRAWLER_USER_AGENT, REFERERS[0]),
    ]
}

/// Get a random user agent for impersonate mode.
pub fn random_user_agent() -> &'static str {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as usize)
        .unwrap_or(0);
    IMPERSONATE_USER_AGENTS[nanos % IMPERSONATE_USER_AGENTS.len()]
}

/// Resolve user agent from config value.
/// - None => default linkprobe user agent
/// - "impersonate" => random real browser user agent
/// - other => custom user agent string
pub fn resolve_user_agent(config: Option<&str>) -> String {
    match config {
        None => USER_AGENT.to_string(),
        Some("impersonate") => random_user_agent().to_string(),
        Some(custom) => custom.to_string(),
    }
}
