//! HTTP response wrappers.

use std::collections::HashMap;

use reqwest::{Response, StatusCode};

/// A fully read page.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: StatusCode,
    /// URL after any redirects the client followed.
    pub final_url: String,
    pub body: String,
}

impl PageResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Status and headers of a single hop (no body, no redirect following).
#[derive(Debug, Clone)]
pub struct HopResponse {
    pub status: StatusCode,
    pub headers: HashMap<String, String>,
}

impl HopResponse {
    pub(crate) fn from_response(response: &Response) -> Self {
        Self {
            status: response.status(),
            headers: collect_headers(response),
        }
    }

    /// 301, 302, 303, 307 or 308.
    pub fn is_redirect(&self) -> bool {
        matches!(self.status.as_u16(), 301 | 302 | 303 | 307 | 308)
    }

    /// Get the Location header.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get("location")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Whether the server gave HEAD a usable answer.
    ///
    /// Some hosts reject HEAD outright or answer it with a bare error; those
    /// hops are retried with GET.
    pub fn head_was_meaningful(&self) -> bool {
        self.is_redirect() || self.status.is_success()
    }
}

fn collect_headers(response: &Response) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for (name, value) in response.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.to_string(), v.to_string());
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop(status: u16, location: Option<&str>) -> HopResponse {
        let mut headers = HashMap::new();
        if let Some(loc) = location {
            headers.insert("location".to_string(), loc.to_string());
        }
        HopResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers,
        }
    }

    #[test]
    fn test_redirect_statuses() {
        for status in [301, 302, 303, 307, 308] {
            assert!(hop(status, Some("/x")).is_redirect());
        }
        assert!(!hop(200, None).is_redirect());
        assert!(!hop(304, None).is_redirect());
    }

    #[test]
    fn test_blank_location_is_missing() {
        assert_eq!(hop(302, Some("  ")).location(), None);
        assert_eq!(hop(302, Some("/next")).location(), Some("/next"));
    }

    #[test]
    fn test_head_meaningfulness() {
        assert!(hop(200, None).head_was_meaningful());
        assert!(hop(302, Some("/x")).head_was_meaningful());
        assert!(!hop(405, None).head_was_meaningful());
        assert!(!hop(404, None).head_was_meaningful());
    }
}
