//! Error taxonomy for the detection pipeline.
//!
//! Only `InvalidTarget`, `BatchTooLarge` and `Config` ever reach a caller as
//! errors. Everything else is produced inside a phase and folded into the
//! `errors` list of a [`DetectionResult`](crate::models::DetectionResult).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProbeError>;

#[derive(Debug, Error)]
pub enum ProbeError {
    /// DNS, TLS, refused connections and other network failures.
    #[error("transport error: {0}")]
    Transport(String),

    /// A request or navigation ran past its time allowance.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Rendering engine launch, navigation or scripting failure.
    #[error("render engine error: {0}")]
    Render(String),

    /// No rendering engine could be reached.
    #[error("render engine unavailable: {0}")]
    BrowserUnavailable(String),

    /// Missing or unusable target URL.
    #[error("invalid target URL '{url}': {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error("batch of {got} targets exceeds the maximum of {max}")]
    BatchTooLarge { got: usize, max: usize },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ProbeError {
    pub fn invalid_target(url: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Errors that are only ever raised before the pipeline starts.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTarget { .. } | Self::BatchTooLarge { .. }
        )
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeError::Timeout(err.to_string())
        } else {
            ProbeError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(ProbeError::invalid_target("nope", "missing host").is_client_error());
        assert!(ProbeError::BatchTooLarge { got: 101, max: 100 }.is_client_error());
        assert!(!ProbeError::Transport("refused".into()).is_client_error());
        assert!(!ProbeError::Render("launch failed".into()).is_client_error());
    }

    #[test]
    fn test_invalid_target_message() {
        let err = ProbeError::invalid_target("ftp://x", "unsupported scheme");
        assert_eq!(
            err.to_string(),
            "invalid target URL 'ftp://x': unsupported scheme"
        );
    }
}
