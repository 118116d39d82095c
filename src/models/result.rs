//! Detection result returned for every probe.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How much weight a match carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Backed by at least one evidence URL.
    High,
    /// Inferred from text alone (brand mention, age gate).
    Low,
}

/// Outcome of one detection call.
///
/// `diagnostics` is an append-only audit trail: every attempted or skipped
/// phase leaves at least one entry, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Normalized target URL, or the raw input when it could not be parsed.
    pub target: String,
    pub matched: bool,
    pub evidence_urls: BTreeSet<String>,
    pub method: Option<String>,
    pub confidence: Option<Confidence>,
    pub age_gate_detected: bool,
    pub diagnostics: Vec<String>,
    pub errors: Vec<String>,
    pub phase_reached: String,
    pub budget_exhausted: bool,
    pub probe_id: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl DetectionResult {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            matched: false,
            evidence_urls: BTreeSet::new(),
            method: None,
            confidence: None,
            age_gate_detected: false,
            diagnostics: Vec::new(),
            errors: Vec::new(),
            phase_reached: "idle".to_string(),
            budget_exhausted: false,
            probe_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            elapsed_ms: 0,
        }
    }

    /// Result for a target that never entered the pipeline.
    pub fn rejected(target: impl Into<String>, error: impl Into<String>) -> Self {
        let mut result = Self::new(target);
        result.errors.push(error.into());
        result
    }

    pub fn note(&mut self, entry: impl Into<String>) {
        self.diagnostics.push(entry.into());
    }

    pub fn record_error(&mut self, entry: impl Into<String>) {
        self.errors.push(entry.into());
    }

    /// Mark the result as matched.
    ///
    /// A low-confidence match may carry no URLs; `method` then explains what
    /// the match rests on.
    pub fn record_match<I>(&mut self, method: impl Into<String>, urls: I, confidence: Confidence)
    where
        I: IntoIterator<Item = String>,
    {
        self.matched = true;
        self.method = Some(method.into());
        self.evidence_urls.extend(urls);
        self.confidence = Some(confidence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_result_is_unmatched_idle() {
        let result = DetectionResult::new("https://agg.example/a");
        assert!(!result.matched);
        assert_eq!(result.phase_reached, "idle");
        assert!(result.evidence_urls.is_empty());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_record_match_dedupes_urls() {
        let mut result = DetectionResult::new("https://agg.example/a");
        result.record_match(
            "phase1_direct_scan",
            vec![
                "https://target.example/a".to_string(),
                "https://target.example/a".to_string(),
            ],
            Confidence::High,
        );
        assert!(result.matched);
        assert_eq!(result.evidence_urls.len(), 1);
        assert_eq!(result.confidence, Some(Confidence::High));
    }

    #[test]
    fn test_serializes_confidence_lowercase() {
        let mut result = DetectionResult::new("https://agg.example/a");
        result.record_match("phase5_text_mining:brand_mention", Vec::new(), Confidence::Low);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["confidence"], "low");
        assert_eq!(json["matched"], true);
        assert!(json["evidence_urls"].as_array().unwrap().is_empty());
    }
}
