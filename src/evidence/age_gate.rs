//! Age verification vocabulary.

/// Phrases that indicate an adult-content warning or age gate.
pub const AGE_GATE_PHRASES: &[&str] = &[
    "18+",
    "18 plus",
    "age verification",
    "age gate",
    "age check",
    "confirm age",
    "verify age",
    "enter site",
    "i'm 18+",
    "i am 18+",
    "adult content",
    "mature content",
    "nsfw",
    "explicit content",
    "click to enter",
    "proceed to site",
    "continue to site",
    "age confirmation",
    "age verification required",
    "adult warning",
    "mature warning",
    "explicit warning",
    "adult site",
    "mature site",
];

/// Distinct age-gate phrases found in `text`.
///
/// A phrase that only matched as part of a longer matched phrase is not
/// counted separately ("18+" inside "i'm 18+").
pub fn age_gate_indicators(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    let matched: Vec<&'static str> = AGE_GATE_PHRASES
        .iter()
        .copied()
        .filter(|phrase| lower.contains(phrase))
        .collect();

    matched
        .iter()
        .copied()
        .filter(|phrase| {
            !matched
                .iter()
                .any(|other| other.len() > phrase.len() && other.contains(phrase))
        })
        .collect()
}

pub fn has_age_gate_signal(text: &str) -> bool {
    let lower = text.to_lowercase();
    AGE_GATE_PHRASES.iter().any(|phrase| lower.contains(phrase))
}
