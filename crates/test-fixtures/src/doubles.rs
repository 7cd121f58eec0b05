//! Deterministic stand-ins for the external classifier and generator services.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use regex::Regex;

use veil_core::errors::{VeilError, VeilResult};
use veil_core::models::{Category, Detection};
use veil_core::traits::{GenerationRequest, IClassifier, ISubstituteGenerator};

const FIRST_NAMES: &[&str] = &["Jordan", "Casey", "Riley", "Morgan", "Avery", "Quinn"];
const LAST_NAMES: &[&str] = &["Lee", "Park", "Reyes", "Novak", "Okafor", "Lind"];

/// Regex-driven classifier. Matches for categories the caller did not ask
/// for are dropped.
pub struct PatternClassifier {
    patterns: Vec<(Category, Regex)>,
    calls: AtomicUsize,
}

impl PatternClassifier {
    /// # Panics
    /// Panics on an invalid pattern.
    pub fn new(patterns: &[(&str, &str)]) -> Self {
        let patterns = patterns
            .iter()
            .map(|(category, pattern)| {
                let re = Regex::new(pattern)
                    .unwrap_or_else(|e| panic!("bad fixture pattern {pattern}: {e}"));
                (Category::new(category), re)
            })
            .collect();
        Self {
            patterns,
            calls: AtomicUsize::new(0),
        }
    }

    /// Emails, phone numbers, SSNs and a fixed set of person names,
    /// including every name `SequenceGenerator` produces.
    pub fn standard() -> Self {
        Self::new(&[
            ("EMAIL_ADDRESS", r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}"),
            ("PHONE_NUMBER", r"\b\d{3}-\d{3}-\d{4}\b"),
            ("US_SOCIAL_SECURITY_NUMBER", r"\b\d{3}-\d{2}-\d{4}\b"),
            (
                "PERSON_NAME",
                r"\b(?:Alice|Bob|Carol|Dave|Jordan|Casey|Riley|Morgan|Avery|Quinn) [A-Z][a-z]+\b",
            ),
        ])
    }

    /// Number of `detect` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl IClassifier for PatternClassifier {
    fn detect(&self, text: &str, info_types: &[Category]) -> VeilResult<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let mut detections: Vec<Detection> = self
            .patterns
            .iter()
            .filter(|(category, _)| info_types.contains(category))
            .flat_map(|(category, re)| {
                re.find_iter(text)
                    .map(|m| Detection::new(m.start(), m.end(), category.clone()))
            })
            .collect();
        detections.sort_by_key(|d| (d.start, d.end));
        Ok(detections)
    }
}

/// Classifier whose service is down.
pub struct UnavailableClassifier;

impl IClassifier for UnavailableClassifier {
    fn detect(&self, _text: &str, _info_types: &[Category]) -> VeilResult<Vec<Detection>> {
        Err(VeilError::ServiceUnavailable {
            service: "classifier".into(),
            reason: "connection refused".into(),
        })
    }
}

/// Realistic-looking values from a shared counter, never the same twice
/// within a category's format range.
#[derive(Default)]
pub struct SequenceGenerator {
    counter: AtomicU64,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values handed out so far.
    pub fn generated(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl ISubstituteGenerator for SequenceGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> VeilResult<String> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let value = match request.category.as_str() {
            "EMAIL_ADDRESS" => format!("user{n}@example.net"),
            "PHONE_NUMBER" => format!("555-{:03}-{:04}", (n / 10_000) % 1_000, n % 10_000),
            "US_SOCIAL_SECURITY_NUMBER" => format!("900-{:02}-{:04}", (n / 10_000) % 100, n % 10_000),
            "PERSON_NAME" => {
                let first = FIRST_NAMES[(n as usize) % FIRST_NAMES.len()];
                let last = LAST_NAMES[(n as usize / FIRST_NAMES.len()) % LAST_NAMES.len()];
                format!("{first} {last}")
            }
            _ => format!("{}-{n}", request.category.token_label().to_ascii_lowercase()),
        };
        Ok(value)
    }
}

/// Always proposes the same value. Useful for collision and exhaustion paths.
pub struct FixedGenerator {
    value: String,
    calls: AtomicUsize,
}

impl FixedGenerator {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl ISubstituteGenerator for FixedGenerator {
    fn generate(&self, _request: &GenerationRequest<'_>) -> VeilResult<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.value.clone())
    }
}
