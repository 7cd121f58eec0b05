//! The outward facade: detect, substitute, reverse.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use regex::Regex;
use tracing::Instrument;

use veil_core::config::VeilConfig;
use veil_core::errors::{VeilError, VeilResult};
use veil_core::models::{CacheStatus, Category, Detection, InfoTypeCatalog, InfoTypeCategory, ScopeId};
use veil_core::traits::IClassifier;
use veil_mapping::{MappingCoordinator, PersistQueueStats, StatsTracker};
use veil_observability::{anonymize_span, batch_span, deanonymize_span, resolve_span};

use crate::builder::AnonymizerBuilder;
use crate::policy::ModePolicy;
use crate::result::{AnonymizationResult, AnonymizationStats, BatchItem, BatchResult, ItemStatus, SpanError};

/// `<LABEL_n>` placeholders minted by the token policy.
pub(crate) const TOKEN_PATTERN: &str = r"<[A-Z][A-Z0-9_]*_\d+>";

/// Anonymizes and de-anonymizes text within one mapping scope.
///
/// Must be used from inside a tokio runtime; backend and classifier calls
/// run on its blocking pool.
pub struct Anonymizer {
    config: VeilConfig,
    classifier: Arc<dyn IClassifier>,
    coordinator: MappingCoordinator,
    policy: ModePolicy,
    token_pattern: Regex,
}

impl std::fmt::Debug for Anonymizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Anonymizer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Anonymizer {
    pub fn builder(config: VeilConfig) -> AnonymizerBuilder {
        AnonymizerBuilder::new(config)
    }

    pub(crate) fn from_parts(
        config: VeilConfig,
        classifier: Arc<dyn IClassifier>,
        coordinator: MappingCoordinator,
        token_pattern: Regex,
    ) -> Self {
        Self {
            policy: ModePolicy::new(config.mode),
            config,
            classifier,
            coordinator,
            token_pattern,
        }
    }

    pub fn config(&self) -> &VeilConfig {
        &self.config
    }

    pub fn scope(&self) -> &ScopeId {
        self.coordinator.scope()
    }

    /// Info types this anonymizer asks the classifier for and accepts.
    pub fn info_types(&self) -> &[Category] {
        self.coordinator.categories()
    }

    /// Broad categories covered by the configured info types.
    pub fn categories(&self) -> Vec<InfoTypeCategory> {
        InfoTypeCatalog::groups_for(self.info_types())
    }

    pub fn cache_status(&self) -> CacheStatus {
        self.coordinator.cache_status()
    }

    /// Counters of the async durable write path. `None` in sync mode.
    pub fn persist_stats(&self) -> Option<PersistQueueStats> {
        self.coordinator.persist_stats()
    }

    pub async fn anonymize(&self, text: &str) -> VeilResult<String> {
        Ok(self.anonymize_detailed(text).await?.anonymized_text)
    }

    /// Anonymize one text and report the lookups it took.
    pub async fn anonymize_detailed(&self, text: &str) -> VeilResult<AnonymizationResult> {
        let stats = StatsTracker::new();
        let (anonymized_text, errors) = self
            .anonymize_text(text, &stats)
            .instrument(anonymize_span!(self.scope(), text.len()))
            .await?;
        Ok(AnonymizationResult {
            anonymized_text,
            stats: AnonymizationStats::new(stats.snapshot(), self.cache_status()),
            status: ItemStatus::from_errors(errors),
        })
    }

    /// Anonymize independent texts concurrently, up to `batch_concurrency`.
    ///
    /// Items come back in input order. Strict mode aborts the whole batch on
    /// the first failure; tolerant mode reports degraded items instead.
    pub async fn anonymize_batch<S>(&self, texts: &[S]) -> VeilResult<BatchResult>
    where
        S: AsRef<str> + Sync,
    {
        let stats = StatsTracker::new();
        let tracker = &stats;
        let items: Vec<BatchItem> = stream::iter(texts)
            .map(|text| async move {
                let (text, errors) = self.anonymize_text(text.as_ref(), tracker).await?;
                Ok::<_, VeilError>(BatchItem {
                    text,
                    status: ItemStatus::from_errors(errors),
                })
            })
            .buffered(self.config.batch_concurrency)
            .try_collect()
            .instrument(batch_span!(self.scope(), texts.len()))
            .await?;
        Ok(BatchResult {
            items,
            stats: AnonymizationStats::new(stats.snapshot(), self.cache_status()),
        })
    }

    /// Replace every substitute this scope produced with its original.
    /// Anything else, token-shaped or not, is left as it is.
    pub async fn deanonymize(&self, text: &str) -> VeilResult<String> {
        self.deanonymize_text(text)
            .instrument(deanonymize_span!(self.scope(), text.len()))
            .await
    }

    /// Remove every mapping of this scope from the store and the cache tier.
    pub async fn delete_scope(&self) -> VeilResult<usize> {
        self.coordinator.delete_scope().await
    }

    /// Drop durable records whose TTL has passed.
    pub async fn purge_expired(&self) -> VeilResult<usize> {
        self.coordinator.purge_expired().await
    }

    /// Wait for pending async durable writes.
    pub async fn flush(&self) {
        self.coordinator.flush().await;
    }

    /// Drain pending writes and stop background work.
    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
    }

    async fn anonymize_text(
        &self,
        text: &str,
        stats: &StatsTracker,
    ) -> VeilResult<(String, Vec<SpanError>)> {
        let mut errors = Vec::new();
        let detections = match self.classify(text).await {
            Ok(found) => found,
            Err(e) => {
                errors.push(self.policy.absorb(self.scope(), None, e)?);
                return Ok((text.to_string(), errors));
            }
        };

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for detection in non_overlapping(text, detections) {
            let Some(original) = detection.slice(text) else {
                continue;
            };
            let category = &detection.category;
            let replacement = match self
                .coordinator
                .resolve_forward(original, category, stats)
                .instrument(resolve_span!(self.scope(), category))
                .await
            {
                Ok(substitute) => substitute,
                Err(e) => {
                    errors.push(self.policy.absorb(self.scope(), Some(category.as_str()), e)?);
                    original.to_string()
                }
            };
            out.push_str(&text[cursor..detection.start]);
            out.push_str(&replacement);
            cursor = detection.end;
        }
        out.push_str(&text[cursor..]);
        Ok((out, errors))
    }

    async fn deanonymize_text(&self, text: &str) -> VeilResult<String> {
        let stats = StatsTracker::new();
        let mut candidates: Vec<Detection> = self
            .token_pattern
            .find_iter(text)
            .map(|m| Detection::new(m.start(), m.end(), token_label(m.as_str())))
            .collect();
        // Realistic substitutes look like ordinary values, so only the
        // classifier can find them.
        match self.classify(text).await {
            Ok(found) => candidates.extend(found),
            Err(e) => {
                self.policy.absorb(self.scope(), None, e)?;
            }
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for candidate in non_overlapping(text, candidates) {
            let Some(substitute) = candidate.slice(text) else {
                continue;
            };
            let restored = match self.coordinator.resolve_backward(substitute, &stats).await {
                Ok(Some(original)) => original,
                Ok(None) => substitute.to_string(),
                Err(e) => {
                    self.policy
                        .absorb(self.scope(), Some(candidate.category.as_str()), e)?;
                    substitute.to_string()
                }
            };
            out.push_str(&text[cursor..candidate.start]);
            out.push_str(&restored);
            cursor = candidate.end;
        }
        out.push_str(&text[cursor..]);
        Ok(out)
    }

    async fn classify(&self, text: &str) -> VeilResult<Vec<Detection>> {
        let classifier = Arc::clone(&self.classifier);
        let text = text.to_string();
        let info_types = self.info_types().to_vec();
        tokio::task::spawn_blocking(move || classifier.detect(&text, &info_types))
            .await
            .map_err(|e| VeilError::ServiceUnavailable {
                service: "classifier".into(),
                reason: e.to_string(),
            })?
    }
}

/// Drop spans that don't fit the text, then keep the earliest (longest on a
/// tie) of any overlapping group. Result is sorted and disjoint.
fn non_overlapping(text: &str, mut spans: Vec<Detection>) -> Vec<Detection> {
    spans.retain(|d| d.slice(text).is_some());
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    let mut kept: Vec<Detection> = Vec::with_capacity(spans.len());
    for span in spans {
        if kept.last().is_some_and(|last| last.overlaps(&span)) {
            continue;
        }
        kept.push(span);
    }
    kept
}

/// `<EMAIL_ADDRESS_3>` -> `EMAIL_ADDRESS`.
fn token_label(token: &str) -> Category {
    let inner = token.trim_start_matches('<').trim_end_matches('>');
    let label = inner.rsplit_once('_').map_or(inner, |(label, _)| label);
    Category::new(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_spans_keep_the_earliest_longest() {
        let text = "Alice Smith at alice@corp.com";
        let spans = vec![
            Detection::new(15, 29, "EMAIL_ADDRESS"),
            Detection::new(0, 5, "PERSON_NAME"),
            Detection::new(0, 11, "PERSON_NAME"),
            Detection::new(6, 14, "LOCATION"),
        ];
        let kept = non_overlapping(text, spans);
        let slices: Vec<&str> = kept.iter().map(|d| d.slice(text).unwrap()).collect();
        assert_eq!(slices, vec!["Alice Smith", "alice@corp.com"]);
    }

    #[test]
    fn out_of_range_spans_are_dropped() {
        let kept = non_overlapping("short", vec![Detection::new(2, 40, "X"), Detection::new(3, 3, "X")]);
        assert!(kept.is_empty());
    }

    #[test]
    fn token_label_strips_counter() {
        assert_eq!(token_label("<EMAIL_ADDRESS_12>"), Category::new("EMAIL_ADDRESS"));
        assert_eq!(token_label("<PERSON_1>"), Category::new("PERSON"));
    }

    #[test]
    fn token_pattern_matches_minted_tokens_only() {
        let re = Regex::new(TOKEN_PATTERN).unwrap();
        let found: Vec<&str> = re
            .find_iter("a <EMAIL_ADDRESS_1> b <html> c <X_2> <lower_3>")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, vec!["<EMAIL_ADDRESS_1>", "<X_2>"]);
    }
}
