//! End-to-end anonymize / deanonymize through the facade, backed by the
//! test-fixtures classifier and generators.

use std::sync::Arc;

use serde::Deserialize;

use test_fixtures::{
    load_fixture, FaultyStore, FixedGenerator, PatternClassifier, SequenceGenerator, UnavailableClassifier,
};
use veil::{
    Anonymizer, AnonymizerMode, Category, Detection, EncryptionKey, IClassifier, IDurableStore,
    InfoTypeCategory, ItemStatus, StorageType, VeilConfig, VeilError, VeilResult,
};
use veil_storage::MemoryDurableStore;

fn config(scope: &str, mode: AnonymizerMode) -> VeilConfig {
    VeilConfig {
        collection_name: scope.to_string(),
        info_types: vec!["EMAIL_ADDRESS".into(), "PHONE_NUMBER".into(), "PERSON_NAME".into()],
        mode,
        use_realistic_fake_data: false,
        ..VeilConfig::default()
    }
}

fn token_anonymizer(config: VeilConfig) -> Anonymizer {
    Anonymizer::builder(config)
        .classifier(Arc::new(PatternClassifier::standard()))
        .build()
        .unwrap()
}

#[derive(Debug, Deserialize)]
struct RepeatedEmail {
    text: String,
    original: String,
    calls: usize,
}

#[derive(Debug, Deserialize)]
struct Span {
    original: String,
}

#[derive(Debug, Deserialize)]
struct MixedCategories {
    text: String,
    spans: Vec<Span>,
    distinct_originals: u64,
}

#[derive(Debug, Deserialize)]
struct BatchTexts {
    texts: Vec<String>,
    distinct_originals: u64,
    total_spans: u64,
}

// ---------------------------------------------------------------------------
// Golden scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeated_email_generates_once() {
    let golden: RepeatedEmail = load_fixture("anonymization/repeated_email.json");
    let anon = token_anonymizer(config("repeat", AnonymizerMode::Strict));

    let mut outputs = Vec::new();
    for call in 0..golden.calls {
        let result = anon.anonymize_detailed(&golden.text).await.unwrap();
        if call == 0 {
            assert_eq!(result.stats.new_generations, 1);
            assert_eq!(result.stats.cache_hits, 0);
        } else {
            assert_eq!(result.stats.new_generations, 0);
            assert_eq!(result.stats.cache_hits, 1);
        }
        assert!(!result.anonymized_text.contains(&golden.original));
        outputs.push(result.anonymized_text);
    }
    assert!(outputs.iter().all(|o| o == &outputs[0]));
    assert_eq!(outputs[0], "Contact me at <EMAIL_ADDRESS_1>");
}

#[tokio::test]
async fn mixed_categories_round_trip() {
    let golden: MixedCategories = load_fixture("anonymization/mixed_categories.json");
    let anon = token_anonymizer(config("mixed", AnonymizerMode::Strict));

    let result = anon.anonymize_detailed(&golden.text).await.unwrap();
    for span in &golden.spans {
        assert!(
            !result.anonymized_text.contains(&span.original),
            "{} leaked into {}",
            span.original,
            result.anonymized_text
        );
    }
    assert_eq!(result.stats.new_generations, golden.distinct_originals);
    assert_eq!(result.stats.cache_hits, 1);

    assert_eq!(anon.deanonymize(&result.anonymized_text).await.unwrap(), golden.text);
}

#[tokio::test]
async fn batch_stats_equal_sum_of_single_calls() {
    let golden: BatchTexts = load_fixture("anonymization/batch_texts.json");
    let batch_anon = token_anonymizer(config("batch", AnonymizerMode::Strict));
    let single_anon = token_anonymizer(config("single", AnonymizerMode::Strict));

    let batch = batch_anon.anonymize_batch(golden.texts.as_slice()).await.unwrap();
    assert_eq!(batch.items.len(), golden.texts.len());
    assert_eq!(batch.degraded(), 0);
    assert_eq!(batch.stats.new_generations, golden.distinct_originals);
    assert_eq!(batch.stats.snapshot().total_lookups(), golden.total_spans);
    assert_eq!(batch.items[3].text, "No sensitive content here");

    let mut summed = veil_core::models::StatsSnapshot::default();
    for text in &golden.texts {
        summed = summed + anon_stats(&single_anon, text).await;
    }
    assert_eq!(batch.stats.snapshot(), summed);

    for (item, original) in batch.items.iter().zip(&golden.texts) {
        assert_eq!(&batch_anon.deanonymize(&item.text).await.unwrap(), original);
    }
}

async fn anon_stats(anon: &Anonymizer, text: &str) -> veil_core::models::StatsSnapshot {
    anon.anonymize_detailed(text).await.unwrap().stats.snapshot()
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn realistic_substitutes_round_trip() {
    let anon = Anonymizer::builder(VeilConfig {
        use_realistic_fake_data: true,
        ..config("realistic", AnonymizerMode::Strict)
    })
    .classifier(Arc::new(PatternClassifier::standard()))
    .generator(Arc::new(SequenceGenerator::new()))
    .build()
    .unwrap();

    let text = "Alice Smith wrote from alice@corp.com, call 415-555-0100.";
    let masked = anon.anonymize(text).await.unwrap();
    assert!(!masked.contains("Alice Smith"));
    assert!(!masked.contains("alice@corp.com"));
    assert!(!masked.contains("415-555-0100"));
    assert!(!masked.contains('<'));

    assert_eq!(anon.deanonymize(&masked).await.unwrap(), text);
}

#[tokio::test]
async fn unknown_tokens_pass_through_deanonymize() {
    let anon = token_anonymizer(config("unknown", AnonymizerMode::Strict));
    let text = "see <EMAIL_ADDRESS_99> and <html> and bob@corp.com";
    assert_eq!(anon.deanonymize(text).await.unwrap(), text);
}

#[tokio::test]
async fn scopes_do_not_share_mappings() {
    let store: Arc<dyn IDurableStore> = Arc::new(MemoryDurableStore::new());
    let build = |scope: &str| {
        Anonymizer::builder(config(scope, AnonymizerMode::Strict))
            .classifier(Arc::new(PatternClassifier::standard()))
            .store(Arc::clone(&store))
            .build()
            .unwrap()
    };
    let a = build("tenant-a");
    let b = build("tenant-b");

    let masked_a = a.anonymize("alice@corp.com").await.unwrap();
    let masked_b = b.anonymize("bob@corp.com").await.unwrap();
    assert_eq!(masked_a, masked_b);

    assert_eq!(a.deanonymize(&masked_a).await.unwrap(), "alice@corp.com");
    assert_eq!(b.deanonymize(&masked_a).await.unwrap(), "bob@corp.com");
}

// ---------------------------------------------------------------------------
// Strict vs tolerant
// ---------------------------------------------------------------------------

fn faulty_anonymizer(mode: AnonymizerMode) -> (Anonymizer, Arc<FaultyStore>) {
    let store = Arc::new(FaultyStore::new(Arc::new(MemoryDurableStore::new())));
    let anon = Anonymizer::builder(config("faulty", mode))
        .classifier(Arc::new(PatternClassifier::standard()))
        .store(store.clone())
        .build()
        .unwrap();
    (anon, store)
}

#[tokio::test]
async fn strict_mode_aborts_on_store_failure() {
    let (anon, store) = faulty_anonymizer(AnonymizerMode::Strict);
    store.set_fail_reads(true);

    let err = anon.anonymize("mail alice@corp.com").await.unwrap_err();
    assert!(matches!(err, VeilError::StorageError(_)));

    let err = anon
        .anonymize_batch(&["ok text", "mail alice@corp.com"])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "storage_error");
}

#[tokio::test]
async fn tolerant_mode_passes_failed_spans_through() {
    let (anon, store) = faulty_anonymizer(AnonymizerMode::Tolerant);
    let masked = anon.anonymize("call 415-555-0100").await.unwrap();
    assert_eq!(masked, "call <PHONE_NUMBER_1>");

    store.set_fail_reads(true);
    let text = "mail alice@corp.com or call 415-555-0100";
    // The phone number is still cached; the email needs the store.
    assert_eq!(anon.anonymize(text).await.unwrap(), "mail alice@corp.com or call <PHONE_NUMBER_1>");

    let batch = anon.anonymize_batch(&[text, "nothing here"]).await.unwrap();
    assert_eq!(batch.degraded(), 1);
    match &batch.items[0].status {
        ItemStatus::Degraded { passed_through, errors } => {
            assert_eq!(*passed_through, 1);
            assert_eq!(errors[0].kind, "storage_error");
            assert_eq!(errors[0].category.as_deref(), Some("EMAIL_ADDRESS"));
        }
        other => panic!("expected degraded, got {other:?}"),
    }
    assert!(batch.items[1].status.is_complete());
}

#[tokio::test]
async fn detailed_result_reports_passed_through_spans() {
    let (anon, store) = faulty_anonymizer(AnonymizerMode::Tolerant);
    let clean = anon.anonymize_detailed("call 415-555-0100").await.unwrap();
    assert!(clean.status.is_complete());

    store.set_fail_reads(true);
    let result = anon.anonymize_detailed("mail alice@corp.com").await.unwrap();
    assert_eq!(result.anonymized_text, "mail alice@corp.com");
    match result.status {
        ItemStatus::Degraded { passed_through, errors } => {
            assert_eq!(passed_through, 1);
            assert_eq!(errors[0].category.as_deref(), Some("EMAIL_ADDRESS"));
        }
        other => panic!("expected degraded, got {other:?}"),
    }
}

#[tokio::test]
async fn classifier_outage_follows_mode() {
    let build = |mode| {
        Anonymizer::builder(config("outage", mode))
            .classifier(Arc::new(UnavailableClassifier))
            .build()
            .unwrap()
    };

    let err = build(AnonymizerMode::Strict).anonymize("alice@corp.com").await.unwrap_err();
    assert!(matches!(err, VeilError::ServiceUnavailable { .. }));

    let tolerant = build(AnonymizerMode::Tolerant);
    assert_eq!(tolerant.anonymize("alice@corp.com").await.unwrap(), "alice@corp.com");
    let batch = tolerant.anonymize_batch(&["alice@corp.com"]).await.unwrap();
    match &batch.items[0].status {
        ItemStatus::Degraded { errors, .. } => {
            assert_eq!(errors[0].kind, "service_unavailable");
            assert_eq!(errors[0].category, None);
        }
        other => panic!("expected degraded, got {other:?}"),
    }
}

/// Reports an SSN in every text regardless of what was asked for.
struct OverEagerClassifier;

impl IClassifier for OverEagerClassifier {
    fn detect(&self, text: &str, _info_types: &[Category]) -> VeilResult<Vec<Detection>> {
        Ok(text
            .find("123-45-6789")
            .map(|start| vec![Detection::new(start, start + 11, "US_SOCIAL_SECURITY_NUMBER")])
            .unwrap_or_default())
    }
}

#[tokio::test]
async fn unconfigured_category_follows_mode() {
    let build = |mode| {
        Anonymizer::builder(config("cats", mode))
            .classifier(Arc::new(OverEagerClassifier))
            .build()
            .unwrap()
    };
    let text = "ssn 123-45-6789";

    let err = build(AnonymizerMode::Strict).anonymize(text).await.unwrap_err();
    assert!(matches!(err, VeilError::CategoryNotSupported { .. }));
    assert_eq!(build(AnonymizerMode::Tolerant).anonymize(text).await.unwrap(), text);
}

#[tokio::test]
async fn allocation_exhaustion_surfaces_in_tolerant_mode() {
    let anon = Anonymizer::builder(VeilConfig {
        use_realistic_fake_data: true,
        max_allocation_attempts: 3,
        ..config("exhaust", AnonymizerMode::Tolerant)
    })
    .classifier(Arc::new(PatternClassifier::standard()))
    .generator(Arc::new(FixedGenerator::new("Jordan Lee")))
    .build()
    .unwrap();

    assert_eq!(anon.anonymize("Alice Smith").await.unwrap(), "Jordan Lee");
    let err = anon.anonymize("Bob Jones").await.unwrap_err();
    assert!(matches!(err, VeilError::AllocationExhausted { attempts: 3, .. }));
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_scope_makes_tokens_unresolvable() {
    let anon = token_anonymizer(config("delete", AnonymizerMode::Strict));
    let masked = anon.anonymize("alice@corp.com and bob@corp.com").await.unwrap();

    assert_eq!(anon.delete_scope().await.unwrap(), 2);
    assert_eq!(anon.deanonymize(&masked).await.unwrap(), masked);
}

#[tokio::test]
async fn async_writes_land_after_flush() {
    let store = Arc::new(MemoryDurableStore::new());
    let anon = Anonymizer::builder(VeilConfig {
        async_storage_updates: true,
        ..config("async", AnonymizerMode::Strict)
    })
    .classifier(Arc::new(PatternClassifier::standard()))
    .store(store.clone())
    .build()
    .unwrap();

    let masked = anon.anonymize("alice@corp.com").await.unwrap();
    anon.flush().await;

    let persisted = anon.persist_stats().unwrap();
    assert_eq!(persisted.completed, 1);
    assert_eq!(persisted.dropped, 0);
    assert_eq!(store.count(anon.scope()).unwrap(), 1);
    assert_eq!(anon.deanonymize(&masked).await.unwrap(), "alice@corp.com");
    anon.shutdown().await;
}

#[tokio::test]
async fn document_collection_survives_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("veil.db");
    let mut cfg = VeilConfig {
        storage_type: StorageType::DocumentCollection,
        encryption_key: Some(EncryptionKey::new("s3cret")),
        ..config("durable", AnonymizerMode::Strict)
    };
    cfg.storage_config.db_path = db_path.to_string_lossy().into_owned();

    let masked = {
        let anon = token_anonymizer(cfg.clone());
        anon.anonymize("alice@corp.com").await.unwrap()
    };

    let anon = token_anonymizer(cfg.clone());
    let result = anon.anonymize_detailed("alice@corp.com").await.unwrap();
    assert_eq!(result.anonymized_text, masked);
    assert_eq!(result.stats.storage_hits, 1);
    assert_eq!(anon.deanonymize(&masked).await.unwrap(), "alice@corp.com");

    let mut wrong_key = cfg;
    wrong_key.encryption_key = Some(EncryptionKey::new("other"));
    wrong_key.mode = AnonymizerMode::Tolerant;
    let err = token_anonymizer(wrong_key).deanonymize(&masked).await.unwrap_err();
    assert!(matches!(err, VeilError::DecryptionError { .. }));
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[test]
fn builder_rejects_incomplete_setups() {
    let err = Anonymizer::builder(config("b", AnonymizerMode::Strict)).build().unwrap_err();
    assert!(matches!(err, VeilError::ConfigurationError { .. }));

    let err = Anonymizer::builder(VeilConfig {
        use_realistic_fake_data: true,
        ..config("b", AnonymizerMode::Strict)
    })
    .classifier(Arc::new(PatternClassifier::standard()))
    .build()
    .unwrap_err();
    assert!(err.to_string().contains("generator"));

    let err = Anonymizer::builder(config("  ", AnonymizerMode::Strict))
        .classifier(Arc::new(PatternClassifier::standard()))
        .build()
        .unwrap_err();
    assert!(err.is_always_fatal());
}

#[cfg(not(feature = "networked"))]
#[test]
fn networked_cache_needs_the_feature() {
    let mut cfg = config("b", AnonymizerMode::Strict);
    cfg.cache_type = veil::CacheType::NetworkedCache;
    cfg.cache_config.host = Some("127.0.0.1".into());
    let err = Anonymizer::builder(cfg)
        .classifier(Arc::new(PatternClassifier::standard()))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("networked"));
}

#[test]
fn categories_group_configured_info_types() {
    let anon = token_anonymizer(config("cats", AnonymizerMode::Strict));
    assert_eq!(anon.categories(), vec![InfoTypeCategory::Contact, InfoTypeCategory::Personal]);
    assert_eq!(anon.info_types().len(), 3);
}
