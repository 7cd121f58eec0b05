use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;
use test_fixtures::PatternClassifier;
use veil::{Anonymizer, AnonymizerMode, VeilConfig};

fn anonymizer(scope: &str) -> Anonymizer {
    Anonymizer::builder(VeilConfig {
        collection_name: scope.to_string(),
        info_types: vec!["EMAIL_ADDRESS".into()],
        mode: AnonymizerMode::Strict,
        use_realistic_fake_data: false,
        ..VeilConfig::default()
    })
    .classifier(Arc::new(PatternClassifier::standard()))
    .build()
    .unwrap()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn deanonymize_inverts_anonymize(users in prop::collection::vec("[a-z]{1,8}", 1..8)) {
        let text = users
            .iter()
            .map(|u| format!("{u}@corp.com"))
            .collect::<Vec<_>>()
            .join(" ; ");
        let (masked, restored) = runtime().block_on(async {
            let anon = anonymizer("roundtrip");
            let masked = anon.anonymize(&text).await.unwrap();
            let restored = anon.deanonymize(&masked).await.unwrap();
            (masked, restored)
        });
        prop_assert!(!masked.contains("@corp.com"));
        prop_assert_eq!(restored, text);
    }

    #[test]
    fn substitutes_form_a_bijection(users in prop::collection::vec("[a-z]{1,6}", 1..12)) {
        let pairs = runtime().block_on(async {
            let anon = anonymizer("bijection");
            let mut pairs = Vec::new();
            for u in &users {
                let email = format!("{u}@corp.com");
                let sub = anon.anonymize(&email).await.unwrap();
                pairs.push((email, sub));
            }
            pairs
        });

        let mut forward: HashMap<&str, &str> = HashMap::new();
        let mut backward: HashMap<&str, &str> = HashMap::new();
        for (email, sub) in &pairs {
            if let Some(prev) = forward.insert(email, sub) {
                prop_assert_eq!(prev, sub.as_str(), "unstable substitute for {}", email);
            }
            if let Some(prev) = backward.insert(sub, email) {
                prop_assert_eq!(prev, email.as_str(), "substitute {} shared", sub);
            }
        }
    }
}
