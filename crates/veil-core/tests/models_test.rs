use std::time::Duration;

use chrono::Utc;
use proptest::prelude::*;
use veil_core::models::*;

#[test]
fn category_is_normalized() {
    assert_eq!(Category::new(" email_address "), Category::new("EMAIL_ADDRESS"));
    assert_eq!(Category::new("person-name").token_label(), "PERSON_NAME");
}

#[test]
fn mapping_entry_debug_hides_original() {
    let entry = MappingEntry::new(
        ScopeId::new("s"),
        Category::new("EMAIL_ADDRESS"),
        "john.smith@example.com",
        "john.smith@example.com",
        "<EMAIL_ADDRESS_1>",
    );
    let rendered = format!("{entry:?}");
    assert!(!rendered.contains("john.smith"));
    assert!(rendered.contains("<EMAIL_ADDRESS_1>"));
}

#[test]
fn mapping_entry_ttl_sets_future_deadline() {
    let entry = MappingEntry::new(ScopeId::new("s"), Category::new("X"), "a", "a", "b");
    assert!(entry.expires_at.is_none());
    let with_ttl = entry.with_ttl(Duration::from_secs(60));
    let deadline = with_ttl.expires_at.unwrap();
    assert!(deadline > Utc::now());
    assert!(!with_ttl.is_expired(Utc::now()));
    assert!(with_ttl.is_expired(deadline));
}

#[test]
fn detection_slice_respects_bounds() {
    let text = "Call John";
    assert_eq!(Detection::new(5, 9, "PERSON_NAME").slice(text), Some("John"));
    assert_eq!(Detection::new(5, 40, "PERSON_NAME").slice(text), None);
    assert_eq!(Detection::new(5, 5, "PERSON_NAME").slice(text), None);
}

#[test]
fn detections_overlap_only_when_ranges_intersect() {
    let a = Detection::new(0, 5, "A");
    assert!(a.overlaps(&Detection::new(4, 8, "B")));
    assert!(!a.overlaps(&Detection::new(5, 8, "B")));
}

#[test]
fn cache_status_serializes_lowercase() {
    let json = serde_json::to_string(&CacheStatus::Degraded).unwrap();
    assert_eq!(json, "\"degraded\"");
    assert_eq!(CacheStatus::Unavailable.to_string(), "unavailable");
}

proptest! {
    #[test]
    fn stats_addition_is_componentwise(
        a in 0u64..1_000, b in 0u64..1_000, c in 0u64..1_000,
        d in 0u64..1_000, e in 0u64..1_000, f in 0u64..1_000,
    ) {
        let left = StatsSnapshot { cache_hits: a, storage_hits: b, new_generations: c };
        let right = StatsSnapshot { cache_hits: d, storage_hits: e, new_generations: f };
        let sum = left + right;
        prop_assert_eq!(sum.cache_hits, a + d);
        prop_assert_eq!(sum.storage_hits, b + e);
        prop_assert_eq!(sum.new_generations, c + f);
        prop_assert_eq!(sum.total_lookups(), left.total_lookups() + right.total_lookups());
    }
}
