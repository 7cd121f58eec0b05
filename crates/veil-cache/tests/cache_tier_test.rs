use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use veil_cache::MemoryCacheTier;
use veil_core::models::{CacheStatus, Category, MappingEntry, ScopeId};
use veil_core::traits::ICacheTier;

fn tier() -> Arc<dyn ICacheTier> {
    Arc::new(MemoryCacheTier::new(1_000))
}

#[test]
fn memory_tier_reports_connected() {
    let cache = tier();
    assert_eq!(cache.backend_name(), "memory");
    assert_eq!(cache.status(), CacheStatus::Connected);
}

#[test]
fn same_original_in_two_categories_is_two_entries() {
    let cache = tier();
    let scope = ScopeId::new("s");
    let as_name = MappingEntry::new(scope.clone(), Category::new("PERSON_NAME"), "Jordan", "Jordan", "Casey");
    let as_place = MappingEntry::new(scope.clone(), Category::new("LOCATION"), "Jordan", "Jordan", "Utopia");
    cache.put(&as_name, Duration::from_secs(60)).unwrap();
    cache.put(&as_place, Duration::from_secs(60)).unwrap();

    let name = cache.get(&scope, &Category::new("PERSON_NAME"), "Jordan").unwrap().unwrap();
    let place = cache.get(&scope, &Category::new("LOCATION"), "Jordan").unwrap().unwrap();
    assert_eq!(name.substitute_value, "Casey");
    assert_eq!(place.substitute_value, "Utopia");
}

#[test]
fn invalidate_drops_both_directions() {
    let cache = tier();
    let e = MappingEntry::new(ScopeId::new("s"), Category::new("PHONE_NUMBER"), "555-0100", "555-0100", "555-0199");
    cache.put(&e, Duration::from_secs(60)).unwrap();
    cache.invalidate(&e).unwrap();
    cache.evict_expired().unwrap();
    assert!(cache.get(&e.scope, &e.category, "555-0100").unwrap().is_none());
    assert!(cache.get_by_token(&e.scope, "555-0199").unwrap().is_none());
}

#[test]
fn cached_entry_carries_deadline() {
    let cache = tier();
    let e = MappingEntry::new(ScopeId::new("s"), Category::new("EMAIL_ADDRESS"), "a@b.c", "a@b.c", "x@y.z");
    cache.put(&e, Duration::from_secs(60)).unwrap();
    let got = cache.get(&e.scope, &e.category, "a@b.c").unwrap().unwrap();
    assert!(got.expires_at.is_some());
}

proptest! {
    #[test]
    fn forward_and_backward_agree(originals in proptest::collection::hash_set("[a-z]{1,12}", 1..20)) {
        let cache = MemoryCacheTier::new(1_000);
        let scope = ScopeId::new("prop");
        let category = Category::new("PERSON_NAME");
        for (i, original) in originals.iter().enumerate() {
            let e = MappingEntry::new(scope.clone(), category.clone(), original.as_str(), original.as_str(), format!("<PERSON_NAME_{}>", i + 1));
            cache.put(&e, Duration::from_secs(60)).unwrap();
        }
        for original in &originals {
            let fwd = cache.get(&scope, &category, original).unwrap().unwrap();
            let back = cache.get_by_token(&scope, &fwd.substitute_value).unwrap().unwrap();
            prop_assert_eq!(&back.original_value, original);
        }
    }
}
