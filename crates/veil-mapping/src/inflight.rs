//! Mappings allocated by this process whose durable write has not finished.
//!
//! Substitutes are reserved here during allocation, before anything is
//! written, so two concurrent allocations for different originals can never
//! pick the same substitute. Lookups consult the registry after a cache miss,
//! which closes the window where an async write is pending and the cache
//! entry is already gone.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use veil_core::models::{Category, MappingEntry, ScopeId};

type ForwardKey = (ScopeId, Category, String);
type TokenKey = (ScopeId, String);

#[derive(Debug, Default)]
pub struct InFlightRegistry {
    by_key: DashMap<ForwardKey, MappingEntry>,
    /// `None` while only reserved, `Some` once the entry is published.
    by_substitute: DashMap<TokenKey, Option<MappingEntry>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `substitute` in `scope`. False when it is already claimed.
    pub fn reserve(&self, scope: &ScopeId, substitute: &str) -> bool {
        match self.by_substitute.entry((scope.clone(), substitute.to_string())) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(None);
                true
            }
        }
    }

    pub fn is_reserved(&self, scope: &ScopeId, substitute: &str) -> bool {
        self.by_substitute
            .contains_key(&(scope.clone(), substitute.to_string()))
    }

    /// Make a reserved mapping visible to lookups.
    pub fn publish(&self, entry: &MappingEntry) {
        self.by_substitute.insert(
            (entry.scope.clone(), entry.substitute_value.clone()),
            Some(entry.clone()),
        );
        self.by_key.insert(
            (
                entry.scope.clone(),
                entry.category.clone(),
                entry.lookup_key.clone(),
            ),
            entry.clone(),
        );
    }

    pub fn lookup_forward(
        &self,
        scope: &ScopeId,
        category: &Category,
        lookup_key: &str,
    ) -> Option<MappingEntry> {
        self.by_key
            .get(&(scope.clone(), category.clone(), lookup_key.to_string()))
            .map(|e| e.value().clone())
    }

    pub fn lookup_backward(&self, scope: &ScopeId, substitute: &str) -> Option<MappingEntry> {
        self.by_substitute
            .get(&(scope.clone(), substitute.to_string()))
            .and_then(|e| e.value().clone())
    }

    /// Drop a reservation that never got published.
    pub fn release_reservation(&self, scope: &ScopeId, substitute: &str) {
        self.by_substitute
            .remove_if(&(scope.clone(), substitute.to_string()), |_, v| v.is_none());
    }

    /// Forget a published entry once its durable write is settled.
    pub fn release(&self, entry: &MappingEntry) {
        self.by_key.remove(&(
            entry.scope.clone(),
            entry.category.clone(),
            entry.lookup_key.clone(),
        ));
        self.by_substitute
            .remove(&(entry.scope.clone(), entry.substitute_value.clone()));
    }

    pub fn clear_scope(&self, scope: &ScopeId) {
        self.by_key.retain(|(s, _, _), _| s != scope);
        self.by_substitute.retain(|(s, _), _| s != scope);
    }

    pub fn len(&self) -> usize {
        self.by_substitute.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_substitute.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(original: &str, substitute: &str) -> MappingEntry {
        MappingEntry::new(
            ScopeId::new("s"),
            Category::new("PERSON_NAME"),
            original,
            original,
            substitute,
        )
    }

    #[test]
    fn reservation_is_exclusive() {
        let reg = InFlightRegistry::new();
        let scope = ScopeId::new("s");
        assert!(reg.reserve(&scope, "Kim"));
        assert!(!reg.reserve(&scope, "Kim"));
        assert!(reg.reserve(&ScopeId::new("other"), "Kim"));
    }

    #[test]
    fn reserved_but_unpublished_is_not_a_lookup_hit() {
        let reg = InFlightRegistry::new();
        let scope = ScopeId::new("s");
        reg.reserve(&scope, "Kim");
        assert!(reg.is_reserved(&scope, "Kim"));
        assert!(reg.lookup_backward(&scope, "Kim").is_none());
    }

    #[test]
    fn publish_then_release() {
        let reg = InFlightRegistry::new();
        let e = entry("Jane", "Kim");
        reg.reserve(&e.scope, "Kim");
        reg.publish(&e);
        assert_eq!(
            reg.lookup_forward(&e.scope, &e.category, "Jane").unwrap().substitute_value,
            "Kim"
        );
        assert_eq!(reg.lookup_backward(&e.scope, "Kim").unwrap().original_value, "Jane");

        reg.release(&e);
        assert!(reg.is_empty());
        assert!(reg.lookup_forward(&e.scope, &e.category, "Jane").is_none());
    }

    #[test]
    fn release_reservation_keeps_published_entries() {
        let reg = InFlightRegistry::new();
        let e = entry("Jane", "Kim");
        reg.reserve(&e.scope, "Kim");
        reg.publish(&e);
        reg.release_reservation(&e.scope, "Kim");
        assert!(reg.lookup_backward(&e.scope, "Kim").is_some());
    }
}
