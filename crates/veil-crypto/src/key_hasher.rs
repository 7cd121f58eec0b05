//! Lookup-key derivation.

use veil_core::config::EncryptionKey;
use veil_core::constants::LOOKUP_KEY_CONTEXT;
use veil_core::models::{Category, ScopeId};

/// Maps an original value to the key the cache and store are indexed by.
///
/// In plain mode the lookup key is the original. In hashed mode it is the hex
/// keyed-BLAKE3 digest of `scope \0 category \0 original`, so the durable
/// index never holds a plaintext original. The hashing key is derived from the
/// encryption secret when one is configured, otherwise from the context alone.
#[derive(Clone)]
pub struct KeyHasher {
    key: Option<[u8; 32]>,
}

impl KeyHasher {
    pub fn plain() -> Self {
        Self { key: None }
    }

    pub fn hashed(secret: Option<&EncryptionKey>) -> Self {
        let material = secret.map(|s| s.expose().as_bytes()).unwrap_or_default();
        Self {
            key: Some(blake3::derive_key(LOOKUP_KEY_CONTEXT, material)),
        }
    }

    /// Build from the two config switches. An encryption key forces hashed mode.
    pub fn from_config(hash_lookup_keys: bool, secret: Option<&EncryptionKey>) -> Self {
        if hash_lookup_keys || secret.is_some() {
            Self::hashed(secret)
        } else {
            Self::plain()
        }
    }

    pub fn is_hashed(&self) -> bool {
        self.key.is_some()
    }

    pub fn lookup_key(&self, scope: &ScopeId, category: &Category, original: &str) -> String {
        let Some(key) = &self.key else {
            return original.to_string();
        };
        let mut hasher = blake3::Hasher::new_keyed(key);
        hasher.update(scope.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(category.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(original.as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

impl std::fmt::Debug for KeyHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyHasher")
            .field("hashed", &self.is_hashed())
            .finish()
    }
}
