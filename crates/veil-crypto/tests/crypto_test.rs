use proptest::prelude::*;
use veil_core::config::EncryptionKey;
use veil_core::errors::VeilError;
use veil_core::models::{Category, ScopeId};
use veil_crypto::{Encryptor, KeyHasher};

fn key(secret: &str) -> EncryptionKey {
    EncryptionKey::new(secret)
}

// ── Encryptor ──

#[test]
fn disabled_encryptor_is_identity() {
    let enc = Encryptor::new(None).unwrap();
    assert!(!enc.is_active());
    let (stored, encrypted) = enc.encrypt("john@example.com").unwrap();
    assert_eq!(stored, "john@example.com");
    assert!(!encrypted);
    assert_eq!(enc.decrypt(&stored, encrypted).unwrap(), "john@example.com");
}

#[test]
fn active_encryptor_hides_plaintext() {
    let enc = Encryptor::new(Some(&key("secret-1"))).unwrap();
    let (stored, encrypted) = enc.encrypt("john@example.com").unwrap();
    assert!(encrypted);
    assert!(!stored.contains("john"));
    assert_eq!(enc.decrypt(&stored, true).unwrap(), "john@example.com");
}

#[test]
fn same_plaintext_encrypts_differently() {
    let enc = Encryptor::new(Some(&key("secret-1"))).unwrap();
    let (a, _) = enc.encrypt("Jane Doe").unwrap();
    let (b, _) = enc.encrypt("Jane Doe").unwrap();
    assert_ne!(a, b, "nonces must differ");
}

#[test]
fn ciphertext_without_key_is_a_decryption_error() {
    let sealed = Encryptor::new(Some(&key("secret-1")))
        .unwrap()
        .encrypt("Jane Doe")
        .unwrap()
        .0;
    let err = Encryptor::disabled().decrypt(&sealed, true).unwrap_err();
    assert!(matches!(err, VeilError::DecryptionError { .. }));
}

#[test]
fn wrong_key_is_a_decryption_error() {
    let sealed = Encryptor::new(Some(&key("secret-1")))
        .unwrap()
        .encrypt("Jane Doe")
        .unwrap()
        .0;
    let other = Encryptor::new(Some(&key("secret-2"))).unwrap();
    let err = other.decrypt(&sealed, true).unwrap_err();
    assert!(matches!(err, VeilError::DecryptionError { .. }));
    assert!(err.is_always_fatal());
}

#[test]
fn truncated_ciphertext_is_rejected() {
    let enc = Encryptor::new(Some(&key("secret-1"))).unwrap();
    assert!(enc.decrypt("AAAA", true).is_err());
    assert!(enc.decrypt("not base64 !!", true).is_err());
}

#[test]
fn plaintext_record_passes_through_even_with_key() {
    let enc = Encryptor::new(Some(&key("secret-1"))).unwrap();
    assert_eq!(enc.decrypt("legacy value", false).unwrap(), "legacy value");
}

#[test]
fn empty_secret_is_a_configuration_error() {
    let err = Encryptor::new(Some(&key(""))).unwrap_err();
    assert!(matches!(err, VeilError::ConfigurationError { .. }));
}

// ── KeyHasher ──

#[test]
fn plain_hasher_returns_original() {
    let hasher = KeyHasher::plain();
    let key = hasher.lookup_key(&ScopeId::new("s"), &Category::new("EMAIL_ADDRESS"), "a@b.c");
    assert_eq!(key, "a@b.c");
}

#[test]
fn hashed_key_is_stable_and_opaque() {
    let hasher = KeyHasher::hashed(Some(&key("secret-1")));
    let scope = ScopeId::new("s");
    let cat = Category::new("EMAIL_ADDRESS");
    let a = hasher.lookup_key(&scope, &cat, "a@b.c");
    let b = hasher.lookup_key(&scope, &cat, "a@b.c");
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
    assert!(!a.contains("a@b.c"));
}

#[test]
fn hashed_key_depends_on_secret_scope_and_category() {
    let scope = ScopeId::new("s");
    let cat = Category::new("EMAIL_ADDRESS");
    let h1 = KeyHasher::hashed(Some(&key("secret-1")));
    let h2 = KeyHasher::hashed(Some(&key("secret-2")));
    let base = h1.lookup_key(&scope, &cat, "a@b.c");
    assert_ne!(base, h2.lookup_key(&scope, &cat, "a@b.c"));
    assert_ne!(base, h1.lookup_key(&ScopeId::new("t"), &cat, "a@b.c"));
    assert_ne!(base, h1.lookup_key(&scope, &Category::new("PERSON_NAME"), "a@b.c"));
}

#[test]
fn encryption_key_forces_hashed_mode() {
    assert!(!KeyHasher::from_config(false, None).is_hashed());
    assert!(KeyHasher::from_config(true, None).is_hashed());
    assert!(KeyHasher::from_config(false, Some(&key("k"))).is_hashed());
}

proptest! {
    #[test]
    fn encrypt_then_decrypt_returns_original(value in "\\PC{0,64}") {
        let enc = Encryptor::new(Some(&EncryptionKey::new("prop-secret"))).unwrap();
        let (stored, encrypted) = enc.encrypt(&value).unwrap();
        prop_assert_eq!(enc.decrypt(&stored, encrypted).unwrap(), value);
    }
}
