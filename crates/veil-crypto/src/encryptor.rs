//! Symmetric encryption of original values.
//!
//! Ciphertext layout: `base64(nonce[12] || ciphertext || tag[16])`.
//! The 256-bit key is derived from the configured secret with
//! `blake3::derive_key`, so any non-empty secret string is accepted.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;

use veil_core::config::EncryptionKey;
use veil_core::constants::ENCRYPTION_KEY_CONTEXT;
use veil_core::errors::{CryptoError, VeilResult};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Seals and opens original values before they reach a backend.
///
/// Without a key every operation is the identity and `encrypt` reports
/// `encrypted = false`, which is persisted alongside the value.
pub struct Encryptor {
    cipher: Option<Aes256Gcm>,
}

impl Encryptor {
    pub fn new(key: Option<&EncryptionKey>) -> VeilResult<Self> {
        let cipher = match key {
            None => None,
            Some(key) => {
                if key.expose().is_empty() {
                    return Err(CryptoError::InvalidKey {
                        reason: "secret is empty".into(),
                    }
                    .into());
                }
                let derived = blake3::derive_key(ENCRYPTION_KEY_CONTEXT, key.expose().as_bytes());
                let cipher = Aes256Gcm::new_from_slice(&derived).map_err(|e| {
                    CryptoError::InvalidKey {
                        reason: e.to_string(),
                    }
                })?;
                Some(cipher)
            }
        };
        Ok(Self { cipher })
    }

    /// An encryptor that never encrypts.
    pub fn disabled() -> Self {
        Self { cipher: None }
    }

    pub fn is_active(&self) -> bool {
        self.cipher.is_some()
    }

    /// Seal `plaintext`. Returns the stored form and whether it is ciphertext.
    pub fn encrypt(&self, plaintext: &str) -> VeilResult<(String, bool)> {
        let Some(cipher) = &self.cipher else {
            return Ok((plaintext.to_string(), false));
        };

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed {
                reason: "AES-GCM seal failed".into(),
            })?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok((BASE64.encode(sealed), true))
    }

    /// Open a stored value. Plaintext records pass through untouched.
    ///
    /// Errors when the value is ciphertext and no key is configured, when the
    /// key does not match, or when the payload is damaged.
    pub fn decrypt(&self, stored: &str, encrypted: bool) -> VeilResult<String> {
        if !encrypted {
            return Ok(stored.to_string());
        }
        let Some(cipher) = &self.cipher else {
            return Err(CryptoError::MissingKey.into());
        };

        let raw = BASE64
            .decode(stored.as_bytes())
            .map_err(|e| CryptoError::MalformedCiphertext {
                reason: e.to_string(),
            })?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::MalformedCiphertext {
                reason: format!("{} bytes is shorter than nonce + tag", raw.len()),
            }
            .into());
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed {
                reason: "authentication tag mismatch (wrong key or tampered value)".into(),
            })?;

        String::from_utf8(plaintext).map_err(|e| {
            CryptoError::MalformedCiphertext {
                reason: format!("plaintext is not UTF-8: {e}"),
            }
            .into()
        })
    }
}

impl std::fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryptor")
            .field("active", &self.is_active())
            .finish()
    }
}
