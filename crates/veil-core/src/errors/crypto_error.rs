/// Encryptor errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid encryption key: {reason}")]
    InvalidKey { reason: String },

    #[error("encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    #[error("decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    #[error("value is encrypted but no encryption key is configured")]
    MissingKey,

    #[error("malformed ciphertext: {reason}")]
    MalformedCiphertext { reason: String },
}
