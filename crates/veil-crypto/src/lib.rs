//! # veil-crypto
//!
//! At-rest protection for mapping originals.
//!
//! - [`Encryptor`]: AES-256-GCM sealing of original values, or a pass-through
//!   when no key is configured.
//! - [`KeyHasher`]: derives the lookup key the tiers are indexed by, either the
//!   original itself or a keyed BLAKE3 digest of it.

pub mod encryptor;
pub mod key_hasher;

pub use encryptor::Encryptor;
pub use key_hasher::KeyHasher;
