//! Cryptographic functions for clipkeep
//!
//! Provides AES-256-GCM encryption with Argon2id key derivation
//! for secure clipboard entries inside backups.

pub mod encryption;
pub mod key_derivation;
pub mod provider;
pub mod secure_memory;

pub use encryption::{decrypt_string, encrypt_string};
pub use key_derivation::{derive_key, DerivedKey, KeyDerivationParams};
pub use provider::{AesGcmProvider, EncryptionProvider};
pub use secure_memory::SecureString;
