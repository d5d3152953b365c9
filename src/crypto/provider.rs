//! Encryption provider used by the backup engine
//!
//! The engine treats encryption as opaque string-to-string transforms, so any
//! cipher can be plugged in behind [`EncryptionProvider`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::settings::Settings;
use crate::error::{ClipError, ClipResult};

use super::encryption::{decrypt, encrypt_keyed, token_params};
use super::key_derivation::{derive_key, DerivedKey, KeyDerivationParams};
use super::secure_memory::SecureString;

/// Opaque string encryption used for secure clipboard entries
pub trait EncryptionProvider: Send + Sync {
    /// Encrypt plaintext into a printable ciphertext
    fn encrypt(&self, plaintext: &str) -> ClipResult<String>;

    /// Decrypt a ciphertext produced by [`EncryptionProvider::encrypt`]
    fn decrypt(&self, ciphertext: &str) -> ClipResult<String>;
}

/// AES-256-GCM provider keyed from a passphrase via Argon2id
///
/// Tokens written by this provider name their key parameters, so reading
/// only needs the passphrase. Keys are derived once per parameter set.
pub struct AesGcmProvider {
    passphrase: SecureString,
    /// Parameters for new ciphertexts and for legacy `v1` tokens
    params: Option<KeyDerivationParams>,
    keys: Mutex<HashMap<KeyDerivationParams, Arc<DerivedKey>>>,
}

impl AesGcmProvider {
    /// Derive the key from a passphrase
    pub fn from_passphrase(passphrase: &str, params: &KeyDerivationParams) -> ClipResult<Self> {
        let provider = Self {
            passphrase: SecureString::new(passphrase),
            params: Some(params.clone()),
            keys: Mutex::new(HashMap::new()),
        };
        provider.key_for(params)?;
        Ok(provider)
    }

    /// Derive the key using the parameters stored in settings
    pub fn from_settings(passphrase: &str, settings: &Settings) -> ClipResult<Self> {
        let params = settings
            .encryption
            .key_params
            .as_ref()
            .ok_or_else(|| ClipError::Encryption("No key parameters found".to_string()))?;
        Self::from_passphrase(passphrase, params)
    }

    /// Provider that only opens tokens naming their own key parameters
    pub fn for_reading(passphrase: &str) -> Self {
        Self {
            passphrase: SecureString::new(passphrase),
            params: None,
            keys: Mutex::new(HashMap::new()),
        }
    }

    fn key_for(&self, params: &KeyDerivationParams) -> ClipResult<Arc<DerivedKey>> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(key) = keys.get(params) {
            return Ok(Arc::clone(key));
        }
        let key = Arc::new(derive_key(self.passphrase.as_str(), params)?);
        keys.insert(params.clone(), Arc::clone(&key));
        Ok(key)
    }

    fn default_params(&self) -> ClipResult<&KeyDerivationParams> {
        self.params
            .as_ref()
            .ok_or_else(|| ClipError::Encryption("No key parameters configured".to_string()))
    }
}

impl EncryptionProvider for AesGcmProvider {
    fn encrypt(&self, plaintext: &str) -> ClipResult<String> {
        let params = self.default_params()?;
        let key = self.key_for(params)?;
        encrypt_keyed(plaintext.as_bytes(), &key, params)
    }

    fn decrypt(&self, ciphertext: &str) -> ClipResult<String> {
        let key = match token_params(ciphertext)? {
            Some(params) => self.key_for(&params)?,
            None => self.key_for(self.default_params()?)?,
        };
        let plaintext = decrypt(ciphertext, &key)?;
        String::from_utf8(plaintext)
            .map_err(|e| ClipError::Encryption(format!("Invalid UTF-8 in decrypted data: {}", e)))
    }
}
