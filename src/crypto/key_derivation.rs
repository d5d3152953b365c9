//! Key derivation using Argon2id
//!
//! Derives encryption keys from user passphrases using Argon2id,
//! a memory-hard key derivation function resistant to GPU/ASIC attacks.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, Params,
};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ClipError, ClipResult};

/// Parameters for key derivation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyDerivationParams {
    /// Salt for key derivation (base64 encoded)
    pub salt: String,
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism degree (default: 4)
    pub parallelism: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            salt: String::new(), // Will be generated on first use
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KeyDerivationParams {
    /// Create new params with a random salt
    pub fn new() -> Self {
        let salt = SaltString::generate(&mut OsRng);
        Self {
            salt: salt.to_string(),
            ..Default::default()
        }
    }

    /// Compact text form carried in ciphertext tokens: `m=<mem>,t=<time>,p=<par>$<salt>`
    pub fn encode(&self) -> String {
        format!(
            "m={},t={},p={}${}",
            self.memory_cost, self.time_cost, self.parallelism, self.salt
        )
    }

    /// Parse the text form produced by [`KeyDerivationParams::encode`]
    pub fn decode(s: &str) -> ClipResult<Self> {
        let invalid = || ClipError::Encryption(format!("Invalid key parameters: {}", s));

        let (costs, salt) = s.split_once('$').ok_or_else(invalid)?;
        if salt.is_empty() {
            return Err(invalid());
        }

        let mut params = Self {
            salt: salt.to_string(),
            ..Default::default()
        };
        let (mut m, mut t, mut p) = (false, false, false);
        for field in costs.split(',') {
            let (name, value) = field.split_once('=').ok_or_else(invalid)?;
            let value: u32 = value.parse().map_err(|_| invalid())?;
            match name {
                "m" => (params.memory_cost, m) = (value, true),
                "t" => (params.time_cost, t) = (value, true),
                "p" => (params.parallelism, p) = (value, true),
                _ => return Err(invalid()),
            }
        }
        if !(m && t && p) {
            return Err(invalid());
        }

        Ok(params)
    }

    /// Cheap parameters for tests; never use for real data
    #[cfg(test)]
    pub fn insecure_for_tests() -> Self {
        Self {
            memory_cost: 8,
            time_cost: 1,
            parallelism: 1,
            ..Self::new()
        }
    }
}

/// A derived 256-bit encryption key, zeroed on drop
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; 32],
}

impl DerivedKey {
    /// Wrap raw key bytes
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

/// Derive an encryption key from a passphrase
pub fn derive_key(passphrase: &str, params: &KeyDerivationParams) -> ClipResult<DerivedKey> {
    let salt = SaltString::from_b64(&params.salt)
        .map_err(|e| ClipError::Encryption(format!("Invalid salt: {}", e)))?;

    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(32), // Output length for AES-256
    )
    .map_err(|e| ClipError::Encryption(format!("Invalid Argon2 parameters: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2_params,
    );

    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| ClipError::Encryption(format!("Key derivation failed: {}", e)))?;

    let hash_output = hash
        .hash
        .ok_or_else(|| ClipError::Encryption("No hash output generated".to_string()))?;

    let hash_bytes = hash_output.as_bytes();
    if hash_bytes.len() < 32 {
        return Err(ClipError::Encryption(
            "Hash output too short for AES-256 key".to_string(),
        ));
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(&hash_bytes[..32]);

    Ok(DerivedKey { key })
}
