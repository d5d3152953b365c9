//! AES-256-GCM encryption/decryption
//!
//! Provides authenticated encryption for individual clipboard entries.
//! Each encryption operation generates a unique nonce.
//!
//! Ciphertexts travel as text inside backup documents:
//! `v1:` followed by base64(nonce ‖ ciphertext ‖ tag), or
//! `v2:<key parameters>:` followed by the same payload. The `v2` form names
//! the Argon2 parameters the key was derived with, so a token can be opened
//! anywhere the passphrase is known.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{ClipError, ClipResult};

use super::{DerivedKey, KeyDerivationParams};

/// Size of the AES-GCM nonce in bytes (96 bits)
const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes
const TAG_SIZE: usize = 16;

/// Prefix of tokens carrying only the payload
const TOKEN_PREFIX: &str = "v1:";

/// Prefix of tokens carrying their key parameters
const KEYED_TOKEN_PREFIX: &str = "v2:";

/// Encrypt plaintext bytes into a `v1` text token
pub fn encrypt(plaintext: &[u8], key: &DerivedKey) -> ClipResult<String> {
    Ok(format!("{}{}", TOKEN_PREFIX, seal_payload(plaintext, key)?))
}

/// Encrypt plaintext bytes into a `v2` token naming the key parameters
pub fn encrypt_keyed(
    plaintext: &[u8],
    key: &DerivedKey,
    params: &KeyDerivationParams,
) -> ClipResult<String> {
    Ok(format!(
        "{}{}:{}",
        KEYED_TOKEN_PREFIX,
        params.encode(),
        seal_payload(plaintext, key)?
    ))
}

/// Key parameters named by a token; `None` for `v1` tokens
pub fn token_params(token: &str) -> ClipResult<Option<KeyDerivationParams>> {
    match token.strip_prefix(KEYED_TOKEN_PREFIX) {
        Some(rest) => {
            let (header, _) = rest.split_once(':').ok_or_else(|| {
                ClipError::Encryption("Ciphertext is missing its key parameters".to_string())
            })?;
            KeyDerivationParams::decode(header).map(Some)
        }
        None => Ok(None),
    }
}

fn seal_payload(plaintext: &[u8], key: &DerivedKey) -> ClipResult<String> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| ClipError::Encryption(format!("Failed to create cipher: {}", e)))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| ClipError::Encryption(format!("Encryption failed: {}", e)))?;

    let mut framed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    framed.extend_from_slice(&nonce_bytes);
    framed.extend_from_slice(&ciphertext);

    Ok(STANDARD.encode(framed))
}

/// Decrypt a text token produced by [`encrypt`] or [`encrypt_keyed`]
pub fn decrypt(token: &str, key: &DerivedKey) -> ClipResult<Vec<u8>> {
    let encoded = if let Some(rest) = token.strip_prefix(KEYED_TOKEN_PREFIX) {
        rest.split_once(':').map(|(_, payload)| payload)
    } else {
        token.strip_prefix(TOKEN_PREFIX)
    }
    .ok_or_else(|| ClipError::Encryption("Unsupported ciphertext format".to_string()))?;

    let framed = STANDARD
        .decode(encoded)
        .map_err(|e| ClipError::Encryption(format!("Invalid ciphertext encoding: {}", e)))?;

    if framed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(ClipError::Encryption(format!(
            "Ciphertext too short: {} bytes",
            framed.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| ClipError::Encryption(format!("Failed to create cipher: {}", e)))?;

    let (nonce_bytes, ciphertext) = framed.split_at(NONCE_SIZE);
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| {
            ClipError::Encryption("Decryption failed: invalid key or corrupted data".to_string())
        })
}

/// Encrypt a string
pub fn encrypt_string(plaintext: &str, key: &DerivedKey) -> ClipResult<String> {
    encrypt(plaintext.as_bytes(), key)
}

/// Decrypt to a string
pub fn decrypt_string(token: &str, key: &DerivedKey) -> ClipResult<String> {
    let plaintext = decrypt(token, key)?;
    String::from_utf8(plaintext)
        .map_err(|e| ClipError::Encryption(format!("Invalid UTF-8 in decrypted data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> DerivedKey {
        DerivedKey::from_bytes([7u8; 32])
    }

    #[test]
    fn test_encrypt_decrypt_string() {
        let key = test_key();
        let token = encrypt_string("Hello, World!", &key).unwrap();

        assert!(token.starts_with("v1:"));
        assert!(!token.contains("Hello"));
        assert_eq!(decrypt_string(&token, &key).unwrap(), "Hello, World!");
    }

    #[test]
    fn test_different_nonces() {
        let key = test_key();
        let token1 = encrypt(b"same", &key).unwrap();
        let token2 = encrypt(b"same", &key).unwrap();
        assert_ne!(token1, token2);
    }

    #[test]
    fn test_wrong_key_fails() {
        let token = encrypt(b"secret", &test_key()).unwrap();
        let other = DerivedKey::from_bytes([9u8; 32]);
        assert!(decrypt(&token, &other).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = test_key();
        let token = encrypt(b"secret", &key).unwrap();

        let mut framed = STANDARD.decode(token.strip_prefix("v1:").unwrap()).unwrap();
        let last = framed.len() - 1;
        framed[last] ^= 0xFF;
        let tampered = format!("v1:{}", STANDARD.encode(framed));

        assert!(decrypt(&tampered, &key).is_err());
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let key = test_key();
        assert!(decrypt("plaintext", &key).is_err());
        assert!(decrypt("v1:***", &key).is_err());
        assert!(decrypt("v1:AAAA", &key).is_err());
    }

    #[test]
    fn test_keyed_token_names_params() {
        let key = test_key();
        let params = KeyDerivationParams::insecure_for_tests();
        let token = encrypt_keyed(b"secret", &key, &params).unwrap();

        assert!(token.starts_with("v2:m=8,t=1,p=1$"));
        assert_eq!(token_params(&token).unwrap(), Some(params));
        assert_eq!(decrypt(&token, &key).unwrap(), b"secret");

        let plain = encrypt(b"secret", &key).unwrap();
        assert_eq!(token_params(&plain).unwrap(), None);
        assert!(token_params("v2:garbage").is_err());
    }

    #[test]
    fn test_empty_plaintext() {
        let key = test_key();
        let token = encrypt(b"", &key).unwrap();
        assert!(decrypt(&token, &key).unwrap().is_empty());
    }
}
