//! Cryptography module
//!
//! Provides AES-256-GCM encryption with Argon2id key derivation for the
//! secrets vault, and Argon2id password hashing for user accounts.

use crate::error::{AppError, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use argon2::password_hash::{PasswordHash, PasswordVerifier, SaltString};
use argon2::{Argon2, PasswordHasher};
use rand::RngCore;

const NONCE_SIZE: usize = 12; // 96 bits for GCM
const SALT_SIZE: usize = 16; // 128 bits

/// Encrypted data container
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct EncryptedData {
    pub salt: Vec<u8>,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// Encrypt data with AES-256-GCM
pub fn encrypt(plaintext: &[u8], password: &str) -> Result<EncryptedData> {
    let mut salt = vec![0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);

    let key = derive_key(password, &salt)?;

    let mut nonce_bytes = vec![0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| AppError::Crypto(format!("Cipher initialization failed: {}", e)))?;

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| AppError::Crypto(format!("Encryption failed: {}", e)))?;

    Ok(EncryptedData {
        salt,
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypt data with AES-256-GCM
pub fn decrypt(encrypted: &EncryptedData, password: &str) -> Result<Vec<u8>> {
    if encrypted.nonce.len() != NONCE_SIZE {
        return Err(AppError::Crypto("Invalid nonce length".to_string()));
    }

    let key = derive_key(password, &encrypted.salt)?;
    let nonce = Nonce::from_slice(&encrypted.nonce);

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| AppError::Crypto(format!("Cipher initialization failed: {}", e)))?;

    cipher
        .decrypt(nonce, encrypted.ciphertext.as_ref())
        .map_err(|e| AppError::Crypto(format!("Decryption failed: {}", e)))
}

/// Derive 256-bit key from password using Argon2id
fn derive_key(password: &str, salt: &[u8]) -> Result<Vec<u8>> {
    let salt_string = SaltString::encode_b64(salt)
        .map_err(|e| AppError::Crypto(format!("Salt encoding failed: {}", e)))?;

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt_string)
        .map_err(|e| AppError::Crypto(format!("Key derivation failed: {}", e)))?;

    let hash = password_hash
        .hash
        .ok_or_else(|| AppError::Crypto("No hash generated".to_string()))?;

    // Argon2 output must cover a full AES-256 key
    let key_bytes = hash.as_bytes();
    if key_bytes.len() < 32 {
        return Err(AppError::Crypto("Derived key too short".to_string()));
    }

    Ok(key_bytes[..32].to_vec())
}

/// Hash an account password into a PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Crypto(format!("Password hashing failed: {}", e)))
}

/// Check a password against a stored PHC string.
///
/// Anything that is not a PHC string (including legacy encodings) fails.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is not in PHC format: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let plaintext = b"{\"bearer_token\":\"abc\"}";
        let password = "vault_password_123";

        let encrypted = encrypt(plaintext, password).unwrap();
        let decrypted = decrypt(&encrypted, password).unwrap();

        assert_eq!(plaintext, decrypted.as_slice());
    }

    #[test]
    fn test_wrong_password() {
        let encrypted = encrypt(b"Secret data", "correct_password").unwrap();

        let result = decrypt(&encrypted, "wrong_password");
        assert!(matches!(result, Err(AppError::Crypto(_))));
    }

    #[test]
    fn test_different_salts() {
        let password = "same_password";
        let plaintext = b"Same data";

        let encrypted1 = encrypt(plaintext, password).unwrap();
        let encrypted2 = encrypt(plaintext, password).unwrap();

        assert_ne!(encrypted1.salt, encrypted2.salt);
        assert_ne!(encrypted1.ciphertext, encrypted2.ciphertext);
    }

    #[test]
    fn test_corrupted_ciphertext() {
        let mut encrypted = encrypt(b"Original message", "password123").unwrap();

        if let Some(byte) = encrypted.ciphertext.get_mut(0) {
            *byte ^= 0xFF;
        }

        assert!(decrypt(&encrypted, "password123").is_err());
    }

    #[test]
    fn test_truncated_nonce_is_rejected() {
        let mut encrypted = encrypt(b"Message", "pass").unwrap();
        encrypted.nonce.truncate(4);

        assert!(decrypt(&encrypted, "pass").is_err());
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("hunter22").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
    }

    #[test]
    fn test_legacy_hash_is_rejected() {
        // base64 of the raw password, as older offline records stored it
        assert!(!verify_password("secret", "c2VjcmV0"));
        assert!(!verify_password("", ""));
    }
}
