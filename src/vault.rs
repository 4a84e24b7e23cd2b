//! PAN Vault - card number encryption at rest
//!
//! AES-256-GCM over the primary account number. The key is derived once from
//! the configured secret plus a fixed hex salt and the vault is immutable for
//! the process lifetime; re-keying requires a re-encryption migration.
//!
//! # Invariants (ENFORCED):
//! - No plaintext PAN is ever persisted; ciphertext is produced and consumed
//!   only by this module
//! - Any decrypt failure (malformed input, wrong key, tag mismatch) is a
//!   `CoreError::Crypto`, fatal for that record - never plaintext-equivalent
//!   data
//! - `None` passes through both directions without touching the cipher

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::config::EncryptionConfig;
use crate::error::CoreError;

/// AES-GCM nonce length in bytes, prepended to every ciphertext.
const NONCE_LEN: usize = 12;

/// GCM authentication tag length in bytes.
const TAG_LEN: usize = 16;

pub struct PanVault {
    cipher: Aes256Gcm,
}

impl PanVault {
    /// Build the vault from configuration.
    ///
    /// Key = SHA-256(secret bytes || salt bytes). The salt is hex-encoded in
    /// config; a malformed salt is a `Crypto` error at startup, not at first
    /// use.
    pub fn new(config: &EncryptionConfig) -> Result<Self, CoreError> {
        let salt = hex::decode(&config.salt_hex)
            .map_err(|e| CoreError::Crypto(format!("Invalid encryption salt: {}", e)))?;

        let mut hasher = Sha256::new();
        hasher.update(config.secret_key.as_bytes());
        hasher.update(&salt);
        let key_bytes = hasher.finalize();

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key_bytes.as_slice()));
        Ok(Self { cipher })
    }

    /// Encrypt a PAN. Output is base64(nonce || ciphertext || tag) with a
    /// fresh random nonce per call, so equal PANs produce distinct
    /// ciphertexts.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CoreError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CoreError::Crypto("Encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(out))
    }

    /// Decrypt a previously encrypted PAN.
    pub fn decrypt(&self, encrypted: &str) -> Result<String, CoreError> {
        let raw = BASE64
            .decode(encrypted)
            .map_err(|_| CoreError::Crypto("Decryption failed: malformed ciphertext".to_string()))?;

        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CoreError::Crypto(
                "Decryption failed: truncated ciphertext".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CoreError::Crypto("Decryption failed".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| CoreError::Crypto("Decryption failed: invalid utf-8".to_string()))
    }

    /// `None` passes through as `None` (pass-through, not an error).
    pub fn encrypt_opt(&self, plaintext: Option<&str>) -> Result<Option<String>, CoreError> {
        plaintext.map(|p| self.encrypt(p)).transpose()
    }

    /// `None` passes through as `None` (pass-through, not an error).
    pub fn decrypt_opt(&self, encrypted: Option<&str>) -> Result<Option<String>, CoreError> {
        encrypted.map(|c| self.decrypt(c)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn vault() -> PanVault {
        PanVault::new(&EncryptionConfig {
            secret_key: "test-secret".to_string(),
            salt_hex: "deadbeef".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_round_trip() {
        let v = vault();
        let pan = "4276550011223344";
        let ct = v.encrypt(pan).unwrap();
        assert_ne!(ct, pan);
        assert_eq!(v.decrypt(&ct).unwrap(), pan);
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let v = vault();
        let a = v.encrypt("4276550011223344").unwrap();
        let b = v.encrypt("4276550011223344").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_none_passes_through() {
        let v = vault();
        assert_eq!(v.encrypt_opt(None).unwrap(), None);
        assert_eq!(v.decrypt_opt(None).unwrap(), None);
    }

    #[test]
    fn test_malformed_ciphertext_is_crypto_error() {
        let v = vault();
        assert!(matches!(
            v.decrypt("not-base64!!!"),
            Err(CoreError::Crypto(_))
        ));
        assert!(matches!(v.decrypt("YWJj"), Err(CoreError::Crypto(_))));
    }

    #[test]
    fn test_tampered_ciphertext_is_crypto_error() {
        let v = vault();
        let ct = v.encrypt("4276550011223344").unwrap();
        let mut raw = BASE64.decode(&ct).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = BASE64.encode(raw);
        assert!(matches!(v.decrypt(&tampered), Err(CoreError::Crypto(_))));
    }

    #[test]
    fn test_wrong_key_is_crypto_error() {
        let v = vault();
        let other = PanVault::new(&EncryptionConfig {
            secret_key: "different-secret".to_string(),
            salt_hex: "deadbeef".to_string(),
        })
        .unwrap();
        let ct = v.encrypt("4276550011223344").unwrap();
        assert!(matches!(other.decrypt(&ct), Err(CoreError::Crypto(_))));
    }

    #[test]
    fn test_invalid_salt_rejected_at_construction() {
        let err = PanVault::new(&EncryptionConfig {
            secret_key: "s".to_string(),
            salt_hex: "not-hex".to_string(),
        });
        assert!(matches!(err, Err(CoreError::Crypto(_))));
    }

    proptest! {
        #[test]
        fn prop_round_trip_any_pan(pan in "[0-9]{16}") {
            let v = vault();
            let ct = v.encrypt(&pan).unwrap();
            prop_assert_eq!(v.decrypt(&ct).unwrap(), pan);
        }
    }
}
