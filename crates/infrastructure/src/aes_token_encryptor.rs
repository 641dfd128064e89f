//! AES-256-GCM encryptor for access tokens at rest.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use qbox_application::SecretEncryptor;
use qbox_core::{AppError, AppResult};

const NONCE_LEN: usize = 12;

/// AES-256-GCM encryptor that keeps access tokens recoverable for QR regeneration.
#[derive(Clone)]
pub struct AesTokenEncryptor {
    cipher: Aes256Gcm,
}

impl AesTokenEncryptor {
    /// Creates a new encryptor from a 32-byte key.
    #[must_use]
    pub fn new(key_bytes: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key_bytes.into()),
        }
    }

    /// Creates a new encryptor from a hex-encoded 32-byte key.
    pub fn from_hex(hex_key: &str) -> AppResult<Self> {
        let decoded = hex::decode(hex_key.trim()).map_err(|error| {
            AppError::Validation(format!("invalid ACCESS_TOKEN_ENCRYPTION_KEY hex: {error}"))
        })?;

        let key: [u8; 32] = decoded.try_into().map_err(|_| {
            AppError::Validation(
                "ACCESS_TOKEN_ENCRYPTION_KEY must be exactly 32 bytes (64 hex chars)".to_owned(),
            )
        })?;

        Ok(Self::new(&key))
    }
}

impl SecretEncryptor for AesTokenEncryptor {
    fn encrypt(&self, plaintext: &[u8]) -> AppResult<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self.cipher.encrypt(&nonce, plaintext).map_err(|error| {
            AppError::Internal(format!("failed to encrypt access token: {error}"))
        })?;

        // Stored layout: nonce || ciphertext.
        let mut stored = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        stored.extend_from_slice(&nonce);
        stored.extend_from_slice(&ciphertext);
        Ok(stored)
    }

    fn decrypt(&self, stored: &[u8]) -> AppResult<Vec<u8>> {
        if stored.len() < NONCE_LEN {
            return Err(AppError::Internal(
                "stored access token is too short to carry a nonce".to_owned(),
            ));
        }

        let (nonce_bytes, ciphertext) = stored.split_at(NONCE_LEN);
        let nonce_array: [u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| AppError::Internal("nonce must be exactly 12 bytes".to_owned()))?;

        self.cipher
            .decrypt(&Nonce::from(nonce_array), ciphertext)
            .map_err(|error| AppError::Internal(format!("failed to decrypt access token: {error}")))
    }
}

#[cfg(test)]
mod tests {
    use qbox_application::SecretEncryptor;
    use qbox_core::{AppError, AppResult};

    use super::AesTokenEncryptor;

    #[test]
    fn stored_token_decrypts_with_same_key() -> AppResult<()> {
        let encryptor = AesTokenEncryptor::from_hex(&"2a".repeat(32))?;

        let token = b"9f3c0d7e";
        let stored = encryptor.encrypt(token)?;
        assert_ne!(&stored[12..], token);
        assert_eq!(encryptor.decrypt(&stored)?, token);
        Ok(())
    }

    #[test]
    fn decrypt_with_other_key_fails() -> AppResult<()> {
        let stored = AesTokenEncryptor::new(&[42u8; 32]).encrypt(b"token")?;
        assert!(AesTokenEncryptor::new(&[7u8; 32]).decrypt(&stored).is_err());
        Ok(())
    }

    #[test]
    fn from_hex_rejects_short_or_malformed_keys() {
        assert!(matches!(
            AesTokenEncryptor::from_hex("abcd"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            AesTokenEncryptor::from_hex(&"zz".repeat(32)),
            Err(AppError::Validation(_))
        ));
    }
}
