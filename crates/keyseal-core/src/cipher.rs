use std::fmt;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use tracing::error;

use crate::error::{CryptoError, Result};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;
/// GCM initialization vector length in bytes.
pub const IV_LEN: usize = 12;
/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;
/// Bytes an envelope adds on top of the plaintext.
pub const ENVELOPE_OVERHEAD: usize = IV_LEN + TAG_LEN;

/// AES-256-GCM cipher bound to a single key.
///
/// Envelopes have the layout `IV(12) || ciphertext || tag(16)`. Every call to
/// [`Aes256Cipher::encrypt`] draws a fresh random IV from the OS generator, so
/// the same key never reuses an IV short of a 96-bit birthday collision.
#[derive(Clone)]
pub struct Aes256Cipher {
    cipher: Aes256Gcm,
    key: [u8; KEY_LEN],
}

impl Aes256Cipher {
    /// Build a cipher around a freshly generated random key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self::from_array(key)
    }

    /// Build a cipher from raw key bytes; anything but 32 bytes is rejected.
    pub fn from_bytes(key: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LEN] = key
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength { actual: key.len() })?;
        Ok(Self::from_array(key))
    }

    /// Build a cipher from a Base64 (standard alphabet, padded) encoded key.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| CryptoError::InvalidKeyEncoding {
                reason: e.to_string(),
            })?;
        Self::from_bytes(&bytes)
    }

    fn from_array(key: [u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
            key,
        }
    }

    /// Encrypt `plaintext` into a self-contained envelope.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ct_with_tag = self.cipher.encrypt(&nonce, plaintext).map_err(|e| {
            error!("encryption failed: {e}");
            CryptoError::EncryptionFailed
        })?;

        let mut out = Vec::with_capacity(IV_LEN + ct_with_tag.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&ct_with_tag);
        Ok(out)
    }

    /// Open an envelope produced by [`Aes256Cipher::encrypt`] with the same key.
    pub fn decrypt(&self, envelope: &[u8]) -> Result<Vec<u8>> {
        if envelope.len() < ENVELOPE_OVERHEAD {
            return Err(CryptoError::PayloadTooShort {
                actual: envelope.len(),
            });
        }

        let (iv, ct_with_tag) = envelope.split_at(IV_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(iv), ct_with_tag)
            .map_err(|_| CryptoError::DecryptionFailed)
    }

    /// Encrypt UTF-8 text and return the envelope as standard Base64.
    pub fn encrypt_str(&self, plaintext: &str) -> Result<String> {
        let envelope = self.encrypt(plaintext.as_bytes())?;
        Ok(STANDARD.encode(envelope))
    }

    /// Reverse of [`Aes256Cipher::encrypt_str`].
    pub fn decrypt_str(&self, encoded: &str) -> Result<String> {
        let envelope = STANDARD
            .decode(encoded)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        let plaintext = self.decrypt(&envelope)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
    }

    /// Copy of the raw key bytes. The caller owns the copy and should drop it promptly.
    pub fn secret(&self) -> [u8; KEY_LEN] {
        self.key
    }

    /// Key bytes as standard Base64, accepted by [`Aes256Cipher::from_base64`].
    pub fn encoded_secret(&self) -> String {
        STANDARD.encode(self.key)
    }
}

impl fmt::Debug for Aes256Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aes256Cipher")
            .field("key", &"<redacted>")
            .finish()
    }
}
