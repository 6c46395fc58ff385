use tracing::debug;

use crate::{cipher::Aes256Cipher, error::Result};

/// Marker identifying a string value as an encrypted envelope.
pub const AES256_PREFIX: &str = "{AES256}";

/// Single access point for encrypting values with one bound key.
///
/// Text values are tagged with [`AES256_PREFIX`] so plaintext and encrypted
/// values can live side by side: [`EnvelopeCodec::decrypt_text`] passes
/// untagged values through unchanged. Byte values are never tagged.
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    cipher: Aes256Cipher,
}

impl EnvelopeCodec {
    pub fn new(cipher: Aes256Cipher) -> Self {
        debug!("envelope codec constructed");
        Self { cipher }
    }

    /// Build a codec from raw key bytes (must be 32 bytes).
    pub fn from_key(key: &[u8]) -> Result<Self> {
        Ok(Self::new(Aes256Cipher::from_bytes(key)?))
    }

    /// Returns `{AES256}` followed by the Base64 envelope of `text`.
    pub fn encrypt_text(&self, text: &str) -> Result<String> {
        let encoded = self.cipher.encrypt_str(text)?;
        Ok(format!("{AES256_PREFIX}{encoded}"))
    }

    /// Decrypts tagged values; anything without the marker is returned as-is.
    pub fn decrypt_text(&self, value: &str) -> Result<String> {
        match value.strip_prefix(AES256_PREFIX) {
            Some(encoded) => self.cipher.decrypt_str(encoded),
            None => Ok(value.to_string()),
        }
    }

    pub fn encrypt_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.cipher.encrypt(bytes)
    }

    pub fn decrypt_bytes(&self, envelope: &[u8]) -> Result<Vec<u8>> {
        self.cipher.decrypt(envelope)
    }

    /// Whether `value` carries the encryption marker.
    pub fn is_encrypted(value: &str) -> bool {
        value.starts_with(AES256_PREFIX)
    }
}
