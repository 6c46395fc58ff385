use thiserror::Error;

/// Errors produced by the cipher and the envelope codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Supplied key material is not exactly 32 bytes.
    #[error("secret must be 32 bytes (AES-256 key), got {actual}")]
    InvalidKeyLength { actual: usize },
    /// Supplied Base64 key could not be decoded.
    #[error("secret is not valid base64: {reason}")]
    InvalidKeyEncoding { reason: String },
    /// Envelope cannot hold an IV and an authentication tag.
    #[error("encrypted payload too short: {actual} bytes")]
    PayloadTooShort { actual: usize },
    /// Authentication failed or the envelope is malformed.
    /// Carries no cause: wrong key and tampered data look the same.
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("encryption failed")]
    EncryptionFailed,
}

impl CryptoError {
    /// True for errors raised while constructing a cipher from supplied key material.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CryptoError::InvalidKeyLength { .. } | CryptoError::InvalidKeyEncoding { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CryptoError>;
