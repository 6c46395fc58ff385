use std::sync::{Mutex, OnceLock};

use keyseal_core::{CryptoError, EnvelopeCodec};
use thiserror::Error;
use tracing::debug;

use crate::key_provider::{exit_on_key_failure, KeyProvider, KeyStoreError};

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Key(#[from] KeyStoreError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Process-wide codec built once from a [`KeyProvider`].
///
/// Construct one during startup and pass it (or an `Arc` of it) to every
/// consumer. The first [`SharedCodec::get`] loads the key and builds the codec;
/// concurrent first callers all receive that same instance.
///
/// [`SharedCodec::get`] reports key-store failures as [`HandlerError::Key`];
/// processes that must not run without a durable key call
/// [`SharedCodec::get_or_exit`] instead.
#[derive(Debug)]
pub struct SharedCodec<P: KeyProvider> {
    provider: P,
    codec: OnceLock<EnvelopeCodec>,
    init: Mutex<()>,
}

impl<P: KeyProvider> SharedCodec<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            codec: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// The bound codec, building it on first use.
    pub fn get(&self) -> Result<&EnvelopeCodec, HandlerError> {
        if let Some(codec) = self.codec.get() {
            return Ok(codec);
        }

        let _guard = self
            .init
            .lock()
            .map_err(|err| KeyStoreError::Lock(err.to_string()))?;
        if let Some(codec) = self.codec.get() {
            return Ok(codec);
        }

        let key = self.provider.get_or_create()?;
        let codec = EnvelopeCodec::from_key(key.as_bytes())?;
        debug!("shared codec initialized");
        Ok(self.codec.get_or_init(|| codec))
    }

    /// Like [`SharedCodec::get`], but a key-store failure logs and terminates
    /// the process. A key of the wrong length is still returned as an error.
    pub fn get_or_exit(&self) -> Result<&EnvelopeCodec, CryptoError> {
        match self.get() {
            Ok(codec) => Ok(codec),
            Err(HandlerError::Key(err)) => exit_on_key_failure(&err),
            Err(HandlerError::Crypto(err)) => Err(err),
        }
    }

    pub fn encrypt_text(&self, text: &str) -> Result<String, HandlerError> {
        Ok(self.get()?.encrypt_text(text)?)
    }

    pub fn decrypt_text(&self, value: &str) -> Result<String, HandlerError> {
        Ok(self.get()?.decrypt_text(value)?)
    }

    pub fn encrypt_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, HandlerError> {
        Ok(self.get()?.encrypt_bytes(bytes)?)
    }

    pub fn decrypt_bytes(&self, envelope: &[u8]) -> Result<Vec<u8>, HandlerError> {
        Ok(self.get()?.decrypt_bytes(envelope)?)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::key_provider::{InMemoryKeyProvider, SecretKeyStore};

    #[test]
    fn round_trips_through_file_backed_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data").join("secret.bin");
        let shared = SharedCodec::new(SecretKeyStore::new(&path));

        let encrypted = shared.encrypt_text("hello world").expect("encrypt");
        assert!(encrypted.starts_with("{AES256}"));
        assert_eq!(shared.decrypt_text(&encrypted).expect("decrypt"), "hello world");

        // A restart with the same key file can still read old values.
        let restarted = SharedCodec::new(SecretKeyStore::new(&path));
        assert_eq!(
            restarted.decrypt_text(&encrypted).expect("decrypt"),
            "hello world"
        );
    }

    #[test]
    fn wrong_length_key_file_fails_at_codec_construction() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("secret.bin");
        fs::write(&path, [0u8; 16]).expect("seed file");

        let shared = SharedCodec::new(SecretKeyStore::new(&path));
        let err = shared.get().expect_err("16-byte key");
        assert!(matches!(
            err,
            HandlerError::Crypto(CryptoError::InvalidKeyLength { actual: 16 })
        ));
    }

    #[test]
    fn get_or_exit_returns_the_cached_codec() {
        let dir = tempfile::tempdir().expect("tempdir");
        let shared = SharedCodec::new(SecretKeyStore::new(dir.path().join("secret.bin")));

        let first = shared.get_or_exit().expect("codec") as *const EnvelopeCodec;
        let second = shared.get().expect("codec") as *const EnvelopeCodec;
        assert_eq!(first, second);
        assert!(dir.path().join("secret.bin").exists());
    }

    #[test]
    fn get_or_exit_reports_bad_key_length() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("secret.bin");
        fs::write(&path, [0u8; 33]).expect("seed file");

        let shared = SharedCodec::new(SecretKeyStore::new(&path));
        let err = shared.get_or_exit().expect_err("33-byte key");
        assert_eq!(err, CryptoError::InvalidKeyLength { actual: 33 });
    }

    #[test]
    fn concurrent_first_use_shares_one_codec() {
        let shared = SharedCodec::new(InMemoryKeyProvider::default());

        let addrs: Vec<usize> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| shared.get().expect("codec") as *const EnvelopeCodec as usize)
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("thread"))
                .collect()
        });

        assert!(addrs.iter().all(|a| *a == addrs[0]));
    }

    #[test]
    fn bytes_pass_straight_to_the_cipher() {
        let shared = SharedCodec::new(InMemoryKeyProvider::with_key([0u8; 32]));
        let envelope = shared.encrypt_bytes(b"hello").expect("encrypt");
        assert_eq!(envelope.len(), 33);
        assert_eq!(shared.decrypt_bytes(&envelope).expect("decrypt"), b"hello");

        let err = shared.decrypt_bytes(&envelope[..27]).expect_err("too short");
        assert!(matches!(
            err,
            HandlerError::Crypto(CryptoError::PayloadTooShort { actual: 27 })
        ));
    }

    #[test]
    fn plain_values_pass_through() {
        let shared = SharedCodec::new(InMemoryKeyProvider::default());
        assert_eq!(shared.decrypt_text("plain-value").expect("pass"), "plain-value");
    }
}
