//! Core encryption primitives for Keyseal: the AES-256-GCM cipher, the
//! `{AES256}`-tagged envelope codec, and the password generator.
//! Key persistence lives in `keyseal-storage`; this crate never touches the filesystem.

pub mod attribute;
pub mod cipher;
pub mod codec;
pub mod error;
pub mod password;
pub mod properties;

pub use cipher::Aes256Cipher;
pub use codec::{EnvelopeCodec, AES256_PREFIX};
pub use error::CryptoError;
pub use password::PasswordGenerator;
