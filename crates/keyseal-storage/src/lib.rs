//! Secret-key persistence and the lazily built shared codec.
//! The key lives in a 32-byte file created on first run (or in memory for tests).

pub mod handler;
pub mod key_provider;

pub use handler::{HandlerError, SharedCodec};
pub use key_provider::{
    load_or_create, load_or_exit, InMemoryKeyProvider, KeyProvider, KeyStoreError, SecretKey,
    SecretKeyStore, DEFAULT_SECRET_PATH,
};
