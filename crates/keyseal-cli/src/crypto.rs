use std::path::{Path, PathBuf};

use crate::config::Config;
use color_eyre::Result;
use keyseal_core::EnvelopeCodec;
use keyseal_storage::{SecretKeyStore, SharedCodec, DEFAULT_SECRET_PATH};
use tracing::debug;

/// Resolve the key file: CLI flag (or `KEYSEAL_SECRET`), then config, then `data/secret.bin`.
pub fn resolve_secret_path(flag: Option<&Path>, config: &Config) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| config.secret_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRET_PATH))
}

/// Shared codec bound to the key file at `path`; nothing is read until first use.
pub fn shared_codec(path: &Path) -> SharedCodec<SecretKeyStore> {
    debug!(?path, "binding codec to secret file");
    SharedCodec::new(SecretKeyStore::new(path))
}

/// Load (or create) the key and return the bound codec.
/// A key file that cannot be read or written terminates the process.
pub fn codec(shared: &SharedCodec<SecretKeyStore>) -> Result<&EnvelopeCodec> {
    shared.get_or_exit().map_err(|e| color_eyre::eyre::eyre!("secret file: {e}"))
}
