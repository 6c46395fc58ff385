use std::{
    fmt,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, OnceLock},
};

use keyseal_core::cipher::KEY_LEN;
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Key file location used when nothing else is configured.
pub const DEFAULT_SECRET_PATH: &str = "data/secret.bin";

/// Raw symmetric key material as read from storage.
///
/// Length is not checked here; cipher construction rejects anything but 32 bytes.
/// Every value handed out is an independent copy owned by the caller, who should
/// drop it as soon as it is no longer needed. The bytes are not zeroed on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<{} bytes redacted>)", self.0.len())
    }
}

#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("secret file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("key store lock poisoned: {0}")]
    Lock(String),
}

/// Provides the process secret key (key file in production; memory in tests).
pub trait KeyProvider: Send + Sync {
    /// Returns a caller-owned copy of the key, creating it on first use.
    fn get_or_create(&self) -> Result<SecretKey, KeyStoreError>;
}

/// Load the key at `path`, or generate and persist a new one.
///
/// A new file is written with exclusive create, so a file created concurrently
/// by another process makes this fail instead of being overwritten. Permissions
/// are narrowed to owner-read-only right after creation; until then the file
/// carries the default umask permissions.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_or_create(path: &Path) -> Result<SecretKey, KeyStoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_err(path, e))?;
    }

    match fs::read(path) {
        Ok(bytes) => {
            debug!("loading secret file");
            return Ok(SecretKey(bytes));
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(io_err(path, err)),
    }

    let mut bytes = vec![0u8; KEY_LEN];
    OsRng.fill_bytes(&mut bytes);

    info!("writing secret file");
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| io_err(path, e))?;
    file.write_all(&bytes).map_err(|e| io_err(path, e))?;
    file.sync_all().map_err(|e| io_err(path, e))?;
    drop(file);

    restrict_permissions(path);
    Ok(SecretKey(bytes))
}

/// Like [`load_or_create`], but a failure logs and terminates the process.
/// Running without a durable key would make encrypted data unrecoverable.
pub fn load_or_exit(path: &Path) -> SecretKey {
    load_or_create(path).unwrap_or_else(|err| exit_on_key_failure(&err))
}

/// Log a key-store failure and terminate the process.
pub(crate) fn exit_on_key_failure(err: &KeyStoreError) -> ! {
    error!("cannot load or create secret file, exiting: {err}");
    std::process::exit(1);
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(err) = fs::set_permissions(path, fs::Permissions::from_mode(0o400)) {
        warn!("could not restrict secret file permissions: {err}");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(path: &Path) {
    let result = fs::metadata(path).and_then(|meta| {
        let mut perms = meta.permissions();
        perms.set_readonly(true);
        fs::set_permissions(path, perms)
    });
    if let Err(err) = result {
        warn!("could not restrict secret file permissions: {err}");
    }
}

fn io_err(path: &Path, source: io::Error) -> KeyStoreError {
    KeyStoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// File-backed key store. The file is loaded or created at most once per
/// instance, no matter how many threads ask for the key at the same time.
#[derive(Debug)]
pub struct SecretKeyStore {
    path: PathBuf,
    key: OnceLock<SecretKey>,
    init: Mutex<()>,
}

impl SecretKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached key, loading or creating the file on first call.
    pub fn load_or_create(&self) -> Result<&SecretKey, KeyStoreError> {
        if let Some(key) = self.key.get() {
            return Ok(key);
        }

        // Only first-time callers contend here; later calls return above.
        let _guard = self
            .init
            .lock()
            .map_err(|err| KeyStoreError::Lock(err.to_string()))?;
        if let Some(key) = self.key.get() {
            return Ok(key);
        }

        let key = load_or_create(&self.path)?;
        Ok(self.key.get_or_init(|| key))
    }

    /// Independent copy of the cached key; mutating it never affects the store.
    pub fn get_key_copy(&self) -> Result<SecretKey, KeyStoreError> {
        self.load_or_create().cloned()
    }
}

impl KeyProvider for SecretKeyStore {
    fn get_or_create(&self) -> Result<SecretKey, KeyStoreError> {
        self.get_key_copy()
    }
}

/// In-memory key provider for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyProvider {
    inner: Arc<OnceLock<SecretKey>>,
}

impl InMemoryKeyProvider {
    /// Provider pinned to the given key bytes.
    pub fn with_key(bytes: impl Into<Vec<u8>>) -> Self {
        let inner = OnceLock::new();
        let _ = inner.set(SecretKey::from_bytes(bytes));
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl KeyProvider for InMemoryKeyProvider {
    fn get_or_create(&self) -> Result<SecretKey, KeyStoreError> {
        Ok(self.inner.get_or_init(generate_key).clone())
    }
}

fn generate_key() -> SecretKey {
    let mut bytes = vec![0u8; KEY_LEN];
    OsRng.fill_bytes(&mut bytes);
    SecretKey(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_32_byte_key_and_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data").join("nested").join("secret.bin");

        let key = load_or_create(&path).expect("create");

        assert_eq!(key.len(), KEY_LEN);
        assert_eq!(fs::read(&path).expect("read back"), key.as_bytes());
    }

    #[test]
    fn reload_returns_persisted_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("secret.bin");

        let first = load_or_create(&path).expect("create");
        let second = load_or_create(&path).expect("load");
        assert_eq!(first, second);
    }

    #[test]
    fn existing_file_is_loaded_without_length_check() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("secret.bin");
        fs::write(&path, b"short").expect("seed file");

        let key = load_or_create(&path).expect("load");
        assert_eq!(key.as_bytes(), b"short");
    }

    #[cfg(unix)]
    #[test]
    fn new_key_file_is_owner_read_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("secret.bin");
        load_or_create(&path).expect("create");

        let mode = fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o400);
    }

    #[test]
    fn unusable_parent_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").expect("seed file");

        let err = load_or_create(&blocker.join("secret.bin")).expect_err("parent is a file");
        assert!(matches!(err, KeyStoreError::Io { .. }));
    }

    #[test]
    fn concurrent_first_access_runs_one_creation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SecretKeyStore::new(dir.path().join("secret.bin"));

        let keys: Vec<SecretKey> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| s.spawn(|| store.get_key_copy().expect("key")))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("thread"))
                .collect()
        });

        assert!(keys.iter().all(|k| k == &keys[0]));
        assert_eq!(
            fs::read(store.path()).expect("read back"),
            keys[0].as_bytes()
        );
    }

    #[test]
    fn key_copy_is_independent_of_the_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SecretKeyStore::new(dir.path().join("secret.bin"));

        let original = store.get_key_copy().expect("key");
        let mut mutated = store.get_key_copy().expect("key").into_bytes();
        mutated[0] ^= 0xFF;

        assert_eq!(store.get_key_copy().expect("key"), original);
        assert_ne!(mutated, original.as_bytes());
    }

    #[test]
    fn memory_provider_returns_same_key() {
        let provider = InMemoryKeyProvider::default();
        let first = provider.get_or_create().expect("key");
        let second = provider.clone().get_or_create().expect("key");

        assert_eq!(first, second);
        assert_eq!(first.len(), KEY_LEN);
    }

    #[test]
    fn memory_provider_can_be_pinned() {
        let provider = InMemoryKeyProvider::with_key([0u8; 32]);
        assert_eq!(provider.get_or_create().expect("key").as_bytes(), &[0u8; 32]);
    }

    #[test]
    fn debug_output_hides_key_bytes() {
        let rendered = format!("{:?}", SecretKey::from_bytes(vec![0xAB; 32]));
        assert_eq!(rendered, "SecretKey(<32 bytes redacted>)");
    }
}
