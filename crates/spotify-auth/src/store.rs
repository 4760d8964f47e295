//! Credential storage
//!
//! A flat string-to-string map that survives page loads, mirroring the
//! origin-scoped storage a page host offers. Writes that belong together
//! (the token tuple after an exchange or refresh) go through
//! [`PersistentStore::apply`] as one batch, so a reader never observes half
//! of one token set and half of another.
//!
//! [`FileStore`] persists the map as JSON using atomic temp-file + rename.
//! A failed write leaves both the file and the in-memory map unchanged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// One mutation inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    Set(String, String),
    Remove(String),
}

impl StoreWrite {
    pub fn set(key: &str, value: impl Into<String>) -> Self {
        StoreWrite::Set(key.to_string(), value.into())
    }

    pub fn remove(key: &str) -> Self {
        StoreWrite::Remove(key.to_string())
    }
}

/// Key/value credential storage.
pub trait PersistentStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Read several keys from one consistent view of the store.
    fn snapshot(&self, keys: &[&str]) -> Vec<Option<String>> {
        keys.iter().map(|k| self.get(k)).collect()
    }

    /// Apply every write in `writes` as a single atomic update.
    fn apply(&self, writes: Vec<StoreWrite>) -> Result<()>;

    /// Read and remove `key` in one step. Used for single-use secrets.
    fn take(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.apply(vec![StoreWrite::set(key, value)])
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.apply(vec![StoreWrite::remove(key)])
    }

    /// Remove every key in `keys`.
    fn clear(&self, keys: &[&str]) -> Result<()> {
        self.apply(keys.iter().map(|k| StoreWrite::remove(k)).collect())
    }
}

fn apply_writes(map: &mut HashMap<String, String>, writes: Vec<StoreWrite>) {
    for write in writes {
        match write {
            StoreWrite::Set(key, value) => {
                map.insert(key, value);
            }
            StoreWrite::Remove(key) => {
                map.remove(&key);
            }
        }
    }
}

fn poisoned() -> Error {
    Error::Storage("credential store lock poisoned".into())
}

/// Process-lifetime store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.state.lock().ok()?.get(key).cloned()
    }

    fn snapshot(&self, keys: &[&str]) -> Vec<Option<String>> {
        match self.state.lock() {
            Ok(state) => keys.iter().map(|k| state.get(*k).cloned()).collect(),
            Err(_) => vec![None; keys.len()],
        }
    }

    fn apply(&self, writes: Vec<StoreWrite>) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        apply_writes(&mut state, writes);
        Ok(())
    }

    fn take(&self, key: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        Ok(state.remove(key))
    }
}

/// Store for hosts without persistent storage: reads miss, writes vanish.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl PersistentStore for NullStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn apply(&self, _writes: Vec<StoreWrite>) -> Result<()> {
        Ok(())
    }

    fn take(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// JSON file-backed store.
///
/// The Mutex serializes all writes; reads clone out of the in-memory map and
/// never touch the disk.
pub struct FileStore {
    path: PathBuf,
    state: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Load the store from `path`.
    ///
    /// If the file doesn't exist, creates it as `{}` so future loads skip
    /// the cold-start path.
    pub fn open(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::Storage(format!("reading credential file: {e}")))?;
            let entries: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(path = %path.display(), keys = entries.len(), "loaded credentials");
            entries
        } else {
            info!(path = %path.display(), "credential file not found, starting with empty store");
            let entries = HashMap::new();
            write_atomic(&path, &entries)?;
            entries
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stage `change` on a copy, persist it, then commit in memory.
    fn commit<T>(&self, change: impl FnOnce(&mut HashMap<String, String>) -> T) -> Result<T> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        let mut next = state.clone();
        let out = change(&mut next);
        if next != *state {
            persist(&self.path, &next)?;
            *state = next;
        }
        Ok(out)
    }
}

impl PersistentStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.state.lock().ok()?.get(key).cloned()
    }

    fn snapshot(&self, keys: &[&str]) -> Vec<Option<String>> {
        match self.state.lock() {
            Ok(state) => keys.iter().map(|k| state.get(*k).cloned()).collect(),
            Err(_) => vec![None; keys.len()],
        }
    }

    fn apply(&self, writes: Vec<StoreWrite>) -> Result<()> {
        let count = writes.len();
        self.commit(|map| apply_writes(map, writes))?;
        debug!(writes = count, "applied credential batch");
        Ok(())
    }

    fn take(&self, key: &str) -> Result<Option<String>> {
        self.commit(|map| map.remove(key))
    }
}

/// Persist the map, keeping the blocking file I/O off the async workers.
///
/// On a multi-threaded tokio runtime the write runs under `block_in_place`
/// so other tasks move to another worker while this one waits on the disk.
/// Current-thread runtimes and plain threads write inline.
fn persist(path: &Path, data: &HashMap<String, String>) -> Result<()> {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| write_atomic(path, data))
        }
        _ => write_atomic(path, data),
    }
}

/// Write the credential map to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target, so a crash mid-write never leaves a truncated file. The file
/// holds bearer tokens, so it is created 0600 on unix.
fn write_atomic(path: &Path, data: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    std::fs::write(&tmp_path, json.as_bytes())
        .map_err(|e| Error::Storage(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&tmp_path, perms)
            .map_err(|e| Error::Storage(format!("setting credential file permissions: {e}")))?;
    }

    std::fs::rename(&tmp_path, path)
        .map_err(|e| Error::Storage(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}
