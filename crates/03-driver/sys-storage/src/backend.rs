//! Key/value slots the config store persists into.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{StorageError, StorageResult};

/// Durable byte slots addressed by namespace and key.
pub trait KvBackend: Send + Sync {
    /// Reads a slot. `Ok(None)` means nothing was ever stored there.
    fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces a slot's contents.
    fn set(&self, namespace: &str, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Clears a slot. Returns whether anything was stored.
    fn remove(&self, namespace: &str, key: &str) -> StorageResult<bool>;
}

/// Process-local backend; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let slots = self.slots.lock();
        Ok(slots
            .get(&(namespace.to_owned(), key.to_owned()))
            .cloned())
    }

    fn set(&self, namespace: &str, key: &str, value: &[u8]) -> StorageResult<()> {
        self.slots
            .lock()
            .insert((namespace.to_owned(), key.to_owned()), value.to_vec());
        Ok(())
    }

    fn remove(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        Ok(self
            .slots
            .lock()
            .remove(&(namespace.to_owned(), key.to_owned()))
            .is_some())
    }
}

/// Stores each slot as `<root>/<namespace>/<key>`.
///
/// Writes go to a sibling temp file that is renamed over the slot, so a
/// reader sees either the old or the new contents, never a torn record.
#[derive(Clone, Debug)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Uses `root` as the storage directory; it is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn slot_path(&self, namespace: &str, key: &str) -> StorageResult<PathBuf> {
        validate_name(namespace)?;
        validate_name(key)?;
        Ok(self.root.join(namespace).join(key))
    }
}

fn validate_name(name: &str) -> StorageResult<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_owned()))
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl KvBackend for FileBackend {
    fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.slot_path(namespace, key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&path)(err)),
        }
    }

    fn set(&self, namespace: &str, key: &str, value: &[u8]) -> StorageResult<()> {
        let path = self.slot_path(namespace, key)?;
        let dir = self.root.join(namespace);
        fs::create_dir_all(&dir).map_err(io_error(&dir))?;

        let tmp = dir.join(format!(".{key}.tmp"));
        let mut file = fs::File::create(&tmp).map_err(io_error(&tmp))?;
        file.write_all(value).map_err(io_error(&tmp))?;
        file.sync_all().map_err(io_error(&tmp))?;
        drop(file);
        fs::rename(&tmp, &path).map_err(io_error(&path))
    }

    fn remove(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        let path = self.slot_path(namespace, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(io_error(&path)(err)),
        }
    }
}
