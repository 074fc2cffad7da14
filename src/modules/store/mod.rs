//! Persisted store shared by the OTP ledger and the admin credential code.
//!
//! Every operation runs as one transaction: the backend's tables are read
//! under the store's mutex and the backend's own lock, the closure edits a
//! working copy, and the copy is written back only if the closure succeeds.
//! The backend lock is what serializes separate processes sharing one file.

mod file;
mod memory;
mod tables;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use fs2::FileExt;

use crate::modules::error::StoreError;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use tables::Tables;

/// Where tables live between transactions
pub trait StoreBackend: Send + Sync {
    fn read(&self) -> Result<Tables, StoreError>;
    fn write(&self, tables: &Tables) -> Result<(), StoreError>;

    /// Exclusive hold on the underlying storage for one transaction.
    /// Backends private to a single `Store` need nothing beyond its mutex.
    fn lock(&self) -> Result<BackendLock, StoreError> {
        Ok(BackendLock::default())
    }
}

/// Held for the duration of a transaction, released on drop
#[derive(Debug, Default)]
pub struct BackendLock {
    file: Option<File>,
}

impl BackendLock {
    /// Block until an exclusive advisory lock on `file` is granted
    pub fn exclusive(file: File) -> Result<Self, StoreError> {
        FileExt::lock_exclusive(&file)?;
        Ok(Self { file: Some(file) })
    }
}

impl Drop for BackendLock {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            // Closing the handle releases the lock anyway
            let _ = FileExt::unlock(file);
        }
    }
}

pub struct Store {
    backend: Box<dyn StoreBackend>,
    lock: Mutex<()>,
}

impl Store {
    pub fn with_backend(backend: Box<dyn StoreBackend>) -> Self {
        Self {
            backend,
            lock: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::with_backend(Box::new(MemoryBackend::default()))
    }

    /// JSON file store, encrypted at rest when a passphrase is given
    pub fn file(path: impl Into<PathBuf>, passphrase: Option<String>) -> Self {
        Self::with_backend(Box::new(FileBackend::new(path, passphrase)))
    }

    /// Run `f` against a working copy of the tables and commit it if `f` succeeds
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Tables) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let _held = self.backend.lock()?;
        let mut tables = self.backend.read()?;
        let value = f(&mut tables)?;
        self.backend.write(&tables)?;
        Ok(value)
    }

    /// Consistent read-only copy of the tables
    pub fn snapshot(&self) -> Result<Tables, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let _held = self.backend.lock()?;
        self.backend.read()
    }
}
