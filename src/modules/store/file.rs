use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{BackendLock, StoreBackend, Tables};
use crate::modules::encryption::keys::{NONCE_LEN, SALT_LEN};
use crate::modules::encryption::{
    decrypt_data, derive_key_from_passphrase, encrypt_data, generate_random_nonce,
    generate_random_salt,
};
use crate::modules::error::StoreError;

/// Tables serialized as JSON in a single file.
///
/// With a passphrase the file is `salt || nonce || AES-256-GCM ciphertext`.
/// Transactions from every process sharing the path are serialized through
/// an advisory lock on a `<path>.lock` sidecar.
pub struct FileBackend {
    path: PathBuf,
    passphrase: Option<String>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>, passphrase: Option<String>) -> Self {
        Self {
            path: path.into(),
            passphrase,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn seal(&self, plaintext: Vec<u8>) -> Result<Vec<u8>, StoreError> {
        let passphrase = match &self.passphrase {
            Some(passphrase) => passphrase,
            None => return Ok(plaintext),
        };

        let salt = generate_random_salt();
        let nonce = generate_random_nonce();
        let key = derive_key_from_passphrase(passphrase, &salt);
        let encrypted = encrypt_data(&plaintext, &key, &nonce).map_err(StoreError::Encryption)?;

        let mut file_data = Vec::with_capacity(SALT_LEN + NONCE_LEN + encrypted.len());
        file_data.extend_from_slice(&salt);
        file_data.extend_from_slice(&nonce);
        file_data.extend_from_slice(&encrypted);
        Ok(file_data)
    }

    fn open(&self, file_data: Vec<u8>) -> Result<Vec<u8>, StoreError> {
        let passphrase = match &self.passphrase {
            Some(passphrase) => passphrase,
            None => return Ok(file_data),
        };

        if file_data.len() < SALT_LEN + NONCE_LEN {
            return Err(StoreError::Encryption(format!(
                "{} is too short to be an encrypted store",
                self.path.display()
            )));
        }

        let (salt, rest) = file_data.split_at(SALT_LEN);
        let (nonce, encrypted) = rest.split_at(NONCE_LEN);
        let key = derive_key_from_passphrase(passphrase, salt);
        decrypt_data(encrypted, &key, nonce).map_err(StoreError::Encryption)
    }
}

impl StoreBackend for FileBackend {
    fn read(&self) -> Result<Tables, StoreError> {
        let file_data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Tables::default()),
            Err(e) => return Err(e.into()),
        };

        let json = self.open(file_data)?;
        Ok(serde_json::from_slice(&json)?)
    }

    fn write(&self, tables: &Tables) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(tables)?;
        let file_data = self.seal(json)?;

        // Write next to the target so the final rename stays on one filesystem
        let dir = self.parent_dir();
        fs::create_dir_all(&dir)?;

        let mut staged = NamedTempFile::new_in(&dir)?;
        staged.write_all(&file_data)?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn lock(&self) -> Result<BackendLock, StoreError> {
        fs::create_dir_all(self.parent_dir())?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        BackendLock::exclusive(file)
    }
}
