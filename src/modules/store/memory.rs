use std::sync::Mutex;

use super::{StoreBackend, Tables};
use crate::modules::error::StoreError;

/// Tables held in process memory; nothing survives a restart
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
}

impl StoreBackend for MemoryBackend {
    fn read(&self) -> Result<Tables, StoreError> {
        let tables = self.tables.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.clone())
    }

    fn write(&self, tables: &Tables) -> Result<(), StoreError> {
        let mut stored = self.tables.lock().map_err(|_| StoreError::Poisoned)?;
        *stored = tables.clone();
        Ok(())
    }
}
