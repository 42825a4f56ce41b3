//! In-memory storage implementation for testing and ephemeral use.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::Result;
use crate::storage::traits::{Storage, StorageConfig, StorageError, check_key};

/// An in-memory storage implementation.
///
/// Clones share the same map, so a test can keep a handle to storage it has
/// given to a service.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    /// The blobs stored in memory.
    files: Arc<Mutex<HashMap<String, Box<[u8]>>>>,
    /// Whether mutations are currently rejected.
    read_only: Arc<AtomicBool>,
}

impl MemoryStorage {
    /// Create a new memory storage.
    pub fn new(config: StorageConfig) -> Self {
        MemoryStorage {
            files: Arc::new(Mutex::new(HashMap::new())),
            read_only: Arc::new(AtomicBool::new(config.read_only)),
        }
    }

    /// Create a new memory storage with default configuration.
    pub fn new_default() -> Self {
        Self::new(StorageConfig::default())
    }

    /// Start or stop rejecting mutations.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn check_writable(&self, name: &str) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            Err(StorageError::ReadOnly(name.to_string()).into())
        } else {
            Ok(())
        }
    }

    /// Get the number of blobs stored.
    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    /// Get the total size of all blobs.
    pub fn total_size(&self) -> u64 {
        let files = self.files.lock();
        files.values().map(|data| data.len() as u64).sum()
    }

    /// Clear all blobs from storage.
    pub fn clear(&self) -> Result<()> {
        self.check_writable("*")?;
        self.files.lock().clear();
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new_default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        check_key(name)?;
        self.files
            .lock()
            .get(name)
            .map(|data| data.to_vec())
            .ok_or_else(|| StorageError::NotFound(name.to_string()).into())
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        check_key(name)?;
        self.check_writable(name)?;
        self.files
            .lock()
            .insert(name.to_string(), data.to_vec().into_boxed_slice());
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.files.lock().contains_key(name)
    }

    fn delete(&self, name: &str) -> Result<()> {
        check_key(name)?;
        self.check_writable(name)?;
        self.files.lock().remove(name);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.files.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn rename(&self, old_name: &str, new_name: &str) -> Result<()> {
        check_key(old_name)?;
        check_key(new_name)?;
        self.check_writable(new_name)?;
        let mut files = self.files.lock();
        let data = files
            .remove(old_name)
            .ok_or_else(|| StorageError::NotFound(old_name.to_string()))?;
        files.insert(new_name.to_string(), data);
        Ok(())
    }
}
