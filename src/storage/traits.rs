//! Storage abstraction trait and common types.

use crate::error::{ParleyError, Result};

/// A trait for key-value blob stores.
///
/// Keys are flat names (`model.manifest.json`, `model.weights.3.bin`); they
/// must not contain path separators.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Read a whole blob. A missing key is [`StorageError::NotFound`].
    fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Create or replace a blob.
    fn write(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Check if a blob exists.
    fn exists(&self, name: &str) -> bool;

    /// Delete a blob. Deleting a missing key is not an error.
    fn delete(&self, name: &str) -> Result<()>;

    /// List all keys, sorted.
    fn list(&self) -> Result<Vec<String>>;

    /// Rename a blob, replacing any existing blob at `new_name`.
    fn rename(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Read a blob, mapping a missing key to `None`.
    fn read_optional(&self, name: &str) -> Result<Option<Vec<u8>>> {
        if !self.exists(name) {
            return Ok(None);
        }
        self.read(name).map(Some)
    }

    /// Write through a temporary key and rename it into place, so readers
    /// see either the old blob or the new one.
    fn write_atomic(&self, name: &str, data: &[u8]) -> Result<()> {
        let temp = format!("{name}.tmp");
        self.write(&temp, data)?;
        if let Err(e) = self.rename(&temp, name) {
            let _ = self.delete(&temp);
            return Err(e);
        }
        Ok(())
    }
}

/// Configuration for storage backends.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Whether to fsync every write.
    pub sync_writes: bool,

    /// Reject every mutation.
    pub read_only: bool,
}

/// Error types specific to storage operations.
#[derive(Debug, Clone)]
pub enum StorageError {
    /// Blob not found.
    NotFound(String),

    /// Key contains characters that are not allowed.
    InvalidKey(String),

    /// Storage rejects writes.
    ReadOnly(String),

    /// I/O error.
    IoError(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::NotFound(name) => write!(f, "Blob not found: {name}"),
            StorageError::InvalidKey(name) => write!(f, "Invalid key: {name}"),
            StorageError::ReadOnly(name) => write!(f, "Storage is read-only: {name}"),
            StorageError::IoError(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for ParleyError {
    fn from(err: StorageError) -> Self {
        ParleyError::storage(err.to_string())
    }
}

/// Reject keys that could escape a directory-backed store.
pub(crate) fn check_key(name: &str) -> Result<()> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name == "."
        || name == ".."
    {
        return Err(StorageError::InvalidKey(name.to_string()).into());
    }
    Ok(())
}
