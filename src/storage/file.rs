//! File-based storage implementation.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ParleyError, Result};
use crate::storage::traits::{Storage, StorageConfig, StorageError, check_key};

/// A directory of files, one per key.
#[derive(Debug)]
pub struct FileStorage {
    /// The root directory for storage.
    directory: PathBuf,
    /// Storage configuration.
    config: StorageConfig,
}

impl FileStorage {
    /// Create a new file storage in the given directory.
    pub fn new<P: AsRef<Path>>(directory: P, config: StorageConfig) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();

        // Create directory if it doesn't exist
        if !directory.exists() {
            fs::create_dir_all(&directory)
                .map_err(|e| ParleyError::storage(format!("Failed to create directory: {e}")))?;
        }

        // Verify it's a directory
        if !directory.is_dir() {
            return Err(ParleyError::storage(format!(
                "Path is not a directory: {}",
                directory.display()
            )));
        }

        Ok(FileStorage { directory, config })
    }

    /// The root directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Get the full path for a key.
    fn file_path(&self, name: &str) -> Result<PathBuf> {
        check_key(name)?;
        Ok(self.directory.join(name))
    }

    fn check_writable(&self, name: &str) -> Result<()> {
        if self.config.read_only {
            Err(StorageError::ReadOnly(name.to_string()).into())
        } else {
            Ok(())
        }
    }
}

impl Storage for FileStorage {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.file_path(name)?;
        fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(name.to_string()).into()
            } else {
                StorageError::IoError(format!("Failed to read {name}: {e}")).into()
            }
        })
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.file_path(name)?;
        self.check_writable(name)?;

        let mut file = File::create(&path)
            .map_err(|e| StorageError::IoError(format!("Failed to create {name}: {e}")))?;
        file.write_all(data)
            .map_err(|e| StorageError::IoError(format!("Failed to write {name}: {e}")))?;
        if self.config.sync_writes {
            file.sync_all()
                .map_err(|e| StorageError::IoError(format!("Failed to sync {name}: {e}")))?;
        }
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.file_path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.file_path(name)?;
        self.check_writable(name)?;

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::IoError(format!("Failed to delete {name}: {e}")).into()),
        }
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn rename(&self, old_name: &str, new_name: &str) -> Result<()> {
        let old_path = self.file_path(old_name)?;
        let new_path = self.file_path(new_name)?;
        self.check_writable(new_name)?;

        fs::rename(&old_path, &new_path)
            .map_err(|e| StorageError::IoError(format!("Failed to rename file: {e}")))?;

        Ok(())
    }
}
