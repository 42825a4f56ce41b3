//! Storage abstraction layer for Parley.
//!
//! A small key-value store holding whole blobs. The persistence layer writes
//! model weights, metadata, manifests and the learned-examples collection
//! through it. Two backends are provided: an in-memory map for tests and
//! ephemeral use, and a directory of files.

pub mod file;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use traits::{Storage, StorageConfig, StorageError};
