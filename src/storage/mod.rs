//! File-like backing stores for recordings
//!
//! A recording is written through one handle opened with [`OpenMode::Write`],
//! closed, and reopened with [`OpenMode::Read`] for transfer. Dropping a
//! handle closes it.

mod local;
mod memory;
mod naming;

use crate::error::StorageError;
use std::io::{Read, Seek, Write};

pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use naming::{latest_recording, next_recording_name, RECORDING_PREFIX};

/// How a file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create or truncate for recording
    Write,
    /// Read-only for transfer
    Read,
}

/// Open file handle
pub trait StorageFile: Read + Write + Seek + Send {}

impl<T: Read + Write + Seek + Send> StorageFile for T {}

/// Backing store (SD card, SPI flash, or a host directory)
pub trait Storage: Send + Sync {
    fn open(&self, path: &str, mode: OpenMode) -> Result<Box<dyn StorageFile>, StorageError>;

    fn exists(&self, path: &str) -> bool;

    /// File names at the root of the store
    fn list(&self) -> Result<Vec<String>, StorageError>;

    fn remove(&self, path: &str) -> Result<(), StorageError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
