use super::{OpenMode, Storage, StorageFile};
use crate::error::StorageError;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Storage rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Mount `root`, creating it if needed
    pub fn mount(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|source| StorageError::Mount {
            path: root.display().to_string(),
            source,
        })?;

        info!("Storage mounted at {}", root.display());

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Mount with a bounded number of attempts, sleeping `delay` between them
    pub fn mount_with_retry(
        root: impl AsRef<Path>,
        attempts: u32,
        delay: Duration,
    ) -> Result<Self, StorageError> {
        let root = root.as_ref();
        let attempts = attempts.max(1);
        let mut attempt = 1;

        loop {
            match Self::mount(root) {
                Ok(storage) => return Ok(storage),
                Err(e) if attempt < attempts => {
                    warn!("Mount attempt {}/{} failed: {}. Retrying...", attempt, attempts, e);
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Storage for LocalStorage {
    fn open(&self, path: &str, mode: OpenMode) -> Result<Box<dyn StorageFile>, StorageError> {
        let full = self.resolve(path);

        let file = match mode {
            OpenMode::Write => File::create(&full).map_err(|source| StorageError::Create {
                path: path.to_string(),
                source,
            })?,
            OpenMode::Read => File::open(&full).map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => StorageError::NotFound {
                    path: path.to_string(),
                },
                _ => StorageError::Open {
                    path: path.to_string(),
                    source,
                },
            })?,
        };

        Ok(Box::new(file))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        let entries = fs::read_dir(&self.root).map_err(|source| StorageError::List { source })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StorageError::List { source })?;
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        Ok(names)
    }

    fn remove(&self, path: &str) -> Result<(), StorageError> {
        fs::remove_file(self.resolve(path)).map_err(|source| StorageError::Remove {
            path: path.to_string(),
            source,
        })
    }

    fn name(&self) -> &str {
        "local"
    }
}
