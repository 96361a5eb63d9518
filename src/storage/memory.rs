use super::{OpenMode, Storage, StorageFile};
use crate::error::StorageError;
use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type FileData = Arc<Mutex<Vec<u8>>>;

/// In-memory store, used for tests and flash-less dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: Arc<Mutex<HashMap<String, FileData>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a file directly into the store
    pub fn insert(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.files()
            .insert(normalize(path), Arc::new(Mutex::new(bytes.into())));
    }

    /// Snapshot of a file's current contents
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files()
            .get(&normalize(path))
            .map(|data| lock(data).clone())
    }

    fn files(&self) -> MutexGuard<'_, HashMap<String, FileData>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    fn open(&self, path: &str, mode: OpenMode) -> Result<Box<dyn StorageFile>, StorageError> {
        let data = match mode {
            OpenMode::Write => {
                let data: FileData = Arc::new(Mutex::new(Vec::new()));
                self.files().insert(normalize(path), Arc::clone(&data));
                data
            }
            OpenMode::Read => self
                .files()
                .get(&normalize(path))
                .cloned()
                .ok_or_else(|| StorageError::NotFound {
                    path: path.to_string(),
                })?,
        };

        Ok(Box::new(MemoryFile { data, pos: 0, mode }))
    }

    fn exists(&self, path: &str) -> bool {
        self.files().contains_key(&normalize(path))
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut names: Vec<String> = self.files().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn remove(&self, path: &str) -> Result<(), StorageError> {
        match self.files().remove(&normalize(path)) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound {
                path: path.to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}

fn normalize(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

fn lock(data: &FileData) -> MutexGuard<'_, Vec<u8>> {
    data.lock().unwrap_or_else(PoisonError::into_inner)
}

struct MemoryFile {
    data: FileData,
    pos: u64,
    mode: OpenMode,
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = lock(&self.data);
        let start = (self.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.mode == OpenMode::Read {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file opened read-only",
            ));
        }

        let mut data = lock(&self.data);
        let start = self.pos as usize;
        if data.len() < start {
            data.resize(start, 0);
        }
        let overlap = buf.len().min(data.len() - start);
        data[start..start + overlap].copy_from_slice(&buf[..overlap]);
        data.extend_from_slice(&buf[overlap..]);
        self.pos += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = lock(&self.data).len() as i64;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(delta) => len + delta,
            SeekFrom::Current(delta) => self.pos as i64 + delta,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of file",
            ));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}
