use super::header::{WavHeader, HEADER_LEN};
use crate::audio::AudioStreamSpec;
use crate::error::StorageError;
use crate::storage::{OpenMode, Storage, StorageFile};
use std::io::{Seek, SeekFrom, Write};
use tracing::debug;

/// Largest data region the 32-bit `file_size` field can describe
const MAX_DATA_LEN: u64 = u32::MAX as u64 - 36;

/// Streaming WAV writer for sources of unknown length
///
/// Writes a zeroed placeholder header up front, appends PCM blocks as they
/// arrive and patches the header in [`finalize`](Self::finalize). Dropping the
/// writer without finalizing leaves the placeholder in place so readers can
/// tell the recording was cut short.
pub struct WavWriter {
    path: String,
    file: Box<dyn StorageFile>,
    spec: AudioStreamSpec,
    data_len: u64,
}

impl WavWriter {
    /// Create (or truncate) `path` and reserve the header
    pub fn create(
        storage: &dyn Storage,
        path: &str,
        spec: AudioStreamSpec,
    ) -> Result<Self, StorageError> {
        let mut file = storage.open(path, OpenMode::Write)?;
        file.write_all(&[0u8; HEADER_LEN])
            .map_err(|source| StorageError::Write {
                path: path.to_string(),
                source,
            })?;

        debug!("Created {} on {} storage", path, storage.name());

        Ok(Self {
            path: path.to_string(),
            file,
            spec,
            data_len: 0,
        })
    }

    /// Append raw PCM bytes to the data region
    pub fn append_block(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        if self.data_len + bytes.len() as u64 > MAX_DATA_LEN {
            return Err(StorageError::TooLarge {
                path: self.path.clone(),
            });
        }

        self.file
            .write_all(bytes)
            .map_err(|source| StorageError::Write {
                path: self.path.clone(),
                source,
            })?;
        self.data_len += bytes.len() as u64;

        Ok(())
    }

    /// Rewrite the header with the sizes written so far.
    ///
    /// Calling this twice without appends in between writes the same bytes.
    pub fn finalize(&mut self) -> Result<WavHeader, StorageError> {
        // MAX_DATA_LEN keeps this in range
        let header = WavHeader::new(&self.spec, self.data_len as u32);

        self.seek(SeekFrom::Start(0))?;
        self.file
            .write_all(&header.to_bytes())
            .map_err(|source| StorageError::Write {
                path: self.path.clone(),
                source,
            })?;
        self.seek(SeekFrom::Start(HEADER_LEN as u64 + self.data_len))?;
        self.flush()?;

        debug!(
            "Finalized {}: {} data bytes, file size field {}",
            self.path, header.data_size, header.file_size
        );

        Ok(header)
    }

    /// Flush and release the handle, returning the data length
    pub fn close(mut self) -> Result<u64, StorageError> {
        self.flush()?;
        Ok(self.data_len)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn spec(&self) -> AudioStreamSpec {
        self.spec
    }

    /// PCM bytes appended so far
    pub fn data_len(&self) -> u64 {
        self.data_len
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<(), StorageError> {
        self.file
            .seek(pos)
            .map(|_| ())
            .map_err(|source| StorageError::Seek {
                path: self.path.clone(),
                source,
            })
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        self.file.flush().map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
