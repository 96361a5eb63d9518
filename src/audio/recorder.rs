use super::convert::SampleConversion;
use super::source::AudioSource;
use super::spec::AudioStreamSpec;
use crate::error::{PeripheralError, RecordError};
use crate::storage::Storage;
use crate::wav::WavWriter;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// When the capture loop stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureLimit {
    /// Wall-clock duration since the first read
    Duration(Duration),
    /// Exact number of sample frames taken from the source
    Frames(u64),
}

/// Recorder configuration
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Bytes requested from the source per read (rounded down to whole frames)
    pub block_size: usize,
    /// Upper bound on each blocking read
    pub read_timeout: Duration,
    pub limit: CaptureLimit,
    pub conversion: SampleConversion,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            block_size: 512,
            read_timeout: Duration::from_secs(1),
            limit: CaptureLimit::Duration(Duration::from_secs(10)),
            conversion: SampleConversion::Passthrough,
        }
    }
}

/// Summary of a finished recording
#[derive(Debug, Clone, Serialize)]
pub struct RecordingMetadata {
    pub path: String,
    /// Format declared in the WAV header
    pub spec: AudioStreamSpec,
    /// PCM bytes after the header
    pub data_bytes: u64,
    /// Number of blocks read from the source
    pub blocks: u64,
    /// Playback duration
    pub duration_secs: f64,
    /// Wall-clock time spent capturing
    pub elapsed_secs: f64,
}

impl RecordingMetadata {
    pub fn file_len(&self) -> u64 {
        crate::wav::HEADER_LEN as u64 + self.data_bytes
    }
}

/// Captures one bounded recording into a WAV file
pub struct Recorder<'a> {
    storage: &'a dyn Storage,
    config: RecorderConfig,
}

impl<'a> Recorder<'a> {
    pub fn new(storage: &'a dyn Storage, config: RecorderConfig) -> Self {
        Self { storage, config }
    }

    /// Record like [`record`](Self::record), removing the partial file on
    /// failure. A file that was already at `path` before the session started
    /// writing is left alone.
    pub fn record_or_discard(
        &self,
        source: &mut dyn AudioSource,
        path: &str,
    ) -> Result<RecordingMetadata, RecordError> {
        let result = self.record(source, path);

        if let Err(e) = &result {
            if e.left_partial_file() && self.storage.exists(path) {
                info!("Discarding partial recording {}", path);
                if let Err(e) = self.storage.remove(path) {
                    warn!("Failed to remove partial recording {}: {}", path, e);
                }
            }
        }

        result
    }

    /// Record from `source` into `path`.
    ///
    /// A failed or empty read aborts the session. The file is then left with
    /// its placeholder header and the caller is expected to discard it.
    pub fn record(
        &self,
        source: &mut dyn AudioSource,
        path: &str,
    ) -> Result<RecordingMetadata, RecordError> {
        let input_spec = source.spec();
        let output_spec = self.config.conversion.output_spec(input_spec)?;

        let frame_len = input_spec.block_align() as usize;
        let block_len = (self.config.block_size - self.config.block_size % frame_len).max(frame_len);
        let byte_budget = match self.config.limit {
            CaptureLimit::Frames(frames) => Some(frames * frame_len as u64),
            CaptureLimit::Duration(_) => None,
        };

        let mut writer = WavWriter::create(self.storage, path, output_spec)?;
        let mut block = vec![0u8; block_len];
        let mut scratch = Vec::with_capacity(block_len);
        let mut captured: u64 = 0;
        let mut blocks: u64 = 0;

        info!(
            "Recording {} from {} source ({}Hz, {} bits, {} ch)",
            path,
            source.name(),
            input_spec.sample_rate_hz(),
            input_spec.bits_per_sample(),
            input_spec.channels()
        );

        let started = Instant::now();
        loop {
            let want = match byte_budget {
                Some(budget) => {
                    let remaining = budget - captured;
                    if remaining == 0 {
                        break;
                    }
                    block_len.min(remaining as usize)
                }
                None => {
                    if let CaptureLimit::Duration(limit) = self.config.limit {
                        if started.elapsed() >= limit {
                            break;
                        }
                    }
                    block_len
                }
            };

            let n = match source.read_block(&mut block[..want], self.config.read_timeout) {
                Ok(0) => {
                    error!("Error reading from {}: no data", source.name());
                    return Err(PeripheralError::NoData.into());
                }
                Ok(n) => n.min(want),
                Err(e) => {
                    error!("Error reading from {}: {}", source.name(), e);
                    return Err(e.into());
                }
            };

            let pcm = self.config.conversion.apply(&block[..n], &mut scratch);
            writer.append_block(pcm)?;
            captured += n as u64;
            blocks += 1;
        }

        let header = writer.finalize()?;
        let data_bytes = writer.close()?;

        let metadata = RecordingMetadata {
            path: path.to_string(),
            spec: output_spec,
            data_bytes,
            blocks,
            duration_secs: header.duration_secs(),
            elapsed_secs: started.elapsed().as_secs_f64(),
        };

        info!(
            "Recording complete: {} ({} bytes, {:.1}s of audio in {} blocks)",
            metadata.path,
            metadata.file_len(),
            metadata.duration_secs,
            metadata.blocks
        );

        Ok(metadata)
    }
}
