use crate::audio::AudioStreamSpec;
use crate::error::{HeaderError, SpecError};
use serde::Serialize;
use std::io::Read;

/// Size of the canonical PCM WAV header
pub const HEADER_LEN: usize = 44;

/// Bytes counted by `file_size` beyond the data region
const RIFF_OVERHEAD: u32 = 36;

/// Canonical 44-byte RIFF/WAVE header
///
/// All multi-byte fields are little-endian at fixed offsets:
///
/// | Offset | Field           |
/// |--------|-----------------|
/// | 0      | `"RIFF"`        |
/// | 4      | file size - 8   |
/// | 8      | `"WAVEfmt "`    |
/// | 16     | 16              |
/// | 20     | 1 (PCM)         |
/// | 22     | channels        |
/// | 24     | sample rate     |
/// | 28     | byte rate       |
/// | 32     | block align     |
/// | 34     | bits per sample |
/// | 36     | `"data"`        |
/// | 40     | data size       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WavHeader {
    pub file_size: u32,
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavHeader {
    pub fn new(spec: &AudioStreamSpec, data_size: u32) -> Self {
        Self {
            file_size: data_size.saturating_add(RIFF_OVERHEAD),
            audio_format: 1,
            channels: spec.channels(),
            sample_rate: spec.sample_rate_hz(),
            byte_rate: spec.byte_rate(),
            block_align: spec.block_align(),
            bits_per_sample: spec.bits_per_sample(),
            data_size,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(b"RIFF");
        out[4..8].copy_from_slice(&self.file_size.to_le_bytes());
        out[8..16].copy_from_slice(b"WAVEfmt ");
        out[16..20].copy_from_slice(&16u32.to_le_bytes());
        out[20..22].copy_from_slice(&self.audio_format.to_le_bytes());
        out[22..24].copy_from_slice(&self.channels.to_le_bytes());
        out[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        out[28..32].copy_from_slice(&self.byte_rate.to_le_bytes());
        out[32..34].copy_from_slice(&self.block_align.to_le_bytes());
        out[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        out[36..40].copy_from_slice(b"data");
        out[40..44].copy_from_slice(&self.data_size.to_le_bytes());
        out
    }

    /// Parse a finalized header.
    ///
    /// A recording that never reached finalize still carries the zeroed
    /// placeholder and is rejected with [`HeaderError::Placeholder`].
    pub fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < HEADER_LEN {
            return Err(HeaderError::Truncated(bytes.len()));
        }
        let bytes = &bytes[..HEADER_LEN];

        let file_size = read_u32(bytes, 4);
        let data_size = read_u32(bytes, 40);

        if bytes.iter().all(|&b| b == 0) || file_size == 0 {
            return Err(HeaderError::Placeholder);
        }
        if &bytes[0..4] != b"RIFF" {
            return Err(HeaderError::Magic("RIFF"));
        }
        if &bytes[8..16] != b"WAVEfmt " {
            return Err(HeaderError::Magic("WAVEfmt "));
        }
        if &bytes[36..40] != b"data" {
            return Err(HeaderError::Magic("data"));
        }

        let audio_format = read_u16(bytes, 20);
        if audio_format != 1 {
            return Err(HeaderError::Format(audio_format));
        }
        if file_size != data_size.wrapping_add(RIFF_OVERHEAD) {
            return Err(HeaderError::SizeMismatch {
                file_size,
                data_size,
            });
        }

        Ok(Self {
            file_size,
            audio_format,
            channels: read_u16(bytes, 22),
            sample_rate: read_u32(bytes, 24),
            byte_rate: read_u32(bytes, 28),
            block_align: read_u16(bytes, 32),
            bits_per_sample: read_u16(bytes, 34),
            data_size,
        })
    }

    /// Read and parse the first 44 bytes of `reader`
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, HeaderError> {
        let mut buf = [0u8; HEADER_LEN];
        let mut filled = 0;
        while filled < HEADER_LEN {
            let n = reader.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(HeaderError::Truncated(filled));
            }
            filled += n;
        }
        Self::parse(&buf)
    }

    pub fn spec(&self) -> Result<AudioStreamSpec, SpecError> {
        AudioStreamSpec::new(self.sample_rate, self.bits_per_sample, self.channels)
    }

    /// Total file length implied by the header
    pub fn total_len(&self) -> u64 {
        HEADER_LEN as u64 + self.data_size as u64
    }

    pub fn duration_secs(&self) -> f64 {
        if self.byte_rate == 0 {
            return 0.0;
        }
        self.data_size as f64 / self.byte_rate as f64
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
