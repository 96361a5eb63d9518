use crate::error::SpecError;
use serde::Serialize;

/// PCM stream parameters, fixed for the lifetime of one recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AudioStreamSpec {
    sample_rate_hz: u32,
    bits_per_sample: u16,
    channels: u16,
}

impl AudioStreamSpec {
    pub fn new(sample_rate_hz: u32, bits_per_sample: u16, channels: u16) -> Result<Self, SpecError> {
        if sample_rate_hz == 0 {
            return Err(SpecError::ZeroSampleRate);
        }
        if !matches!(bits_per_sample, 16 | 32) {
            return Err(SpecError::BitDepth(bits_per_sample));
        }
        if channels == 0 {
            return Err(SpecError::NoChannels);
        }

        // block align and byte rate must fit their 2- and 4-byte header fields
        let block_align = channels
            .checked_mul(bits_per_sample / 8)
            .ok_or(SpecError::BlockAlignOverflow {
                channels,
                bits_per_sample,
            })?;
        sample_rate_hz
            .checked_mul(block_align as u32)
            .ok_or(SpecError::ByteRateOverflow {
                sample_rate_hz,
                block_align,
            })?;

        Ok(Self {
            sample_rate_hz,
            bits_per_sample,
            channels,
        })
    }

    /// 16-bit mono, the format every notify-link variant records in
    pub fn mono_16bit(sample_rate_hz: u32) -> Result<Self, SpecError> {
        Self::new(sample_rate_hz, 16, 1)
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Bytes per sample frame (all channels)
    pub fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate_hz * self.block_align() as u32
    }

    /// Playback duration of `bytes` of PCM data
    pub fn duration_secs(&self, bytes: u64) -> f64 {
        bytes as f64 / self.byte_rate() as f64
    }

    /// Same rate and channel layout at a different bit depth
    pub fn with_bits(&self, bits_per_sample: u16) -> Result<Self, SpecError> {
        Self::new(self.sample_rate_hz, bits_per_sample, self.channels)
    }
}
