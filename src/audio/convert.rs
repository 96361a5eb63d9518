use super::spec::AudioStreamSpec;
use crate::error::SpecError;
use serde::Deserialize;

/// Default shift for SPH0645-style microphones (18 significant bits, left-justified)
pub const DEFAULT_SHIFT: u8 = 11;

/// Transformation applied to each captured block before it is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SampleConversion {
    /// Write source bytes unchanged
    #[default]
    Passthrough,
    /// Narrow 32-bit words to 16-bit samples with an arithmetic right shift
    Shift32To16 {
        #[serde(default = "default_shift")]
        shift: u8,
    },
}

fn default_shift() -> u8 {
    DEFAULT_SHIFT
}

impl SampleConversion {
    pub fn shift32_to16() -> Self {
        Self::Shift32To16 {
            shift: DEFAULT_SHIFT,
        }
    }

    /// Format of the converted bytes for a source producing `input`
    pub fn output_spec(&self, input: AudioStreamSpec) -> Result<AudioStreamSpec, SpecError> {
        match self {
            Self::Passthrough => Ok(input),
            Self::Shift32To16 { .. } => {
                if input.bits_per_sample() != 32 {
                    return Err(SpecError::ConversionSource(input.bits_per_sample()));
                }
                input.with_bits(16)
            }
        }
    }

    /// Convert `input`, using `scratch` when the bytes change.
    ///
    /// Trailing bytes that do not form a whole 32-bit word are dropped.
    pub fn apply<'a>(&self, input: &'a [u8], scratch: &'a mut Vec<u8>) -> &'a [u8] {
        match *self {
            Self::Passthrough => input,
            Self::Shift32To16 { shift } => {
                scratch.clear();
                for word in input.chunks_exact(4) {
                    let sample = i32::from_le_bytes([word[0], word[1], word[2], word[3]]);
                    scratch.extend_from_slice(&((sample >> shift) as i16).to_le_bytes());
                }
                scratch
            }
        }
    }
}
