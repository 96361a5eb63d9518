use super::spec::AudioStreamSpec;
use crate::error::PeripheralError;
use hound::WavReader;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Block-oriented PCM input (an I2S microphone on the device)
///
/// The stream format is fixed before the first read. Implementations:
/// - `ToneSource`: synthetic sine wave, for hosts without a microphone
/// - `WavFileSource`: replays an existing WAV file
pub trait AudioSource: Send {
    /// Format of the bytes returned by `read_block`
    fn spec(&self) -> AudioStreamSpec;

    /// Fill `buf` with interleaved little-endian PCM.
    ///
    /// Blocks at most `timeout`. Returns the number of bytes written; a read
    /// that cannot produce data reports an error instead of returning 0.
    fn read_block(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, PeripheralError>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Sine-wave generator
pub struct ToneSource {
    spec: AudioStreamSpec,
    frequency_hz: f32,
    amplitude: f32,
    phase: f32,
    realtime: bool,
}

impl ToneSource {
    pub fn new(spec: AudioStreamSpec, frequency_hz: f32) -> Self {
        Self {
            spec,
            frequency_hz,
            amplitude: 0.5,
            phase: 0.0,
            realtime: false,
        }
    }

    /// Sleep for the duration of each generated block, like a sample clock
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Peak level as a fraction of full scale
    pub fn amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    fn next_sample(&mut self) -> i16 {
        let value = (self.phase * std::f32::consts::TAU).sin() * self.amplitude;
        self.phase = (self.phase + self.frequency_hz / self.spec.sample_rate_hz() as f32).fract();
        (value * i16::MAX as f32) as i16
    }
}

impl AudioSource for ToneSource {
    fn spec(&self) -> AudioStreamSpec {
        self.spec
    }

    fn read_block(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, PeripheralError> {
        let frame_len = self.spec.block_align() as usize;
        let sample_len = (self.spec.bits_per_sample() / 8) as usize;
        let frames = buf.len() / frame_len;
        if frames == 0 {
            return Err(PeripheralError::NoData);
        }

        for frame in buf[..frames * frame_len].chunks_exact_mut(frame_len) {
            let sample = self.next_sample();
            for slot in frame.chunks_exact_mut(sample_len) {
                if sample_len == 4 {
                    // left-justified like a 24-bit I2S microphone word
                    slot.copy_from_slice(&((sample as i32) << 11).to_le_bytes());
                } else {
                    slot.copy_from_slice(&sample.to_le_bytes());
                }
            }
        }

        let written = frames * frame_len;
        if self.realtime {
            pace(&self.spec, written);
        }

        Ok(written)
    }

    fn name(&self) -> &str {
        "tone"
    }
}

/// Replays the PCM data of a 16-bit WAV file, wrapping around at the end
pub struct WavFileSource {
    path: String,
    spec: AudioStreamSpec,
    pcm: Vec<u8>,
    position: usize,
    realtime: bool,
}

impl WavFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PeripheralError> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .map_err(|e| PeripheralError::Decode(format!("{}: {}", path.display(), e)))?;

        let wav_spec = reader.spec();
        if wav_spec.bits_per_sample != 16 || wav_spec.sample_format != hound::SampleFormat::Int {
            return Err(PeripheralError::Decode(format!(
                "{}: expected 16-bit integer PCM, got {} bits",
                path.display(),
                wav_spec.bits_per_sample
            )));
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PeripheralError::Decode(e.to_string()))?;
        if samples.is_empty() {
            return Err(PeripheralError::NoData);
        }

        let spec = AudioStreamSpec::new(wav_spec.sample_rate, 16, wav_spec.channels)
            .map_err(|e| PeripheralError::Decode(e.to_string()))?;
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels",
            spec.duration_secs(pcm.len() as u64),
            spec.sample_rate_hz(),
            spec.channels()
        );

        Ok(Self {
            path: path.display().to_string(),
            spec,
            pcm,
            position: 0,
            realtime: false,
        })
    }

    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl AudioSource for WavFileSource {
    fn spec(&self) -> AudioStreamSpec {
        self.spec
    }

    fn read_block(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, PeripheralError> {
        let frame_len = self.spec.block_align() as usize;
        let want = buf.len() - buf.len() % frame_len;
        if want == 0 {
            return Err(PeripheralError::NoData);
        }

        let mut written = 0;
        while written < want {
            if self.position >= self.pcm.len() {
                self.position = 0;
            }
            let n = (want - written).min(self.pcm.len() - self.position);
            buf[written..written + n].copy_from_slice(&self.pcm[self.position..self.position + n]);
            self.position += n;
            written += n;
        }

        if self.realtime {
            pace(&self.spec, written);
        }

        Ok(written)
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}

fn pace(spec: &AudioStreamSpec, bytes: usize) {
    std::thread::sleep(Duration::from_secs_f64(spec.duration_secs(bytes as u64)));
}
