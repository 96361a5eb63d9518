use crate::audio::{AudioStreamSpec, CaptureLimit, RecorderConfig, SampleConversion};
use crate::error::SpecError;
use crate::transfer::{Framing, LinkTiming, StreamerConfig};
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

/// Environment variable prefix, e.g. `WAV_COURIER__HTTP__PORT=8081`
pub const ENV_PREFIX: &str = "WAV_COURIER";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub audio: AudioConfig,
    pub storage: StorageConfig,
    pub transfer: TransferConfig,
    pub http: HttpConfig,
    pub nats: NatsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Bit depth delivered by the source (16 or 32)
    pub bits_per_sample: u16,
    pub channels: u16,
    /// Bytes per source read
    pub block_size: usize,
    pub read_timeout_ms: u64,
    /// Recording length; ignored when `frames` is set
    pub duration_secs: u64,
    /// Exact number of sample frames to record
    pub frames: Option<u64>,
    pub conversion: SampleConversion,
    pub source: SourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// `tone` or `wav`
    pub kind: String,
    /// WAV file for the `wav` source
    pub path: Option<String>,
    pub tone_hz: f32,
    /// Pace reads at the sample rate
    pub realtime: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: String,
    /// Fixed file name; numbered `record_N.wav` names when unset
    pub file_name: Option<String>,
    pub mount_attempts: u32,
    pub mount_retry_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub chunk_size: usize,
    pub framing: Framing,
    pub settle_ms: u64,
    pub pacing_ms: u64,
    pub poll_ms: u64,
    pub session_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    pub transfer_chunk_size: usize,
    pub confirmation_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    pub url: String,
    pub subject_prefix: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "wav-courier".to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            bits_per_sample: 16,
            channels: 1,
            block_size: 512,
            read_timeout_ms: 1000,
            duration_secs: 10,
            frames: None,
            conversion: SampleConversion::Passthrough,
            source: SourceConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: "tone".to_string(),
            path: None,
            tone_hz: 440.0,
            realtime: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: "recordings".to_string(),
            file_name: None,
            mount_attempts: 3,
            mount_retry_ms: 500,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            framing: Framing::Raw,
            settle_ms: 5000,
            pacing_ms: 100,
            poll_ms: 50,
            session_timeout_secs: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 80,
            transfer_chunk_size: 16384,
            confirmation_timeout_secs: 300,
        }
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            subject_prefix: "wav".to_string(),
        }
    }
}

impl Config {
    /// Load `path` (any format the `config` crate knows, optional) with
    /// environment overrides on top of the defaults
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl AudioConfig {
    /// Format delivered by the source
    pub fn source_spec(&self) -> Result<AudioStreamSpec, SpecError> {
        AudioStreamSpec::new(self.sample_rate, self.bits_per_sample, self.channels)
    }

    pub fn capture_limit(&self) -> CaptureLimit {
        match self.frames {
            Some(frames) => CaptureLimit::Frames(frames),
            None => CaptureLimit::Duration(Duration::from_secs(self.duration_secs)),
        }
    }

    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            block_size: self.block_size,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            limit: self.capture_limit(),
            conversion: self.conversion,
        }
    }
}

impl TransferConfig {
    pub fn streamer_config(&self) -> StreamerConfig {
        StreamerConfig {
            chunk_size: self.chunk_size,
            framing: self.framing,
        }
    }

    pub fn link_timing(&self) -> LinkTiming {
        LinkTiming {
            settle_delay: Duration::from_millis(self.settle_ms),
            pacing: Duration::from_millis(self.pacing_ms),
            poll_interval: Duration::from_millis(self.poll_ms),
            session_timeout: self.session_timeout_secs.map(Duration::from_secs),
        }
    }
}

impl HttpConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}
