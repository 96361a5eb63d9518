pub mod convert;
pub mod recorder;
pub mod source;
pub mod spec;

pub use convert::SampleConversion;
pub use recorder::{CaptureLimit, Recorder, RecorderConfig, RecordingMetadata};
pub use source::{AudioSource, ToneSource, WavFileSource};
pub use spec::AudioStreamSpec;
