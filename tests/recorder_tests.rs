// Integration tests for the capture pipeline
//
// These tests verify that blocks pulled from an audio source land in a
// WAV file whose header is only valid once the recording finished.

use anyhow::Result;
use std::time::Duration;
use tempfile::TempDir;
use wav_courier::audio::{
    AudioSource, AudioStreamSpec, CaptureLimit, Recorder, RecorderConfig, SampleConversion,
    ToneSource, WavFileSource,
};
use wav_courier::error::{PeripheralError, RecordError};
use wav_courier::storage::{LocalStorage, MemoryStorage, Storage};
use wav_courier::wav::{WavHeader, WavWriter, HEADER_LEN};

/// Source that fails after a fixed number of successful reads
struct FlakySource {
    spec: AudioStreamSpec,
    reads_left: u32,
}

impl AudioSource for FlakySource {
    fn spec(&self) -> AudioStreamSpec {
        self.spec
    }

    fn read_block(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, PeripheralError> {
        if self.reads_left == 0 {
            return Err(PeripheralError::Read { code: -1 });
        }
        self.reads_left -= 1;
        buf.fill(0x11);
        Ok(buf.len())
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

fn frames_config(frames: u64) -> RecorderConfig {
    RecorderConfig {
        limit: CaptureLimit::Frames(frames),
        ..RecorderConfig::default()
    }
}

#[test]
fn test_recording_by_frame_count() -> Result<()> {
    let storage = MemoryStorage::new();
    let spec = AudioStreamSpec::mono_16bit(16000)?;
    let mut source = ToneSource::new(spec, 440.0);

    let recorder = Recorder::new(&storage, frames_config(1000));
    let metadata = recorder.record(&mut source, "record_1.wav")?;

    // 1000 frames * 2 bytes, read in 512-byte blocks
    assert_eq!(metadata.data_bytes, 2000);
    assert_eq!(metadata.blocks, 4);
    assert_eq!(metadata.file_len(), 2044);

    let bytes = storage.contents("record_1.wav").expect("recording exists");
    assert_eq!(bytes.len(), 2044);

    let header = WavHeader::parse(&bytes)?;
    assert_eq!(header.data_size, 2000);
    assert_eq!(header.file_size, 2036);
    assert_eq!(header.sample_rate, 16000);
    assert_eq!(header.bits_per_sample, 16);

    Ok(())
}

#[test]
fn test_recording_is_readable_by_hound() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let storage = LocalStorage::mount(temp_dir.path())?;
    let spec = AudioStreamSpec::mono_16bit(16000)?;
    let mut source = ToneSource::new(spec, 1000.0);

    let recorder = Recorder::new(&storage, frames_config(1600));
    recorder.record(&mut source, "tone.wav")?;

    let reader = hound::WavReader::open(temp_dir.path().join("tone.wav"))?;
    assert_eq!(reader.spec().sample_rate, 16000);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.spec().bits_per_sample, 16);
    assert_eq!(reader.len(), 1600);

    let samples: Vec<i16> = reader.into_samples::<i16>().collect::<Result<_, _>>()?;
    let peak = samples.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
    assert!(peak > 10000, "tone should reach about half scale, got {}", peak);

    Ok(())
}

#[test]
fn test_zero_duration_produces_empty_finalized_file() -> Result<()> {
    let storage = MemoryStorage::new();
    let spec = AudioStreamSpec::mono_16bit(16000)?;
    let mut source = ToneSource::new(spec, 440.0);

    let config = RecorderConfig {
        limit: CaptureLimit::Duration(Duration::ZERO),
        ..RecorderConfig::default()
    };
    let metadata = Recorder::new(&storage, config).record(&mut source, "empty.wav")?;

    assert_eq!(metadata.data_bytes, 0);
    assert_eq!(metadata.blocks, 0);

    let bytes = storage.contents("empty.wav").expect("recording exists");
    assert_eq!(bytes.len(), HEADER_LEN);
    let header = WavHeader::parse(&bytes)?;
    assert_eq!(header.file_size, 36);
    assert_eq!(header.data_size, 0);

    Ok(())
}

#[test]
fn test_shift_conversion_narrows_32bit_source() -> Result<()> {
    let storage = MemoryStorage::new();
    let wide = AudioStreamSpec::new(16000, 32, 1)?;
    let narrow = AudioStreamSpec::mono_16bit(16000)?;

    let config = RecorderConfig {
        conversion: SampleConversion::shift32_to16(),
        ..frames_config(300)
    };
    let metadata =
        Recorder::new(&storage, config).record(&mut ToneSource::new(wide, 440.0), "wide.wav")?;
    Recorder::new(&storage, frames_config(300))
        .record(&mut ToneSource::new(narrow, 440.0), "narrow.wav")?;

    assert_eq!(metadata.spec, narrow);
    assert_eq!(metadata.data_bytes, 600);

    let wide_bytes = storage.contents("wide.wav").expect("recording exists");
    let narrow_bytes = storage.contents("narrow.wav").expect("recording exists");
    let header = WavHeader::parse(&wide_bytes)?;
    assert_eq!(header.bits_per_sample, 16);
    assert_eq!(header.byte_rate, 32000);

    // Shifting the left-justified 32-bit words recovers the 16-bit samples
    assert_eq!(wide_bytes, narrow_bytes);

    Ok(())
}

#[test]
fn test_shift_conversion_requires_32bit_source() -> Result<()> {
    let storage = MemoryStorage::new();
    let spec = AudioStreamSpec::mono_16bit(16000)?;
    let config = RecorderConfig {
        conversion: SampleConversion::shift32_to16(),
        ..frames_config(10)
    };

    let result = Recorder::new(&storage, config).record(&mut ToneSource::new(spec, 440.0), "x.wav");

    assert!(matches!(result, Err(RecordError::Spec(_))));
    assert!(!storage.exists("x.wav"), "no file before the spec is accepted");

    Ok(())
}

#[test]
fn test_peripheral_failure_leaves_placeholder_header() -> Result<()> {
    let storage = MemoryStorage::new();
    let mut source = FlakySource {
        spec: AudioStreamSpec::mono_16bit(16000)?,
        reads_left: 2,
    };

    let result = Recorder::new(&storage, frames_config(16000)).record(&mut source, "cut.wav");

    assert!(matches!(
        result,
        Err(RecordError::Peripheral(PeripheralError::Read { code: -1 }))
    ));

    // Two blocks landed after the zeroed header, which was never patched
    let bytes = storage.contents("cut.wav").expect("partial file exists");
    assert_eq!(bytes.len(), HEADER_LEN + 2 * 512);
    assert!(bytes[..HEADER_LEN].iter().all(|&b| b == 0));
    assert!(WavHeader::parse(&bytes).is_err());

    Ok(())
}

#[test]
fn test_storage_failure_is_reported() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let storage = LocalStorage::mount(temp_dir.path())?;
    let spec = AudioStreamSpec::mono_16bit(16000)?;

    let result = Recorder::new(&storage, frames_config(10))
        .record(&mut ToneSource::new(spec, 440.0), "no/such/dir/x.wav");

    assert!(matches!(result, Err(RecordError::Storage(_))));

    Ok(())
}

#[test]
fn test_writer_finalize_is_idempotent() -> Result<()> {
    let storage = MemoryStorage::new();
    let spec = AudioStreamSpec::mono_16bit(16000)?;

    let mut writer = WavWriter::create(&storage, "w.wav", spec)?;
    writer.append_block(&[1, 2, 3, 4])?;

    let first = writer.finalize()?;
    let after_first = storage.contents("w.wav").expect("file exists");
    let second = writer.finalize()?;
    let after_second = storage.contents("w.wav").expect("file exists");

    assert_eq!(first, second);
    assert_eq!(after_first, after_second);
    assert_eq!(after_first.len(), HEADER_LEN + 4);

    Ok(())
}

#[test]
fn test_writer_appends_after_finalize() -> Result<()> {
    let storage = MemoryStorage::new();
    let spec = AudioStreamSpec::mono_16bit(16000)?;

    let mut writer = WavWriter::create(&storage, "w.wav", spec)?;
    writer.append_block(&[1, 2])?;
    writer.finalize()?;
    writer.append_block(&[3, 4])?;
    let header = writer.finalize()?;
    assert_eq!(writer.close()?, 4);

    assert_eq!(header.data_size, 4);
    let bytes = storage.contents("w.wav").expect("file exists");
    assert_eq!(&bytes[HEADER_LEN..], &[1, 2, 3, 4]);

    Ok(())
}

#[test]
fn test_writer_dropped_without_finalize_keeps_placeholder() -> Result<()> {
    let storage = MemoryStorage::new();
    let spec = AudioStreamSpec::mono_16bit(16000)?;

    {
        let mut writer = WavWriter::create(&storage, "w.wav", spec)?;
        writer.append_block(&[9; 32])?;
    }

    let bytes = storage.contents("w.wav").expect("file exists");
    assert_eq!(bytes.len(), HEADER_LEN + 32);
    assert!(bytes[..HEADER_LEN].iter().all(|&b| b == 0));

    Ok(())
}

#[test]
fn test_wav_file_source_wraps_around() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("input.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    for sample in [1i16, 2, 3] {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    let mut source = WavFileSource::open(&path)?;
    assert_eq!(source.spec(), AudioStreamSpec::mono_16bit(8000)?);

    let mut buf = [0u8; 10];
    let n = source.read_block(&mut buf, Duration::from_secs(1))?;
    assert_eq!(n, 10);

    let samples: Vec<i16> = buf
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();
    assert_eq!(samples, vec![1, 2, 3, 1, 2]);

    Ok(())
}

#[test]
fn test_wav_file_source_rejects_non_16bit() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("wide.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    writer.write_sample(1i32)?;
    writer.finalize()?;

    let result = WavFileSource::open(&path);
    assert!(matches!(result, Err(PeripheralError::Decode(_))));

    Ok(())
}

#[test]
fn test_discard_removes_partial_recording() -> Result<()> {
    let storage = MemoryStorage::new();
    let mut source = FlakySource {
        spec: AudioStreamSpec::mono_16bit(16000)?,
        reads_left: 1,
    };

    let result =
        Recorder::new(&storage, frames_config(16000)).record_or_discard(&mut source, "cut.wav");

    assert!(matches!(result, Err(RecordError::Peripheral(_))));
    assert!(!storage.exists("cut.wav"));

    Ok(())
}

#[test]
fn test_discard_keeps_existing_file_on_bad_conversion() -> Result<()> {
    let storage = MemoryStorage::new();
    let previous = vec![7u8; HEADER_LEN + 8];
    storage.insert("fixed.wav", previous.clone());

    // A 16-bit source cannot be narrowed, so nothing is ever written
    let spec = AudioStreamSpec::mono_16bit(16000)?;
    let config = RecorderConfig {
        conversion: SampleConversion::shift32_to16(),
        ..frames_config(10)
    };
    let result = Recorder::new(&storage, config)
        .record_or_discard(&mut ToneSource::new(spec, 440.0), "fixed.wav");

    assert!(matches!(result, Err(RecordError::Spec(_))));
    assert_eq!(storage.contents("fixed.wav"), Some(previous));

    Ok(())
}

#[test]
fn test_discard_keeps_successful_recording() -> Result<()> {
    let storage = MemoryStorage::new();
    let spec = AudioStreamSpec::mono_16bit(16000)?;

    let metadata = Recorder::new(&storage, frames_config(100))
        .record_or_discard(&mut ToneSource::new(spec, 440.0), "ok.wav")?;

    assert_eq!(metadata.data_bytes, 200);
    assert!(storage.exists("ok.wav"));

    Ok(())
}
