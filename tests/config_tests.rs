use anyhow::Result;
use std::time::Duration;
use tempfile::TempDir;
use wav_courier::audio::{CaptureLimit, SampleConversion};
use wav_courier::transfer::Framing;
use wav_courier::Config;

#[test]
fn test_defaults_without_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let cfg = Config::load(&temp_dir.path().join("absent").display().to_string())?;

    assert_eq!(cfg.audio.sample_rate, 16000);
    assert_eq!(cfg.audio.bits_per_sample, 16);
    assert_eq!(cfg.audio.conversion, SampleConversion::Passthrough);
    assert_eq!(cfg.transfer.chunk_size, 512);
    assert_eq!(cfg.transfer.framing, Framing::Raw);
    assert_eq!(cfg.http.transfer_chunk_size, 16384);
    assert_eq!(cfg.http.confirmation_timeout(), Duration::from_secs(300));

    let timing = cfg.transfer.link_timing();
    assert_eq!(timing.settle_delay, Duration::from_secs(5));
    assert_eq!(timing.pacing, Duration::from_millis(100));
    assert_eq!(timing.session_timeout, None);

    Ok(())
}

#[test]
fn test_load_toml_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("device.toml");
    std::fs::write(
        &path,
        r#"
[device]
name = "mic-7"

[audio]
bits_per_sample = 32
frames = 4800

[audio.conversion]
kind = "shift32_to16"

[transfer]
framing = "json"
session_timeout_secs = 120

[http]
port = 8081
"#,
    )?;

    let cfg = Config::load(&path.display().to_string())?;

    assert_eq!(cfg.device.name, "mic-7");
    assert_eq!(cfg.audio.capture_limit(), CaptureLimit::Frames(4800));
    assert_eq!(cfg.audio.conversion, SampleConversion::shift32_to16());
    assert_eq!(cfg.transfer.framing, Framing::Json);
    assert_eq!(
        cfg.transfer.link_timing().session_timeout,
        Some(Duration::from_secs(120))
    );
    assert_eq!(cfg.http.port, 8081);
    // Untouched keys keep their defaults
    assert_eq!(cfg.audio.sample_rate, 16000);
    assert_eq!(cfg.storage.root, "recordings");

    let spec = cfg.audio.source_spec()?;
    let output = cfg.audio.conversion.output_spec(spec)?;
    assert_eq!(output.bits_per_sample(), 16);

    Ok(())
}

#[test]
fn test_invalid_source_spec_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("bad.toml");
    std::fs::write(&path, "[audio]\nbits_per_sample = 24\n")?;

    let cfg = Config::load(&path.display().to_string())?;
    assert!(cfg.audio.source_spec().is_err());

    Ok(())
}

#[test]
fn test_oversized_frame_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("wide.toml");
    std::fs::write(&path, "[audio]\nbits_per_sample = 32\nchannels = 20000\n")?;

    let cfg = Config::load(&path.display().to_string())?;
    assert!(cfg.audio.source_spec().is_err());

    Ok(())
}
