use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use wav_courier::audio::{AudioSource, Recorder, RecordingMetadata, ToneSource, WavFileSource};
use wav_courier::storage::{latest_recording, next_recording_name};
use wav_courier::{
    enter_low_power, http, AppState, ChunkStreamer, Config, HaltReason, LocalStorage, NatsLink,
    Notifier, NotifyLink, RecordError, Storage, TransferOutcome, WavHeader,
};

#[derive(Parser)]
#[command(name = "wav-courier", version, about = "Record a WAV file and hand it to one client")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(long, default_value = "config/wav-courier")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record one file and exit
    Record {
        /// Replay this WAV file instead of the configured source
        #[arg(long)]
        wav: Option<PathBuf>,
    },
    /// Record, then serve the file over HTTP until the client confirms
    ServeHttp {
        /// Serve the latest existing recording
        #[arg(long)]
        skip_record: bool,
    },
    /// Record, then stream the file over the NATS notify link
    ServeNats {
        /// Stream the latest existing recording
        #[arg(long)]
        skip_record: bool,
    },
    /// Print the header of a recording
    Inspect { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("WAV Courier v{}", env!("CARGO_PKG_VERSION"));
    info!("Device: {}", cfg.device.name);

    match cli.command {
        Command::Record { wav } => {
            let storage = mount(&cfg)?;
            match record(&cfg, storage, wav).await? {
                Ok(metadata) => println!("{}", serde_json::to_string_pretty(&metadata)?),
                Err(reason) => enter_low_power(reason),
            }
        }
        Command::ServeHttp { skip_record } => serve_http(&cfg, skip_record).await?,
        Command::ServeNats { skip_record } => serve_nats(&cfg, skip_record).await?,
        Command::Inspect { file } => {
            let mut reader = std::fs::File::open(&file)
                .with_context(|| format!("Failed to open {}", file.display()))?;
            let header = WavHeader::read_from(&mut reader)
                .with_context(|| format!("Failed to read header of {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&header)?);
            println!("Duration: {:.2}s", header.duration_secs());
        }
    }

    Ok(())
}

fn mount(cfg: &Config) -> Result<LocalStorage> {
    match LocalStorage::mount_with_retry(
        &cfg.storage.root,
        cfg.storage.mount_attempts,
        Duration::from_millis(cfg.storage.mount_retry_ms),
    ) {
        Ok(storage) => Ok(storage),
        Err(e) => {
            error!("Storage mount failed: {}", e);
            enter_low_power(HaltReason::StorageFailure);
            Err(e.into())
        }
    }
}

/// Run one recording session on a blocking thread.
///
/// The outer error is a configuration problem; the inner one is the halt
/// reason for a failed session.
async fn record(
    cfg: &Config,
    storage: LocalStorage,
    wav: Option<PathBuf>,
) -> Result<Result<RecordingMetadata, HaltReason>> {
    let audio = cfg.audio.clone();
    let file_name = cfg.storage.file_name.clone();

    let result = tokio::task::spawn_blocking(move || {
        let path = file_name.unwrap_or_else(|| next_recording_name(&storage));

        let mut source: Box<dyn AudioSource> = match wav.or_else(|| {
            (audio.source.kind == "wav")
                .then(|| audio.source.path.clone().map(PathBuf::from))
                .flatten()
        }) {
            Some(file) => match WavFileSource::open(&file) {
                Ok(source) => Box::new(source.realtime(audio.source.realtime)),
                Err(e) => return (path, Err(RecordError::from(e))),
            },
            None => match audio.source_spec() {
                Ok(spec) => Box::new(
                    ToneSource::new(spec, audio.source.tone_hz).realtime(audio.source.realtime),
                ),
                Err(e) => return (path, Err(RecordError::from(e))),
            },
        };

        let recorder = Recorder::new(&storage, audio.recorder_config());
        let result = recorder.record_or_discard(source.as_mut(), &path);

        (path, result)
    })
    .await
    .context("Recording task panicked")?;

    match result {
        (_, Ok(metadata)) => Ok(Ok(metadata)),
        (path, Err(RecordError::Peripheral(e))) => {
            error!("Recording {} failed: {}", path, e);
            Ok(Err(HaltReason::PeripheralFailure))
        }
        (path, Err(RecordError::Storage(e))) => {
            error!("Recording {} failed: {}", path, e);
            Ok(Err(HaltReason::StorageFailure))
        }
        (_, Err(RecordError::Spec(e))) => Err(e).context("Invalid audio configuration"),
    }
}

/// Recording to transfer: a fresh one, or the latest on storage
async fn recording_for_transfer(
    cfg: &Config,
    storage: &LocalStorage,
    skip_record: bool,
) -> Result<Result<Option<String>, HaltReason>> {
    if skip_record {
        let latest = latest_recording(storage)?;
        if latest.is_none() {
            warn!("No recording found in {}", storage.root().display());
        }
        return Ok(Ok(latest));
    }

    Ok(record(cfg, storage.clone(), None)
        .await?
        .map(|metadata| Some(metadata.path)))
}

async fn serve_http(cfg: &Config, skip_record: bool) -> Result<()> {
    let storage = mount(cfg)?;
    let recording = match recording_for_transfer(cfg, &storage, skip_record).await? {
        Ok(recording) => recording,
        Err(reason) => {
            enter_low_power(reason);
            return Ok(());
        }
    };

    let mut state = AppState::new(Arc::new(storage), cfg.http.transfer_chunk_size);
    if let Some(path) = recording {
        state = state.with_recording(path);
    }

    let addr = format!("{}:{}", cfg.http.bind, cfg.http.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Open http://{}/download to fetch the recording", addr);

    let reason = http::serve(listener, state, cfg.http.confirmation_timeout()).await?;
    enter_low_power(reason);

    Ok(())
}

async fn serve_nats(cfg: &Config, skip_record: bool) -> Result<()> {
    let storage = mount(cfg)?;
    let path = match recording_for_transfer(cfg, &storage, skip_record).await? {
        Ok(Some(path)) => path,
        Ok(None) => {
            enter_low_power(HaltReason::StorageFailure);
            return Ok(());
        }
        Err(reason) => {
            enter_low_power(reason);
            return Ok(());
        }
    };

    let link = NatsLink::connect(
        &cfg.nats.url,
        &cfg.nats.subject_prefix,
        cfg.device.name.clone(),
    )
    .await?;
    let mut events = link.subscribe_link_events().await?;
    let mut notifier = link.notifier();
    notifier.advertise().await?;

    let storage: Arc<dyn Storage> = Arc::new(storage);
    let streamer = ChunkStreamer::new(storage, path, cfg.transfer.streamer_config());
    let mut notify = NotifyLink::new(notifier, streamer, cfg.transfer.link_timing());

    let reason = match notify.run(&mut events).await {
        Ok(TransferOutcome::Completed(stats)) => {
            info!("Sent {} bytes to the client", stats.bytes_sent);
            HaltReason::TransferComplete
        }
        Ok(TransferOutcome::TimedOut(timeout)) => {
            warn!("Transfer stopped: {}", timeout);
            HaltReason::TransferTimeout
        }
        Ok(TransferOutcome::LinkClosed) => HaltReason::LinkClosed,
        Err(e) => {
            error!("Transfer failed: {}", e);
            HaltReason::StorageFailure
        }
    };
    enter_low_power(reason);

    Ok(())
}
