// Integration tests for the notify transfer loop
//
// These run on a paused tokio clock, so settle delays and pacing are
// checked against virtual time without slowing the suite down.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use wav_courier::error::{ProtocolTimeout, TransportError};
use wav_courier::storage::{MemoryStorage, Storage};
use wav_courier::transfer::{
    ChannelNotifier, ChunkStreamer, ConnectionMonitor, LinkEdge, LinkEvent, LinkTiming, Notifier,
    NotifyLink, StreamerConfig, TransferOutcome, TransferState, END_OF_FILE_MARKER,
};

const FILE_LEN: usize = 2044;

/// Notifier that keeps every payload with its send time
#[derive(Default)]
struct RecordingNotifier {
    sent: Vec<(Instant, Vec<u8>)>,
    advertisements: u32,
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        self.sent.push((Instant::now(), payload.to_vec()));
        Ok(())
    }

    async fn advertise(&mut self) -> Result<(), TransportError> {
        self.advertisements += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn file_bytes() -> Vec<u8> {
    (0..FILE_LEN).map(|i| (i % 253) as u8).collect()
}

fn streamer() -> ChunkStreamer {
    let storage = MemoryStorage::new();
    storage.insert("record_1.wav", file_bytes());
    let storage: Arc<dyn Storage> = Arc::new(storage);
    ChunkStreamer::new(storage, "record_1.wav", StreamerConfig::default())
}

/// Expected payloads for one complete transfer
fn full_transfer() -> Vec<Vec<u8>> {
    let mut payloads: Vec<Vec<u8>> = file_bytes().chunks(512).map(<[u8]>::to_vec).collect();
    payloads.push(END_OF_FILE_MARKER.to_vec());
    payloads
}

#[tokio::test(start_paused = true)]
async fn test_transfer_waits_for_settle_then_paces() -> Result<()> {
    let (tx, mut rx) = mpsc::channel(8);
    tx.send(LinkEvent::Connected).await?;

    let timing = LinkTiming::default();
    let mut link = NotifyLink::new(RecordingNotifier::default(), streamer(), timing);

    let start = Instant::now();
    let outcome = link.run(&mut rx).await?;

    let stats = match outcome {
        TransferOutcome::Completed(stats) => stats,
        other => panic!("expected completion, got {:?}", other),
    };
    assert_eq!(stats.bytes_sent, FILE_LEN as u64);
    assert_eq!(stats.chunks_sent, 4);
    assert_eq!(stats.state, TransferState::Completed);
    assert_eq!(link.state(), TransferState::Idle);

    let notifier = link.into_notifier();
    let payloads: Vec<Vec<u8>> = notifier.sent.iter().map(|(_, p)| p.clone()).collect();
    assert_eq!(payloads, full_transfer());

    // Nothing goes out before the settle delay
    let first_send = notifier.sent[0].0;
    assert!(first_send - start >= timing.settle_delay);

    // Consecutive sends respect the pacing interval
    for pair in notifier.sent.windows(2) {
        assert!(pair[1].0 - pair[0].0 >= timing.pacing);
    }

    drop(tx);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_restarts_from_offset_zero() -> Result<()> {
    let (tx, mut rx) = mpsc::channel(8);
    tx.send(LinkEvent::Connected).await?;

    // Drop the client after a few chunks, then come back
    let driver = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5250)).await;
        tx.send(LinkEvent::Disconnected).await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(LinkEvent::Connected).await?;
        Ok::<_, mpsc::error::SendError<LinkEvent>>(tx)
    });

    let mut link = NotifyLink::new(RecordingNotifier::default(), streamer(), LinkTiming::default());
    let outcome = link.run(&mut rx).await?;
    let _tx = driver.await??;

    assert!(matches!(outcome, TransferOutcome::Completed(_)));

    let notifier = link.into_notifier();
    let payloads: Vec<Vec<u8>> = notifier.sent.into_iter().map(|(_, p)| p).collect();
    let expected = full_transfer();

    // An aborted prefix without a marker, then the whole file again
    assert!(payloads.len() > expected.len());
    let (aborted, resent) = payloads.split_at(payloads.len() - expected.len());
    assert_eq!(resent, expected.as_slice());
    assert!(!aborted.is_empty());
    assert_eq!(aborted[0], expected[0]);
    assert!(aborted.iter().all(|p| p.as_slice() != END_OF_FILE_MARKER));

    assert_eq!(notifier.advertisements, 1, "advertising restarts once per disconnect");

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_connect_is_ignored() -> Result<()> {
    let (tx, mut rx) = mpsc::channel(8);
    tx.send(LinkEvent::Connected).await?;
    tx.send(LinkEvent::Connected).await?;

    let mut link = NotifyLink::new(RecordingNotifier::default(), streamer(), LinkTiming::default());
    let outcome = link.run(&mut rx).await?;

    assert!(matches!(outcome, TransferOutcome::Completed(_)));
    let notifier = link.into_notifier();
    assert_eq!(notifier.sent.len(), full_transfer().len());
    assert_eq!(notifier.advertisements, 0);

    drop(tx);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_timeout_without_client() -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<LinkEvent>(8);

    let timing = LinkTiming {
        session_timeout: Some(Duration::from_secs(30)),
        ..LinkTiming::default()
    };
    let mut link = NotifyLink::new(RecordingNotifier::default(), streamer(), timing);
    let outcome = link.run(&mut rx).await?;

    match outcome {
        TransferOutcome::TimedOut(ProtocolTimeout::NoClient { waited }) => {
            assert!(waited >= Duration::from_secs(30));
        }
        other => panic!("expected a no-client timeout, got {:?}", other),
    }
    assert!(link.into_notifier().sent.is_empty());

    drop(tx);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_timeout_during_settle() -> Result<()> {
    let (tx, mut rx) = mpsc::channel(8);
    tx.send(LinkEvent::Connected).await?;

    let timing = LinkTiming {
        session_timeout: Some(Duration::from_secs(3)),
        ..LinkTiming::default()
    };
    let mut link = NotifyLink::new(RecordingNotifier::default(), streamer(), timing);
    let outcome = link.run(&mut rx).await?;

    assert!(matches!(
        outcome,
        TransferOutcome::TimedOut(ProtocolTimeout::Transfer { .. })
    ));
    assert!(link.into_notifier().sent.is_empty());

    drop(tx);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_closed_event_channel_ends_loop() -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<LinkEvent>(8);
    drop(tx);

    let mut link = NotifyLink::new(RecordingNotifier::default(), streamer(), LinkTiming::default());
    let outcome = link.run(&mut rx).await?;

    assert!(matches!(outcome, TransferOutcome::LinkClosed));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_send_failures_do_not_stop_transfer() -> Result<()> {
    let (notifier, messages) = ChannelNotifier::new();
    // Every notify now fails; delivery is not acknowledged anyway
    drop(messages);

    let (tx, mut rx) = mpsc::channel(8);
    tx.send(LinkEvent::Connected).await?;

    let mut link = NotifyLink::new(notifier, streamer(), LinkTiming::default());
    let outcome = link.run(&mut rx).await?;

    match outcome {
        TransferOutcome::Completed(stats) => assert_eq!(stats.bytes_sent, FILE_LEN as u64),
        other => panic!("expected completion, got {:?}", other),
    }

    drop(tx);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_channel_notifier_forwards_payloads() -> Result<()> {
    let (notifier, mut messages) = ChannelNotifier::new();
    let (tx, mut rx) = mpsc::channel(8);
    tx.send(LinkEvent::Connected).await?;

    let mut link = NotifyLink::new(notifier, streamer(), LinkTiming::default());
    link.run(&mut rx).await?;

    let mut received = Vec::new();
    while let Ok(payload) = messages.try_recv() {
        received.push(payload);
    }
    assert_eq!(received, full_transfer());
    assert_eq!(link.notifier().advertisements(), 0);

    drop(tx);
    Ok(())
}

#[test]
fn test_monitor_reports_edges_only() {
    let mut monitor = ConnectionMonitor::new();

    assert_eq!(monitor.observe(false), None);
    assert_eq!(monitor.observe(true), Some(LinkEdge::Connected));
    assert_eq!(monitor.observe(true), None);
    assert!(monitor.is_connected());
    assert_eq!(monitor.observe(false), Some(LinkEdge::Disconnected));
    assert_eq!(monitor.observe(false), None);
    assert_eq!(monitor.observe(true), Some(LinkEdge::Connected));
    assert_eq!(monitor.connects(), 2);
}
