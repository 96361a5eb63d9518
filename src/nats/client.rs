use super::messages::{Advertisement, CONNECT_PAYLOAD, DISCONNECT_PAYLOAD};
use crate::error::TransportError;
use crate::transfer::{LinkEvent, Notifier};
use anyhow::{Context, Result};
use async_nats::Client;
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// NATS subjects for one device
#[derive(Debug, Clone)]
pub struct Subjects {
    pub data: String,
    pub link: String,
    pub advertise: String,
}

impl Subjects {
    pub fn new(prefix: &str, device: &str) -> Self {
        Self {
            data: format!("{}.{}.data", prefix, device),
            link: format!("{}.{}.link", prefix, device),
            advertise: format!("{}.{}.advertise", prefix, device),
        }
    }
}

/// Notify transport over NATS
pub struct NatsLink {
    client: Client,
    device: String,
    subjects: Subjects,
}

impl NatsLink {
    /// Connect to NATS server
    pub async fn connect(url: &str, prefix: &str, device: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        let subjects = Subjects::new(prefix, &device);
        Ok(Self {
            client,
            device,
            subjects,
        })
    }

    pub fn subjects(&self) -> &Subjects {
        &self.subjects
    }

    /// Subscribe to client connect/disconnect messages
    pub async fn subscribe_link_events(&self) -> Result<mpsc::Receiver<LinkEvent>> {
        let subject = self.subjects.link.clone();
        info!("Subscribing to link events on {}", subject);

        let mut subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .context("Failed to subscribe to link events")?;

        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                let event = match parse_link_event(&msg.payload) {
                    Some(event) => event,
                    None => {
                        warn!("Ignoring unknown link payload on {}", subject);
                        continue;
                    }
                };

                debug!("Link event: {:?}", event);
                if let Err(e) = tx.send(event).await {
                    error!("Failed to forward link event: {}", e);
                    break;
                }
            }
        });

        Ok(rx)
    }

    pub fn notifier(&self) -> NatsNotifier {
        NatsNotifier {
            client: self.client.clone(),
            device: self.device.clone(),
            subjects: self.subjects.clone(),
        }
    }
}

/// Map a link subject payload to an event
pub fn parse_link_event(payload: &[u8]) -> Option<LinkEvent> {
    match payload {
        CONNECT_PAYLOAD => Some(LinkEvent::Connected),
        DISCONNECT_PAYLOAD => Some(LinkEvent::Disconnected),
        _ => None,
    }
}

/// Publishes chunks on the data subject
pub struct NatsNotifier {
    client: Client,
    device: String,
    subjects: Subjects,
}

#[async_trait::async_trait]
impl Notifier for NatsNotifier {
    async fn notify(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        self.client
            .publish(self.subjects.data.clone(), payload.to_vec().into())
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn advertise(&mut self) -> Result<(), TransportError> {
        let message = Advertisement {
            device: self.device.clone(),
            data_subject: self.subjects.data.clone(),
            link_subject: self.subjects.link.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let payload =
            serde_json::to_vec(&message).map_err(|e| TransportError::Send(e.to_string()))?;

        self.client
            .publish(self.subjects.advertise.clone(), payload.into())
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;

        info!("Advertised {} on {}", self.device, self.subjects.advertise);

        Ok(())
    }

    fn name(&self) -> &str {
        "nats"
    }
}
