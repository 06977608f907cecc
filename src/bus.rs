//! Shared MQTT subscription plumbing for the collector and dashboard.
//!
//! Lifecycle: Connecting -> Subscribed. Any connection error before the
//! broker's first successful CONNACK is unrecoverable and surfaces as a
//! [`ConnectError`]; after that, errors are logged and polling continues
//! (no reconnect/backoff policy of our own — a stalled link degrades
//! silently and the dashboard falls back to last-known values).

use std::time::Duration;

use log::{debug, info, warn};
use rumqttc::{AsyncClient, ConnAck, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};

use crate::decode::decode;
use crate::error::ConnectError;
use crate::models::Reading;
use crate::settings::Settings;

const KEEP_ALIVE_SECS: u64 = 60;
const ERROR_POLL_BACKOFF_SECS: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Connecting,
    Subscribed,
}

pub struct BusSubscriber {
    client: AsyncClient,
    event_loop: EventLoop,
    topic: String,
    state: LinkState,
}

impl BusSubscriber {
    /// Set up the client. The actual connect happens on the first poll
    /// inside [`next_reading`](Self::next_reading).
    pub fn connect(settings: &Settings, client_id: &str) -> Self {
        let mut options =
            MqttOptions::new(client_id, &settings.broker_host, settings.broker_port);
        options.set_keep_alive(Duration::from_secs(KEEP_ALIVE_SECS));

        let (client, event_loop) = AsyncClient::new(options, 64);
        info!(
            "Connecting to MQTT broker at {}:{}",
            settings.broker_host, settings.broker_port
        );

        Self {
            client,
            event_loop,
            topic: settings.subscribe_topic.clone(),
            state: LinkState::Connecting,
        }
    }

    /// Drive the connection until the next decodable sensor message.
    ///
    /// Messages that fail to decode are logged and skipped; the pipeline
    /// must not stall on a bad payload. Re-issues the wildcard
    /// subscription on every CONNACK so a broker-side reconnect picks the
    /// topic back up.
    pub async fn next_reading(&mut self) -> Result<Reading, ConnectError> {
        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => self.on_connack(ack).await?,
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    match decode(&publish.topic, &publish.payload) {
                        Ok(reading) => {
                            debug!(
                                "Received message: {} = {}",
                                reading.sensor_kind, reading.value
                            );
                            return Ok(reading);
                        }
                        Err(err) => {
                            warn!("Dropping message on '{}': {err}", publish.topic);
                        }
                    }
                }
                Ok(_) => {}
                Err(err) => match self.state {
                    LinkState::Connecting => return Err(ConnectError::Transport(err)),
                    LinkState::Subscribed => {
                        warn!("MQTT connection error: {err}");
                        tokio::time::sleep(Duration::from_secs(ERROR_POLL_BACKOFF_SECS)).await;
                    }
                },
            }
        }
    }

    async fn on_connack(&mut self, ack: ConnAck) -> Result<(), ConnectError> {
        if ack.code != ConnectReturnCode::Success {
            return Err(ConnectError::Rejected(ack.code));
        }

        info!("Connected to MQTT broker; subscribing to {}", self.topic);
        self.client
            .subscribe(self.topic.clone(), QoS::AtMostOnce)
            .await?;
        self.state = LinkState::Subscribed;
        Ok(())
    }

    /// Shutdown disconnect. Called unconditionally, including on error
    /// paths; a failure here is only worth a warning.
    pub async fn disconnect(&mut self) {
        if let Err(err) = self.client.disconnect().await {
            warn!("MQTT disconnect failed: {err}");
        }
    }
}
