// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 robotat.dev

//! MQTT broker client and connection supervisor.
//!
//! One live connection per process, application-lifetime. The supervisor
//! task owns the rumqttc event loop: on every successful (re)connect it
//! resubscribes the full fixed topic set before the client is considered
//! ready, and every inbound publish is recorded in the topic registry and
//! forwarded into the hub's bounded ingest channel. Outbound publishes are
//! best-effort at QoS 0; there is no outbox and no retry queue.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet as Frame, QoS};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::topics::TopicRegistry;

/// Delay before re-polling the event loop after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Capacity of rumqttc's internal request queue.
const REQUEST_QUEUE_CAPACITY: usize = 64;

/// Broker client errors.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("not connected to broker")]
    NotConnected,

    #[error("MQTT client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Connection lifecycle. Transitions: Connecting → Connected, and back to
/// Disconnected on any transport failure; rumqttc retries on the next poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            2 => Self::Connected,
            1 => Self::Connecting,
            _ => Self::Disconnected,
        }
    }
}

/// A message received from the broker, prior to decoding.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Handle to the broker connection: outbound publishes and state queries.
pub struct BrokerClient {
    client: AsyncClient,
    state: Arc<AtomicU8>,
    command_topic: String,
    qos: QoS,
}

impl BrokerClient {
    /// Build the client, its supervisor, and the ingest channel.
    ///
    /// Nothing touches the network until the supervisor is spawned; the
    /// returned receiver yields every message the broker delivers.
    pub fn new(
        config: &BridgeConfig,
        registry: Arc<TopicRegistry>,
    ) -> (Arc<Self>, BrokerSupervisor, mpsc::Receiver<InboundMessage>) {
        let mut options = MqttOptions::new(
            config.broker.client_id.clone(),
            config.broker.host.clone(),
            config.broker.port,
        );
        options.set_keep_alive(Duration::from_secs(config.broker.keepalive_secs));

        let (client, event_loop) = AsyncClient::new(options, REQUEST_QUEUE_CAPACITY);
        let (ingest_tx, ingest_rx) = mpsc::channel(config.channels.ingest_capacity);
        let state = Arc::new(AtomicU8::new(ConnectionState::Connecting as u8));

        let qos = mqtt_qos(config.topics.qos);
        let broker = Arc::new(Self {
            client: client.clone(),
            state: Arc::clone(&state),
            command_topic: config.topics.command.clone(),
            qos,
        });

        let supervisor = BrokerSupervisor {
            client,
            event_loop,
            state,
            registry,
            ingest_tx,
            subscriptions: config
                .subscriptions()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            qos,
        };

        (broker, supervisor, ingest_rx)
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Relaxed))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Best-effort publish of a raw payload.
    ///
    /// Fails with a logged error when the connection is down; no queueing,
    /// no retry. Safe to call concurrently from any task.
    pub fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
        if !self.is_connected() {
            error!("cannot publish to '{}': not connected to broker", topic);
            return Err(BrokerError::NotConnected);
        }
        self.client.try_publish(topic, self.qos, false, payload)?;
        Ok(())
    }

    /// Publish a command packet (compact JSON) on the fixed command topic.
    pub fn publish_command(&self, packet: &Value) -> Result<(), BrokerError> {
        let payload = serde_json::to_string(packet)?;
        self.publish(&self.command_topic, payload.as_bytes().to_vec())?;
        info!("command published on '{}': {}", self.command_topic, payload);
        Ok(())
    }

    pub fn command_topic(&self) -> &str {
        &self.command_topic
    }
}

/// Owns the event loop; runs for the lifetime of the process.
pub struct BrokerSupervisor {
    client: AsyncClient,
    event_loop: EventLoop,
    state: Arc<AtomicU8>,
    registry: Arc<TopicRegistry>,
    ingest_tx: mpsc::Sender<InboundMessage>,
    subscriptions: Vec<String>,
    qos: QoS,
}

impl BrokerSupervisor {
    /// Drive the connection until the process exits.
    pub async fn run(mut self) {
        info!(
            "broker supervisor started, subscriptions: {:?}",
            self.subscriptions
        );

        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Frame::ConnAck(_))) => {
                    info!("connected to broker, resubscribing");
                    Self::resubscribe(self.client.clone(), &self.subscriptions, self.qos).await;
                    self.state
                        .store(ConnectionState::Connected as u8, Ordering::Relaxed);
                }
                Ok(Event::Incoming(Frame::Publish(publish))) => {
                    // Record the topic unconditionally, even if the fan-out
                    // later drops the message.
                    self.registry.record(&publish.topic);

                    let message = InboundMessage {
                        topic: publish.topic.clone(),
                        payload: publish.payload.to_vec(),
                    };
                    match self.ingest_tx.try_send(message) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            warn!("ingest channel full, dropping message on '{}'", publish.topic);
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            warn!("ingest channel closed, broker supervisor exiting");
                            return;
                        }
                    }
                }
                Ok(event) => {
                    debug!("broker event: {:?}", event);
                }
                Err(e) => {
                    self.state
                        .store(ConnectionState::Disconnected as u8, Ordering::Relaxed);
                    warn!("broker connection error: {}; retrying", e);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    self.state
                        .store(ConnectionState::Connecting as u8, Ordering::Relaxed);
                }
            }
        }
    }

    /// Subscribe the full fixed topic set. Called on every (re)connect.
    ///
    /// Takes the client and topic list directly: the event loop is not
    /// `Sync`, so nothing may borrow the supervisor across an await point
    /// or [`run`](Self::run) stops being spawnable.
    async fn resubscribe(client: AsyncClient, subscriptions: &[String], qos: QoS) {
        for topic in subscriptions {
            match client.subscribe(topic.clone(), qos).await {
                Ok(()) => info!("subscribed to '{}' at {:?}", topic, qos),
                Err(e) => error!("failed to subscribe to '{}': {}", topic, e),
            }
        }
    }
}

fn mqtt_qos(qos: u8) -> QoS {
    match qos {
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtMostOnce,
    }
}
